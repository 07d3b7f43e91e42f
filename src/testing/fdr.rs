//! Multiple-testing correction
//!
//! Benjamini-Hochberg step-up adjustment (the pipeline default) and the
//! Bonferroni family-wise correction as a conservative alternative.

/// Benjamini-Hochberg adjusted p-values controlling the false discovery rate.
///
/// Walking the sorted p-values from largest to smallest, each adjusted value
/// is `min(p * m / rank, running minimum)`, which enforces monotonicity in
/// rank. NaN p-values stay NaN and do not count toward m. Deterministic for
/// a fixed input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return vec![];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| match (p_values[a].is_nan(), p_values[b].is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => p_values[a].total_cmp(&p_values[b]),
    });

    let m = p_values.iter().filter(|p| p.is_finite()).count();
    if m == 0 {
        return vec![f64::NAN; n];
    }

    let mut adjusted = vec![f64::NAN; n];
    let mut running_min = f64::INFINITY;
    let mut rank = m;

    for &i in order.iter().rev() {
        let p = p_values[i];
        if p.is_finite() {
            let stepped = (p * m as f64 / rank as f64).min(1.0);
            running_min = running_min.min(stepped);
            adjusted[i] = running_min;
            rank -= 1;
        }
    }

    adjusted
}

/// Bonferroni adjusted p-values controlling the family-wise error rate
pub fn bonferroni(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.iter().filter(|p| p.is_finite()).count();
    if m == 0 {
        return vec![f64::NAN; p_values.len()];
    }
    p_values
        .iter()
        .map(|&p| if p.is_nan() { f64::NAN } else { (p * m as f64).min(1.0) })
        .collect()
}
