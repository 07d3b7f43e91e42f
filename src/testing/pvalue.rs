//! P-value calculation from test statistics

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-value for a t-statistic with the given degrees of freedom.
///
/// Infinite statistics map to 0, NaN statistics and non-positive degrees of
/// freedom map to NaN.
pub fn two_sided_t_pvalue(stat: f64, df: f64) -> f64 {
    if stat.is_nan() || df <= 0.0 || !df.is_finite() {
        return f64::NAN;
    }
    if stat.is_infinite() {
        return 0.0;
    }

    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * dist.cdf(-stat.abs()),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_symmetric() {
        assert_abs_diff_eq!(
            two_sided_t_pvalue(2.0, 4.0),
            two_sided_t_pvalue(-2.0, 4.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_statistic() {
        assert_abs_diff_eq!(two_sided_t_pvalue(0.0, 4.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_small_df_is_conservative() {
        // heavier tails at low df mean larger p for the same statistic
        let p_small = two_sided_t_pvalue(2.0, 3.0);
        let p_large = two_sided_t_pvalue(2.0, 1000.0);
        assert!(p_small > p_large);
    }

    #[test]
    fn test_edge_inputs() {
        assert_eq!(two_sided_t_pvalue(f64::INFINITY, 4.0), 0.0);
        assert!(two_sided_t_pvalue(f64::NAN, 4.0).is_nan());
        assert!(two_sided_t_pvalue(1.0, 0.0).is_nan());
    }
}
