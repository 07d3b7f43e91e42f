//! Sample-sample correlation

use ndarray::Array2;

use crate::data::ExpressionMatrix;

/// Pearson correlation between every pair of sample columns, computed over
/// features. The diagonal is exactly 1; a zero-variance sample yields NaN
/// against every other sample.
pub fn sample_correlation(matrix: &ExpressionMatrix) -> Array2<f64> {
    let values = matrix.values();
    let (n_features, n_samples) = values.dim();
    let nf = n_features as f64;

    let means: Vec<f64> = (0..n_samples)
        .map(|j| values.column(j).sum() / nf)
        .collect();
    let sds: Vec<f64> = (0..n_samples)
        .map(|j| {
            values
                .column(j)
                .iter()
                .map(|&x| (x - means[j]) * (x - means[j]))
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    let mut corr = Array2::zeros((n_samples, n_samples));
    for j in 0..n_samples {
        corr[[j, j]] = 1.0;
        for k in j + 1..n_samples {
            let cov: f64 = (0..n_features)
                .map(|i| (values[[i, j]] - means[j]) * (values[[i, k]] - means[k]))
                .sum();
            let denom = sds[j] * sds[k];
            let r = if denom > 0.0 { cov / denom } else { f64::NAN };
            corr[[j, k]] = r;
            corr[[k, j]] = r;
        }
    }
    corr
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_perfectly_correlated_samples() {
        // s2 = 2 * s1, s3 = -s1 (up to mean shift)
        let matrix = ExpressionMatrix::new(
            array![
                [1.0, 2.0, -1.0],
                [2.0, 4.0, -2.0],
                [3.0, 6.0, -3.0],
                [4.0, 8.0, -4.0],
            ],
            ids("f", 4),
            ids("s", 3),
        )
        .unwrap();

        let corr = sample_correlation(&matrix);
        assert_abs_diff_eq!(corr[[0, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(corr[[0, 2]], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(corr[[0, 0]], 1.0, epsilon = 1e-12);
        // symmetric
        assert_eq!(corr[[1, 0]], corr[[0, 1]]);
    }

    #[test]
    fn test_zero_variance_sample_is_nan() {
        let matrix = ExpressionMatrix::new(
            array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]],
            ids("f", 3),
            ids("s", 2),
        )
        .unwrap();
        let corr = sample_correlation(&matrix);
        assert!(corr[[0, 1]].is_nan());
        assert_eq!(corr[[1, 1]], 1.0);
    }
}
