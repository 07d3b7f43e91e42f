//! Principal component analysis of samples
//!
//! Samples are points in feature space. With far more features than samples,
//! the decomposition runs on the samples-side Gram matrix of the
//! feature-centered data, which shares its nonzero eigenvalues with the
//! feature-feature covariance.

use ndarray::Array2;

use crate::data::ExpressionMatrix;
use crate::error::{ExpressionError, Result};

/// PCA scores and variance decomposition for the samples of a matrix
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// Component scores (samples x components)
    pub scores: Array2<f64>,
    /// Variance explained by each component
    pub explained_variance: Vec<f64>,
    /// Fraction of total variance per component
    pub proportion_of_variance: Vec<f64>,
    /// Sample identifiers, in matrix column order
    pub sample_ids: Vec<String>,
}

impl PcaResult {
    pub fn n_components(&self) -> usize {
        self.explained_variance.len()
    }
}

/// Compute the leading principal components of the samples.
///
/// At most `min(n_samples - 1, n_features)` components exist after centering;
/// `n_components` is clamped to that. Component signs are fixed so the
/// largest-magnitude score in each component is positive.
pub fn principal_components(
    matrix: &ExpressionMatrix,
    n_components: usize,
) -> Result<PcaResult> {
    if n_components == 0 {
        return Err(ExpressionError::InvalidData {
            reason: "number of principal components must be at least 1".to_string(),
        });
    }

    let values = matrix.values();
    let (n_features, n_samples) = values.dim();
    if n_samples < 2 {
        return Err(ExpressionError::InvalidData {
            reason: "PCA needs at least two samples".to_string(),
        });
    }

    // Center each feature across samples
    let mut centered = values.to_owned();
    for i in 0..n_features {
        let mean = centered.row(i).sum() / n_samples as f64;
        centered.row_mut(i).mapv_inplace(|v| v - mean);
    }

    // Samples-side Gram matrix C'C
    let mut gram = Array2::zeros((n_samples, n_samples));
    for j in 0..n_samples {
        for k in j..n_samples {
            let dot: f64 = (0..n_features)
                .map(|i| centered[[i, j]] * centered[[i, k]])
                .sum();
            gram[[j, k]] = dot;
            gram[[k, j]] = dot;
        }
    }
    let total = (0..n_samples).map(|j| gram[[j, j]]).sum::<f64>();

    let (eigenvalues, eigenvectors) = jacobi_eigen(&gram);

    let max_rank = (n_samples - 1).min(n_features);
    let k = n_components.min(max_rank);

    let denom = (n_samples - 1) as f64;
    let mut scores = Array2::zeros((n_samples, k));
    let mut explained = Vec::with_capacity(k);
    let mut proportion = Vec::with_capacity(k);

    for comp in 0..k {
        let lambda = eigenvalues[comp].max(0.0);
        let scale = lambda.sqrt();
        for j in 0..n_samples {
            scores[[j, comp]] = eigenvectors[[j, comp]] * scale;
        }

        // Deterministic sign: largest-magnitude score positive
        let (mut max_abs, mut max_idx) = (0.0, 0);
        for j in 0..n_samples {
            if scores[[j, comp]].abs() > max_abs {
                max_abs = scores[[j, comp]].abs();
                max_idx = j;
            }
        }
        if scores[[max_idx, comp]] < 0.0 {
            for j in 0..n_samples {
                scores[[j, comp]] = -scores[[j, comp]];
            }
        }

        explained.push(lambda / denom);
        proportion.push(if total > 0.0 { lambda / total } else { 0.0 });
    }

    Ok(PcaResult {
        scores,
        explained_variance: explained,
        proportion_of_variance: proportion,
        sample_ids: matrix.sample_ids().to_vec(),
    })
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order with matching eigenvector columns.
fn jacobi_eigen(matrix: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.to_owned();
    let mut v = Array2::eye(n);

    let off_diag_norm = |a: &Array2<f64>| -> f64 {
        let mut s = 0.0;
        for p in 0..n {
            for q in p + 1..n {
                s += a[[p, q]] * a[[p, q]];
            }
        }
        s.sqrt()
    };

    let scale: f64 = matrix.iter().map(|x| x.abs()).fold(0.0, f64::max).max(1.0);
    let tol = 1e-14 * scale;

    for _sweep in 0..100 {
        if off_diag_norm(&a) <= tol {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                if a[[p, q]].abs() <= tol * 1e-2 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for i in 0..n {
                    let aip = a[[i, p]];
                    let aiq = a[[i, q]];
                    a[[i, p]] = c * aip - s * aiq;
                    a[[i, q]] = s * aip + c * aiq;
                }
                for i in 0..n {
                    let api = a[[p, i]];
                    let aqi = a[[q, i]];
                    a[[p, i]] = c * api - s * aqi;
                    a[[q, i]] = s * api + c * aqi;
                }
                for i in 0..n {
                    let vip = v[[i, p]];
                    let viq = v[[i, q]];
                    v[[i, p]] = c * vip - s * viq;
                    v[[i, q]] = s * vip + c * viq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a_i, &b_i| a[[b_i, b_i]].total_cmp(&a[[a_i, a_i]]));

    let eigenvalues: Vec<f64> = order.iter().map(|&i| a[[i, i]]).collect();
    let mut eigenvectors = Array2::zeros((n, n));
    for (new_col, &old_col) in order.iter().enumerate() {
        for i in 0..n {
            eigenvectors[[i, new_col]] = v[[i, old_col]];
        }
    }

    (eigenvalues, eigenvectors)
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
    fn test_jacobi_known_eigenvalues() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let (vals, vecs) = jacobi_eigen(&m);
        assert_abs_diff_eq!(vals[0], 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(vals[1], 1.0, epsilon = 1e-10);
        // eigenvector for 3 is (1,1)/sqrt(2) up to sign
        assert_abs_diff_eq!(vecs[[0, 0]].abs(), vecs[[1, 0]].abs(), epsilon = 1e-10);
    }

    #[test]
    fn test_collinear_samples_one_component() {
        // four samples along a single direction in feature space
        let matrix = ExpressionMatrix::new(
            array![
                [0.0, 1.0, 2.0, 3.0],
                [0.0, 2.0, 4.0, 6.0],
                [0.0, -1.0, -2.0, -3.0],
            ],
            ids("f", 3),
            ids("s", 4),
        )
        .unwrap();

        let pca = principal_components(&matrix, 3).unwrap();
        assert_eq!(pca.n_components(), 3);
        assert_abs_diff_eq!(pca.proportion_of_variance[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pca.proportion_of_variance[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_group_separation_on_first_component() {
        let matrix = ExpressionMatrix::new(
            array![
                [1.0, 1.1, 0.9, 6.0, 6.1, 5.9],
                [2.0, 2.1, 1.9, 7.0, 7.1, 6.9],
                [0.5, 0.4, 0.6, 0.5, 0.6, 0.4],
            ],
            ids("f", 3),
            ids("s", 6),
        )
        .unwrap();

        let pca = principal_components(&matrix, 2).unwrap();
        // first three samples separate from the last three on PC1
        let pc1: Vec<f64> = (0..6).map(|j| pca.scores[[j, 0]]).collect();
        let mean_a = (pc1[0] + pc1[1] + pc1[2]) / 3.0;
        let mean_b = (pc1[3] + pc1[4] + pc1[5]) / 3.0;
        assert!((mean_a - mean_b).abs() > 1.0);
        assert!(pca.proportion_of_variance[0] > 0.9);
    }

    #[test]
    fn test_component_count_clamped() {
        let matrix = ExpressionMatrix::new(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 7.0]],
            ids("f", 2),
            ids("s", 3),
        )
        .unwrap();
        let pca = principal_components(&matrix, 10).unwrap();
        assert_eq!(pca.n_components(), 2);
        assert!(principal_components(&matrix, 0).is_err());
    }
}
