//! Expression matrix representation for log-intensity data

use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{ExpressionError, Result};

/// An expression matrix with features (probes/genes) as rows and samples as columns.
///
/// Values may be raw or log2-scale intensities; construction enforces only that
/// they are finite. Feature and sample identifiers must be unique.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    /// Intensity data (features x samples)
    values: Array2<f64>,
    /// Feature identifiers
    feature_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
}

fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .find(|id| !seen.insert(id.as_str()))
        .map(|s| s.as_str())
}

impl ExpressionMatrix {
    /// Create a new expression matrix from raw data
    pub fn new(
        values: Array2<f64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_features, n_samples) = values.dim();

        if n_features == 0 || n_samples == 0 {
            return Err(ExpressionError::EmptyData {
                reason: "expression matrix has no features or no samples".to_string(),
            });
        }

        if feature_ids.len() != n_features {
            return Err(ExpressionError::DimensionMismatch {
                expected: format!("{} feature IDs", n_features),
                got: format!("{} feature IDs", feature_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(ExpressionError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ExpressionError::InvalidData {
                reason: "expression values must be finite".to_string(),
            });
        }

        // Row and column labels must be unique before any join is attempted
        if let Some(dup) = first_duplicate(&feature_ids) {
            return Err(ExpressionError::InvalidData {
                reason: format!("duplicate feature ID '{}'", dup),
            });
        }
        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(ExpressionError::InvalidData {
                reason: format!("duplicate sample ID '{}'", dup),
            });
        }

        Ok(Self {
            values,
            feature_ids,
            sample_ids,
        })
    }

    /// Get the number of features
    pub fn n_features(&self) -> usize {
        self.values.nrows()
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Get the intensity values as a view
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Get feature IDs
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get values for a specific feature
    pub fn feature_values(&self, feature_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(feature_idx)
    }

    /// Largest value in the matrix
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest value in the matrix
    pub fn min_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Mean intensity per feature across samples
    pub fn feature_means(&self) -> Vec<f64> {
        let n = self.n_samples() as f64;
        self.values
            .axis_iter(Axis(0))
            .map(|row| row.sum() / n)
            .collect()
    }

    /// Sample variance per feature across samples (n - 1 denominator)
    pub fn feature_variances(&self) -> Vec<f64> {
        let n = self.n_samples() as f64;
        if n < 2.0 {
            return vec![0.0; self.n_features()];
        }
        self.values
            .axis_iter(Axis(0))
            .map(|row| {
                let mean = row.sum() / n;
                row.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
            })
            .collect()
    }

    /// Apply a transformation element-wise, returning a new matrix
    pub fn map_values<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(f64) -> f64,
    {
        Self::new(
            self.values.mapv(&f),
            self.feature_ids.clone(),
            self.sample_ids.clone(),
        )
    }

    /// Subset to specific features, preserving the given index order
    pub fn subset_features(&self, feature_indices: &[usize]) -> Result<Self> {
        if feature_indices.iter().any(|&i| i >= self.n_features()) {
            return Err(ExpressionError::InvalidData {
                reason: "feature index out of bounds".to_string(),
            });
        }
        let new_values = self.values.select(Axis(0), feature_indices);
        let new_feature_ids: Vec<String> = feature_indices
            .iter()
            .map(|&i| self.feature_ids[i].clone())
            .collect();

        Self::new(new_values, new_feature_ids, self.sample_ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_matrix_creation() {
        let values = array![[7.2, 8.1, 7.9], [5.5, 5.6, 5.4]];
        let matrix = ExpressionMatrix::new(values, ids("f", 2), ids("s", 3)).unwrap();
        assert_eq!(matrix.n_features(), 2);
        assert_eq!(matrix.n_samples(), 3);
    }

    #[test]
    fn test_non_finite_rejected() {
        let values = array![[7.2, f64::NAN], [5.5, 5.6]];
        assert!(ExpressionMatrix::new(values, ids("f", 2), ids("s", 2)).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let dup_features = vec!["f1".to_string(), "f1".to_string()];
        assert!(ExpressionMatrix::new(values.clone(), dup_features, ids("s", 2)).is_err());

        let dup_samples = vec!["s1".to_string(), "s1".to_string()];
        assert!(ExpressionMatrix::new(values, ids("f", 2), dup_samples).is_err());
    }

    #[test]
    fn test_feature_variances() {
        let values = array![[1.0, 2.0, 3.0], [5.0, 5.0, 5.0]];
        let matrix = ExpressionMatrix::new(values, ids("f", 2), ids("s", 3)).unwrap();
        let vars = matrix.feature_variances();
        assert!((vars[0] - 1.0).abs() < 1e-12);
        assert_eq!(vars[1], 0.0);
    }

    #[test]
    fn test_subset_features_keeps_order() {
        let values = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let matrix = ExpressionMatrix::new(values, ids("f", 3), ids("s", 2)).unwrap();
        let sub = matrix.subset_features(&[2, 0]).unwrap();
        assert_eq!(sub.feature_ids(), &["f3".to_string(), "f1".to_string()]);
        assert_eq!(sub.values()[[0, 0]], 5.0);
    }
}
