//! ExpressionDataSet - binds the expression matrix to its sample metadata

use std::collections::HashSet;

use super::{ExpressionMatrix, FeatureAnnotation, SampleMetadata};
use crate::error::{ExpressionError, Result};

/// An expression matrix paired with validated sample metadata and an optional
/// feature annotation table.
///
/// Construction enforces the sample-identifier invariant: the metadata sample
/// set must equal the matrix column set exactly, order-independent. Metadata
/// rows are reordered to match matrix column order so downstream stages can
/// index both by position.
#[derive(Debug, Clone)]
pub struct ExpressionDataSet {
    matrix: ExpressionMatrix,
    sample_metadata: SampleMetadata,
    annotation: Option<FeatureAnnotation>,
    group_column: String,
}

impl ExpressionDataSet {
    /// Create a new dataset, validating sample identifiers and the group column
    pub fn new(
        matrix: ExpressionMatrix,
        sample_metadata: SampleMetadata,
        group_column: &str,
    ) -> Result<Self> {
        let matrix_ids: HashSet<&str> = matrix.sample_ids().iter().map(|s| s.as_str()).collect();
        let meta_ids: HashSet<&str> = sample_metadata
            .sample_ids()
            .iter()
            .map(|s| s.as_str())
            .collect();

        let missing_in_metadata: Vec<String> = matrix
            .sample_ids()
            .iter()
            .filter(|id| !meta_ids.contains(id.as_str()))
            .cloned()
            .collect();
        let missing_in_matrix: Vec<String> = sample_metadata
            .sample_ids()
            .iter()
            .filter(|id| !matrix_ids.contains(id.as_str()))
            .cloned()
            .collect();

        if !missing_in_metadata.is_empty() || !missing_in_matrix.is_empty() {
            return Err(ExpressionError::SampleMismatch {
                missing_in_metadata,
                missing_in_matrix,
            });
        }

        // Same set, possibly different order: align metadata to matrix columns
        let sample_metadata = if matrix.sample_ids() == sample_metadata.sample_ids() {
            sample_metadata
        } else {
            let positions: Vec<usize> = matrix
                .sample_ids()
                .iter()
                .map(|id| {
                    sample_metadata
                        .sample_ids()
                        .iter()
                        .position(|m| m == id)
                        .expect("sample sets verified equal")
                })
                .collect();
            sample_metadata.reorder(&positions)?
        };

        if !sample_metadata.has_column(group_column) {
            return Err(ExpressionError::InvalidData {
                reason: format!("group column '{}' not found in metadata", group_column),
            });
        }

        if let Some(levels) = sample_metadata.levels_in_order(group_column) {
            if levels.len() < 2 {
                log::warn!(
                    "group column '{}' has fewer than two levels; \
                     differential expression testing needs at least two",
                    group_column
                );
            }
        }

        Ok(Self {
            matrix,
            sample_metadata,
            annotation: None,
            group_column: group_column.to_string(),
        })
    }

    /// Attach a feature annotation table (joined lazily at export time)
    pub fn with_annotation(mut self, annotation: FeatureAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Get the expression matrix
    pub fn matrix(&self) -> &ExpressionMatrix {
        &self.matrix
    }

    /// Get the sample metadata (aligned to matrix column order)
    pub fn sample_metadata(&self) -> &SampleMetadata {
        &self.sample_metadata
    }

    /// Get the feature annotation table, if attached
    pub fn annotation(&self) -> Option<&FeatureAnnotation> {
        self.annotation.as_ref()
    }

    /// Name of the group column used for the design
    pub fn group_column(&self) -> &str {
        &self.group_column
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.matrix.n_samples()
    }

    /// Get the number of features
    pub fn n_features(&self) -> usize {
        self.matrix.n_features()
    }
}
