//! Metadata tables for samples and features

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{ExpressionError, Result};

/// Sample metadata containing categorical attributes (group, covariates)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Column name -> values for each sample
    columns: HashMap<String, Vec<String>>,
    /// Column names in insertion order
    column_order: Vec<String>,
}

impl SampleMetadata {
    /// Create new sample metadata; sample identifiers must be unique
    pub fn new(sample_ids: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(ExpressionError::InvalidData {
                    reason: format!("duplicate sample ID '{}' in metadata", id),
                });
            }
        }
        Ok(Self {
            sample_ids,
            columns: HashMap::new(),
            column_order: Vec::new(),
        })
    }

    /// Add a categorical column
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.sample_ids.len() {
            return Err(ExpressionError::DimensionMismatch {
                expected: format!("{} values", self.sample_ids.len()),
                got: format!("{} values", values.len()),
            });
        }
        if self.columns.insert(name.to_string(), values).is_none() {
            self.column_order.push(name.to_string());
        }
        Ok(())
    }

    /// Check if a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Get values for a column
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    /// Get the value of a column for a specific sample
    pub fn value(&self, column: &str, sample_idx: usize) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|v| v.get(sample_idx))
            .map(|s| s.as_str())
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Distinct values of a column in first-encountered order, skipping empties
    pub fn levels_in_order(&self, column: &str) -> Option<Vec<String>> {
        self.columns.get(column).map(|values| {
            let mut seen = HashSet::new();
            values
                .iter()
                .filter(|v| !v.is_empty())
                .filter(|v| seen.insert(v.as_str()))
                .cloned()
                .collect()
        })
    }

    /// Reorder samples by the given index permutation, returning a new table
    pub fn reorder(&self, indices: &[usize]) -> Result<Self> {
        let new_ids: Vec<String> = indices
            .iter()
            .map(|&i| self.sample_ids[i].clone())
            .collect();

        let mut reordered = SampleMetadata::new(new_ids)?;
        for name in &self.column_order {
            let values = &self.columns[name];
            let new_values: Vec<String> = indices.iter().map(|&i| values[i].clone()).collect();
            reordered.add_column(name, new_values)?;
        }
        Ok(reordered)
    }
}

/// Feature annotation table keyed by feature ID (symbol, chromosome, external IDs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAnnotation {
    /// Feature identifiers
    feature_ids: Vec<String>,
    /// Column name -> values for each feature
    columns: HashMap<String, Vec<String>>,
    /// Column names in insertion order
    column_order: Vec<String>,
    /// Feature ID -> row index
    index: HashMap<String, usize>,
}

impl FeatureAnnotation {
    /// Create a new annotation table; feature identifiers must be unique
    pub fn new(feature_ids: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(feature_ids.len());
        for (i, id) in feature_ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(ExpressionError::InvalidData {
                    reason: format!("duplicate feature ID '{}' in annotation", id),
                });
            }
        }
        Ok(Self {
            feature_ids,
            columns: HashMap::new(),
            column_order: Vec::new(),
            index,
        })
    }

    /// Add an annotation column
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.feature_ids.len() {
            return Err(ExpressionError::DimensionMismatch {
                expected: format!("{} values", self.feature_ids.len()),
                got: format!("{} values", values.len()),
            });
        }
        if self.columns.insert(name.to_string(), values).is_none() {
            self.column_order.push(name.to_string());
        }
        Ok(())
    }

    /// Get feature IDs
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Get number of features
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    /// Row index for a feature ID
    pub fn row_index(&self, feature_id: &str) -> Option<usize> {
        self.index.get(feature_id).copied()
    }

    /// Get the value of a column for a specific row
    pub fn value(&self, column: &str, row_idx: usize) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|v| v.get(row_idx))
            .map(|s| s.as_str())
    }
}
