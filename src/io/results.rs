//! Annotated, ranked differential-expression result tables

use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use super::csv::{format_number, parse_number};
use crate::data::FeatureAnnotation;
use crate::error::{ExpressionError, Result};
use crate::moderation::ModeratedStats;

/// Ranking criterion for result tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    /// Ascending raw p-value
    PValue,
    /// Descending log-odds (B) statistic
    LogOdds,
}

/// Moderated statistics joined with feature annotation.
///
/// The join is a left join on feature ID: a feature with no annotation row
/// keeps empty annotation fields, it is never dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedResults {
    /// Feature identifiers
    pub feature_ids: Vec<String>,
    /// Effect sizes (log2 fold change for a two-group contrast)
    pub effects: Vec<f64>,
    /// Moderated t-statistics
    pub t_statistics: Vec<f64>,
    /// Raw p-values
    pub p_values: Vec<f64>,
    /// Benjamini-Hochberg adjusted p-values
    pub adjusted_p_values: Vec<f64>,
    /// Log-odds (B) statistics
    pub log_odds: Vec<f64>,
    /// Names of the joined annotation columns
    pub annotation_columns: Vec<String>,
    /// Annotation values, one row per feature in `feature_ids` order
    pub annotations: Vec<Vec<String>>,
    /// Contrast description
    pub contrast: String,
    /// True when empirical Bayes shrinkage was disabled for this table
    pub shrinkage_disabled: bool,
}

impl AnnotatedResults {
    /// Join moderated statistics with an optional annotation table
    pub fn from_stats(stats: &ModeratedStats, annotation: Option<&FeatureAnnotation>) -> Self {
        let annotation_columns: Vec<String> = annotation
            .map(|a| a.column_names().to_vec())
            .unwrap_or_default();

        let annotations: Vec<Vec<String>> = stats
            .feature_ids
            .iter()
            .map(|id| match annotation.and_then(|a| a.row_index(id).map(|r| (a, r))) {
                Some((a, row)) => annotation_columns
                    .iter()
                    .map(|col| a.value(col, row).unwrap_or("").to_string())
                    .collect(),
                None => vec![String::new(); annotation_columns.len()],
            })
            .collect();

        Self {
            feature_ids: stats.feature_ids.clone(),
            effects: stats.effects.clone(),
            t_statistics: stats.t_statistics.clone(),
            p_values: stats.p_values.clone(),
            adjusted_p_values: stats.adjusted_p_values.clone(),
            log_odds: stats.log_odds.clone(),
            annotation_columns,
            annotations,
            contrast: stats.contrast.clone(),
            shrinkage_disabled: stats.shrinkage_disabled(),
        }
    }

    /// Number of features in the table
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    fn permuted(&self, order: &[usize]) -> Self {
        fn pick<T: Clone>(v: &[T], order: &[usize]) -> Vec<T> {
            order.iter().map(|&i| v[i].clone()).collect()
        }
        Self {
            feature_ids: pick(&self.feature_ids, order),
            effects: pick(&self.effects, order),
            t_statistics: pick(&self.t_statistics, order),
            p_values: pick(&self.p_values, order),
            adjusted_p_values: pick(&self.adjusted_p_values, order),
            log_odds: pick(&self.log_odds, order),
            annotation_columns: self.annotation_columns.clone(),
            annotations: pick(&self.annotations, order),
            contrast: self.contrast.clone(),
            shrinkage_disabled: self.shrinkage_disabled,
        }
    }

    /// Return a copy ranked by the given criterion, NaN entries last
    pub fn ranked_by(&self, rank_by: RankBy) -> Self {
        let mut order: Vec<usize> = (0..self.n_features()).collect();
        match rank_by {
            RankBy::PValue => order.sort_by(|&a, &b| {
                nan_last(self.p_values[a], self.p_values[b], false)
            }),
            RankBy::LogOdds => order.sort_by(|&a, &b| {
                nan_last(self.log_odds[a], self.log_odds[b], true)
            }),
        }
        self.permuted(&order)
    }

    /// Return the first `n` rows (the table should be ranked first)
    pub fn top_table(&self, n: usize) -> Self {
        let order: Vec<usize> = (0..self.n_features().min(n)).collect();
        self.permuted(&order)
    }

    /// Keep features with adjusted p-value below `p_threshold` and absolute
    /// effect at or above `effect_threshold`
    pub fn filter_significant(&self, p_threshold: f64, effect_threshold: f64) -> Self {
        let order: Vec<usize> = (0..self.n_features())
            .filter(|&i| {
                let padj = self.adjusted_p_values[i];
                padj.is_finite()
                    && padj < p_threshold
                    && self.effects[i].abs() >= effect_threshold
            })
            .collect();
        self.permuted(&order)
    }

    /// Summary counts at the given significance level
    pub fn summary(&self, alpha: f64) -> ResultsSummary {
        let tested = self.p_values.iter().filter(|p| p.is_finite()).count();
        let significant: Vec<usize> = (0..self.n_features())
            .filter(|&i| {
                self.adjusted_p_values[i].is_finite() && self.adjusted_p_values[i] < alpha
            })
            .collect();
        let upregulated = significant.iter().filter(|&&i| self.effects[i] > 0.0).count();
        let downregulated = significant.iter().filter(|&&i| self.effects[i] < 0.0).count();

        ResultsSummary {
            total_features: self.n_features(),
            features_tested: tested,
            significant: significant.len(),
            upregulated,
            downregulated,
            alpha,
        }
    }

    /// Write the table as CSV with a header row
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = WriterBuilder::new().from_path(path)?;

        let mut header = vec![
            "feature_id".to_string(),
            "effect".to_string(),
            "t".to_string(),
            "p_value".to_string(),
            "adj_p_value".to_string(),
            "log_odds".to_string(),
        ];
        header.extend(self.annotation_columns.iter().cloned());
        writer.write_record(&header)?;

        for i in 0..self.n_features() {
            let mut record = vec![
                self.feature_ids[i].clone(),
                format_number(self.effects[i]),
                format_number(self.t_statistics[i]),
                format_number(self.p_values[i]),
                format_number(self.adjusted_p_values[i]),
                format_number(self.log_odds[i]),
            ];
            record.extend(self.annotations[i].iter().cloned());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Read a table written by `write_csv`.
    ///
    /// The contrast description and shrinkage flag are not part of the file
    /// format and come back empty/false.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = ReaderBuilder::new().from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.len() < 6 {
            return Err(ExpressionError::InvalidData {
                reason: "results file needs at least the six statistic columns".to_string(),
            });
        }
        let annotation_columns: Vec<String> =
            headers.iter().skip(6).map(|s| s.to_string()).collect();

        let mut results = Self {
            feature_ids: vec![],
            effects: vec![],
            t_statistics: vec![],
            p_values: vec![],
            adjusted_p_values: vec![],
            log_odds: vec![],
            annotation_columns,
            annotations: vec![],
            contrast: String::new(),
            shrinkage_disabled: false,
        };

        for record in reader.records() {
            let record = record?;
            if record.len() != 6 + results.annotation_columns.len() {
                return Err(ExpressionError::DimensionMismatch {
                    expected: format!("{} columns", 6 + results.annotation_columns.len()),
                    got: format!("{} columns", record.len()),
                });
            }
            results.feature_ids.push(record[0].to_string());
            results.effects.push(parse_number(&record[1])?);
            results.t_statistics.push(parse_number(&record[2])?);
            results.p_values.push(parse_number(&record[3])?);
            results.adjusted_p_values.push(parse_number(&record[4])?);
            results.log_odds.push(parse_number(&record[5])?);
            results
                .annotations
                .push(record.iter().skip(6).map(|s| s.to_string()).collect());
        }

        Ok(results)
    }
}

/// Compare two values with NaN always ordered last, ascending or descending
fn nan_last(a: f64, b: f64, descending: bool) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => {
            if descending {
                b.total_cmp(&a)
            } else {
                a.total_cmp(&b)
            }
        }
    }
}

/// Summary of a result table
#[derive(Debug, Clone)]
pub struct ResultsSummary {
    pub total_features: usize,
    pub features_tested: usize,
    pub significant: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub alpha: f64,
}

impl std::fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Differential expression summary")?;
        writeln!(f, "===============================")?;
        writeln!(f, "Total features: {}", self.total_features)?;
        writeln!(f, "Features tested: {}", self.features_tested)?;
        writeln!(
            f,
            "Significant (adj p < {}): {}",
            self.alpha, self.significant
        )?;
        writeln!(f, "  Up-regulated: {}", self.upregulated)?;
        writeln!(f, "  Down-regulated: {}", self.downregulated)?;
        Ok(())
    }
}
