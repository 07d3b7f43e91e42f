//! ebayes_de: empirical Bayes differential expression analysis in Rust
//!
//! This crate implements the standard analysis pipeline for log-intensity
//! expression data (microarray-shaped: thousands of features, tens of
//! samples): scale normalization, variance filtering, per-feature linear
//! model fitting against a group design, contrast evaluation, empirical
//! Bayes variance moderation, and FDR-adjusted, annotated result tables.
//!
//! # Example
//!
//! ```ignore
//! use ebayes_de::prelude::*;
//!
//! let matrix = read_expression_matrix("expression.csv")?;
//! let metadata = read_sample_metadata("metadata.csv")?;
//!
//! let dataset = ExpressionDataSet::new(matrix, metadata, "group")?;
//! let results = run_de(&dataset, "tumor", "normal", &PipelineOptions::default())?;
//!
//! results.ranked_by(RankBy::LogOdds).top_table(20).write_csv("results.csv")?;
//! ```

pub mod analysis;
pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod io;
pub mod model;
pub mod moderation;
pub mod normalization;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{principal_components, sample_correlation, PcaResult};
    pub use crate::data::{
        ExpressionDataSet, ExpressionMatrix, FeatureAnnotation, Platform, PlatformSet,
        SampleMetadata,
    };
    pub use crate::error::{ExpressionError, Result};
    pub use crate::filter::{filter_by_variance, DEFAULT_KEEP_FRACTION};
    pub use crate::io::{
        read_expression_matrix, read_feature_annotation, read_sample_metadata,
        write_expression_matrix, write_labeled_matrix, AnnotatedResults, RankBy,
    };
    pub use crate::model::{
        build_design, evaluate_contrast, fit_linear_models, Contrast, ContrastFit, Design,
        FitResult,
    };
    pub use crate::moderation::{moderate, ModeratedStats, ModerationOptions, VariancePrior};
    pub use crate::normalization::{log2_if_needed, log2_transform, DEFAULT_LOG_THRESHOLD};
    pub use crate::testing::{benjamini_hochberg, bonferroni};
    pub use crate::{run_de, PipelineOptions};
}

use prelude::*;

/// Configuration for the full pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Fraction of features kept by the variance filter
    pub keep_fraction: f64,
    /// Maximum value consistent with log2 scale
    pub log_threshold: f64,
    /// Prior probability of differential expression (B statistic)
    pub proportion: f64,
    /// Run the scale-detection/log2 step
    pub apply_log: bool,
    /// Run the variance filter
    pub apply_filter: bool,
    /// Optional per-sample weights for the linear model fit
    pub weights: Option<Vec<f64>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            keep_fraction: crate::filter::DEFAULT_KEEP_FRACTION,
            log_threshold: crate::normalization::DEFAULT_LOG_THRESHOLD,
            proportion: crate::moderation::DEFAULT_DE_PROPORTION,
            apply_log: true,
            apply_filter: true,
            weights: None,
        }
    }
}

/// Run the complete differential expression pipeline for a two-group contrast
/// `numerator - denominator`.
///
/// Every stage returns a new immutable value; the dataset is never mutated.
pub fn run_de(
    dataset: &ExpressionDataSet,
    numerator: &str,
    denominator: &str,
    options: &PipelineOptions,
) -> Result<AnnotatedResults> {
    let matrix = if options.apply_log {
        log2_if_needed(dataset.matrix(), options.log_threshold)?
    } else {
        dataset.matrix().clone()
    };

    let matrix = if options.apply_filter {
        filter_by_variance(&matrix, options.keep_fraction)?
    } else {
        matrix
    };

    let design = build_design(dataset.sample_metadata(), dataset.group_column(), None)?;
    let fit = fit_linear_models(&matrix, &design, options.weights.as_deref())?;

    let contrast = Contrast::two_group(&design, numerator, denominator)?;
    let contrast_fit = evaluate_contrast(&fit, &contrast)?;

    let stats = moderate(
        &contrast_fit,
        &ModerationOptions {
            proportion: options.proportion,
        },
    )?;

    Ok(AnnotatedResults::from_stats(&stats, dataset.annotation()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 10 features x 6 samples (3 normal, 3 tumor): features 1-2 carry an
    /// exact shift of 5 with zero noise, features 3-10 are noise with no
    /// group difference and variances spread over two orders of magnitude.
    fn synthetic_dataset() -> ExpressionDataSet {
        let mut values = Array2::zeros((10, 6));
        // shifted features: 1.0 in normal, 6.0 in tumor
        for g in 0..2 {
            for j in 0..3 {
                values[[g, j]] = 1.0;
                values[[g, j + 3]] = 6.0;
            }
        }
        // noise features: pattern (-s, 0, s) in both groups, zero group shift
        for (row, k) in (2..10).zip(1..=8) {
            let s = 0.05 * 1.6f64.powi(k);
            for (j, v) in [-s, 0.0, s, -s, 0.0, s].into_iter().enumerate() {
                values[[row, j]] = v;
            }
        }

        let matrix = ExpressionMatrix::new(
            values,
            (1..=10).map(|i| format!("f{}", i)).collect(),
            (1..=6).map(|i| format!("s{}", i)).collect(),
        )
        .unwrap();

        let mut metadata =
            SampleMetadata::new((1..=6).map(|i| format!("s{}", i)).collect()).unwrap();
        metadata
            .add_column(
                "group",
                vec![
                    "normal".to_string(),
                    "normal".to_string(),
                    "normal".to_string(),
                    "tumor".to_string(),
                    "tumor".to_string(),
                    "tumor".to_string(),
                ],
            )
            .unwrap();

        let mut annotation =
            FeatureAnnotation::new((1..=10).map(|i| format!("f{}", i)).collect()).unwrap();
        annotation
            .add_column(
                "symbol",
                (1..=10).map(|i| format!("GENE{}", i)).collect(),
            )
            .unwrap();

        ExpressionDataSet::new(matrix, metadata, "group")
            .unwrap()
            .with_annotation(annotation)
    }

    #[test]
    fn test_full_pipeline_ranks_shifted_features_first() {
        let dataset = synthetic_dataset();
        let results = run_de(&dataset, "tumor", "normal", &PipelineOptions::default()).unwrap();

        // keep fraction 0.5 retains 5 of 10 features, the shifted pair included
        assert_eq!(results.n_features(), 5);
        assert!(!results.shrinkage_disabled);

        let ranked = results.ranked_by(RankBy::LogOdds);
        let mut top2: Vec<&str> = ranked.feature_ids[..2].iter().map(|s| s.as_str()).collect();
        top2.sort_unstable();
        assert_eq!(top2, vec!["f1", "f2"]);

        // shifted features significant, everything else clearly not
        for i in 0..ranked.n_features() {
            let padj = ranked.adjusted_p_values[i];
            if ranked.feature_ids[i] == "f1" || ranked.feature_ids[i] == "f2" {
                assert!(padj < 0.05, "{}: padj = {}", ranked.feature_ids[i], padj);
                assert!((ranked.effects[i] - 5.0).abs() < 1e-9);
            } else {
                assert!(padj > 0.05, "{}: padj = {}", ranked.feature_ids[i], padj);
            }
        }

        // annotation joined through the pipeline
        let idx = ranked.feature_ids.iter().position(|f| f == "f1").unwrap();
        assert_eq!(ranked.annotations[idx], vec!["GENE1".to_string()]);
    }

    #[test]
    fn test_full_pipeline_without_filter_keeps_all_features() {
        let dataset = synthetic_dataset();
        let options = PipelineOptions {
            apply_filter: false,
            ..PipelineOptions::default()
        };
        let results = run_de(&dataset, "tumor", "normal", &options).unwrap();

        assert_eq!(results.n_features(), 10);
        for i in 0..results.n_features() {
            let padj = results.adjusted_p_values[i];
            if results.feature_ids[i] == "f1" || results.feature_ids[i] == "f2" {
                assert!(padj < 0.05);
            } else {
                assert!(padj > 0.05);
            }
        }
    }

    #[test]
    fn test_contrast_direction_flips_sign() {
        let dataset = synthetic_dataset();
        let options = PipelineOptions {
            apply_filter: false,
            ..PipelineOptions::default()
        };
        let forward = run_de(&dataset, "tumor", "normal", &options).unwrap();
        let reverse = run_de(&dataset, "normal", "tumor", &options).unwrap();

        let i = forward.feature_ids.iter().position(|f| f == "f1").unwrap();
        let j = reverse.feature_ids.iter().position(|f| f == "f1").unwrap();
        assert!((forward.effects[i] + reverse.effects[j]).abs() < 1e-9);
        assert!((forward.p_values[i] - reverse.p_values[j]).abs() < 1e-12);
    }
}
