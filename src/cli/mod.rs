//! Command-line interface for ebayes_de

use clap::{Parser, Subcommand, ValueEnum};

use crate::io::RankBy;

#[derive(Parser)]
#[command(name = "ebayes_de")]
#[command(version)]
#[command(about = "Empirical Bayes differential expression analysis for log-intensity data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Ranking criterion for the output table
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RankCriterion {
    /// Ascending raw p-value
    Pvalue,
    /// Descending log-odds (B) statistic
    Logodds,
}

impl From<RankCriterion> for RankBy {
    fn from(value: RankCriterion) -> Self {
        match value {
            RankCriterion::Pvalue => RankBy::PValue,
            RankCriterion::Logodds => RankBy::LogOdds,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full differential expression pipeline
    #[command(
        long_about = "Run the full differential expression pipeline\n\n\
            Loads an expression matrix and sample metadata, inspects the value \n\
            scale (applying log2 when needed), filters features by variance, fits \n\
            per-feature linear models, evaluates the requested two-group contrast, \n\
            applies empirical Bayes variance moderation, adjusts p-values with \n\
            Benjamini-Hochberg, and writes a ranked, annotated result table.",
        after_long_help = "\
Examples:
  # Basic tumor-vs-normal comparison
  ebayes_de run -x expression.csv -m metadata.csv -g group \\
    --numerator tumor --denominator normal -o results.csv

  # With probe annotation and a stricter significance filter
  ebayes_de run -x expression.csv -m metadata.csv -g group \\
    --numerator tumor --denominator normal -a annotation.csv \\
    --significant-only --p-threshold 0.01 --effect-threshold 1.5"
    )]
    Run {
        /// Path to the expression matrix CSV/TSV file
        #[arg(short = 'x', long,
            long_help = "Path to the expression matrix file.\n\
                Format: first column = feature IDs, header row = sample IDs.\n\
                Comma and tab delimiters are auto-detected.")]
        matrix: String,

        /// Path to the sample metadata CSV/TSV file
        #[arg(short, long,
            long_help = "Path to the sample metadata file.\n\
                Format: first column = sample IDs (matching matrix columns),\n\
                remaining columns = categorical attributes.")]
        metadata: String,

        /// Path to a feature annotation CSV/TSV file
        #[arg(short, long,
            long_help = "Optional feature annotation file.\n\
                Format: first column = feature IDs, remaining columns =\n\
                annotation fields (symbol, chromosome, ...). Left-joined\n\
                into the result table.")]
        annotation: Option<String>,

        /// Metadata column holding the group assignment
        #[arg(short, long)]
        group: String,

        /// Numerator group level for the contrast (the "case" condition)
        #[arg(long)]
        numerator: String,

        /// Denominator group level for the contrast (the "control" condition)
        #[arg(long)]
        denominator: String,

        /// Output file path [default: de_results.csv]
        #[arg(short, long, default_value = "de_results.csv")]
        output: String,

        /// Fraction of features kept by the variance filter [default: 0.5]
        #[arg(long, default_value = "0.5")]
        keep_fraction: f64,

        /// Adjusted p-value threshold [default: 0.05]
        #[arg(long, default_value = "0.05")]
        p_threshold: f64,

        /// Absolute effect-size threshold [default: 1.0]
        #[arg(long, default_value = "1.0")]
        effect_threshold: f64,

        /// Maximum value consistent with log2 scale [default: 16]
        #[arg(long, default_value = "16.0",
            long_help = "Scale-detection threshold.\n\
                A matrix whose maximum exceeds this is treated as linear scale\n\
                and log2-transformed before analysis.")]
        log_threshold: f64,

        /// Prior probability of differential expression [default: 0.01]
        #[arg(long, default_value = "0.01",
            long_help = "Prior probability that a feature is differentially\n\
                expressed; only the log-odds (B) statistic depends on it.")]
        proportion: f64,

        /// Number of top-ranked rows to write (0 = all) [default: 20]
        #[arg(long, default_value = "20")]
        top: usize,

        /// Ranking criterion for the output table [default: logodds]
        #[arg(long, value_enum, default_value = "logodds")]
        rank_by: RankCriterion,

        /// Keep only rows passing the significance and effect thresholds
        #[arg(long)]
        significant_only: bool,

        /// Skip the variance filter
        #[arg(long)]
        no_filter: bool,

        /// Skip scale detection and use values as-is
        #[arg(long)]
        no_log_check: bool,
    },

    /// Inspect the value scale and log2-transform if needed
    #[command(
        long_about = "Inspect the value scale and log2-transform if needed.\n\n\
            Writes the matrix unchanged when it already looks log2-scale."
    )]
    Normalize {
        /// Path to the expression matrix CSV/TSV file
        #[arg(short = 'x', long)]
        matrix: String,

        /// Output file path
        #[arg(short, long)]
        output: String,

        /// Maximum value consistent with log2 scale [default: 16]
        #[arg(long, default_value = "16.0")]
        log_threshold: f64,
    },

    /// Compute the sample-sample Pearson correlation matrix
    Correlate {
        /// Path to the expression matrix CSV/TSV file
        #[arg(short = 'x', long)]
        matrix: String,

        /// Output file path
        #[arg(short, long)]
        output: String,
    },

    /// Compute principal component scores for the samples
    Pca {
        /// Path to the expression matrix CSV/TSV file
        #[arg(short = 'x', long)]
        matrix: String,

        /// Output file path
        #[arg(short, long)]
        output: String,

        /// Number of components [default: 2]
        #[arg(short = 'k', long, default_value = "2")]
        components: usize,
    },
}
