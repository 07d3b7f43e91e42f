//! Error types for the expression analysis pipeline

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum ExpressionError {
    #[error("Invalid expression data: {reason}")]
    InvalidData { reason: String },

    #[error(
        "Sample identifiers disagree between matrix and metadata; \
         missing from metadata: [{}]; missing from matrix: [{}]",
        .missing_in_metadata.join(", "),
        .missing_in_matrix.join(", ")
    )]
    SampleMismatch {
        missing_in_metadata: Vec<String>,
        missing_in_matrix: Vec<String>,
    },

    #[error("Sample '{sample_id}' has no value for group column '{column}'")]
    InvalidGroup { sample_id: String, column: String },

    #[error("Design matrix is rank deficient: {reason}")]
    RankDeficiency { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Invalid contrast: {reason}")]
    InvalidContrast { reason: String },

    #[error("No platform at index {index}; {available} platform(s) available")]
    NoSuchPlatform { index: usize, available: usize },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ExpressionError>;
