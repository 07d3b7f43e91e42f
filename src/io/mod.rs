//! Reading and writing delimited data

mod csv;
mod results;

pub use csv::{
    read_expression_matrix, read_feature_annotation, read_sample_metadata,
    write_expression_matrix, write_labeled_matrix,
};
pub use results::{AnnotatedResults, RankBy, ResultsSummary};
