//! Data structures for expression analysis

mod dataset;
mod expression_matrix;
mod metadata;
mod platforms;

pub use dataset::ExpressionDataSet;
pub use expression_matrix::ExpressionMatrix;
pub use metadata::{FeatureAnnotation, SampleMetadata};
pub use platforms::{Platform, PlatformSet};
