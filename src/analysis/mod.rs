//! Unsupervised structure summaries: correlation and PCA

mod correlation;
mod pca;

pub use correlation::sample_correlation;
pub use pca::{principal_components, PcaResult};
