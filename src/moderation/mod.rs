//! Empirical Bayes variance moderation

mod ebayes;
mod prior;

pub use ebayes::{moderate, ModeratedStats, ModerationOptions, DEFAULT_DE_PROPORTION};
pub use prior::{estimate_variance_prior, VariancePrior};
