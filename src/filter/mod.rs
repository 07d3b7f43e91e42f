//! Feature filtering

mod variance;

pub use variance::{filter_by_variance, DEFAULT_KEEP_FRACTION};
