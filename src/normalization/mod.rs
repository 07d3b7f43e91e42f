//! Scale normalization for expression matrices

mod log_scale;

pub use log_scale::{log2_if_needed, log2_transform, looks_log_scale, DEFAULT_LOG_THRESHOLD};
