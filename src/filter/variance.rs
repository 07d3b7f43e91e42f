//! Variance-based feature filtering

use crate::data::ExpressionMatrix;
use crate::error::{ExpressionError, Result};

/// Default fraction of features to keep
pub const DEFAULT_KEEP_FRACTION: f64 = 0.5;

/// Keep the top `keep_fraction` of features ranked by variance across samples.
///
/// Retains exactly `round(keep_fraction * n_features)` features (at least 1).
/// Ties are broken by original order, and the retained features keep their
/// original relative order in the returned matrix. Sample columns are
/// unchanged. Deterministic; no randomness.
pub fn filter_by_variance(
    matrix: &ExpressionMatrix,
    keep_fraction: f64,
) -> Result<ExpressionMatrix> {
    if !(keep_fraction > 0.0 && keep_fraction <= 1.0) {
        return Err(ExpressionError::InvalidData {
            reason: format!(
                "keep fraction must be in (0, 1], got {}",
                keep_fraction
            ),
        });
    }

    let n = matrix.n_features();
    let n_keep = ((keep_fraction * n as f64).round() as usize).clamp(1, n);

    let variances = matrix.feature_variances();

    // Stable sort by descending variance leaves ties in original order
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        variances[b]
            .partial_cmp(&variances[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<usize> = order.into_iter().take(n_keep).collect();
    keep.sort_unstable();

    log::info!(
        "variance filter retained {} of {} features (keep fraction {})",
        n_keep,
        n,
        keep_fraction
    );

    matrix.subset_features(&keep)
}
