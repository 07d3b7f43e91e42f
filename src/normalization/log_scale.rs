//! Log2-scale detection and transformation
//!
//! Intensity matrices arrive either already log2-transformed or on the raw
//! linear scale. The distinction is not provable from the data alone; the
//! heuristic here follows the common convention that log2 intensities stay
//! below ~16 while linear intensities run into the hundreds or thousands.
//! The decision is logged so the caller can confirm it.

use crate::data::ExpressionMatrix;
use crate::error::{ExpressionError, Result};

/// Default maximum consistent with log2 scale
pub const DEFAULT_LOG_THRESHOLD: f64 = 16.0;

/// Heuristic check: does the matrix look like it is already on log2 scale?
///
/// True when the maximum value does not exceed `threshold`.
pub fn looks_log_scale(matrix: &ExpressionMatrix, threshold: f64) -> bool {
    matrix.max_value() <= threshold
}

/// Apply log2 element-wise, returning a new matrix.
///
/// Fails with `InvalidData` if any value is non-positive, since log2 is
/// undefined there.
pub fn log2_transform(matrix: &ExpressionMatrix) -> Result<ExpressionMatrix> {
    let min = matrix.min_value();
    if min <= 0.0 {
        return Err(ExpressionError::InvalidData {
            reason: format!(
                "log2 transform requires positive values, found minimum {}",
                min
            ),
        });
    }
    matrix.map_values(f64::log2)
}

/// Transform to log2 scale if the matrix does not already look log-scale.
///
/// Idempotent once log scale is reached: a matrix whose maximum is at or
/// below `threshold` passes through unchanged.
pub fn log2_if_needed(matrix: &ExpressionMatrix, threshold: f64) -> Result<ExpressionMatrix> {
    if looks_log_scale(matrix, threshold) {
        log::info!(
            "matrix maximum {:.3} <= {:.1}, treating values as log2 scale",
            matrix.max_value(),
            threshold
        );
        return Ok(matrix.clone());
    }

    log::info!(
        "matrix maximum {:.3} > {:.1}, applying log2 transform",
        matrix.max_value(),
        threshold
    );
    log2_transform(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_linear_scale_transformed() {
        let matrix = ExpressionMatrix::new(
            array![[256.0, 1024.0], [2.0, 4.0]],
            ids("f", 2),
            ids("s", 2),
        )
        .unwrap();

        let transformed = log2_if_needed(&matrix, DEFAULT_LOG_THRESHOLD).unwrap();
        assert_eq!(transformed.values()[[0, 0]], 8.0);
        assert_eq!(transformed.values()[[0, 1]], 10.0);
        assert_eq!(transformed.values()[[1, 0]], 1.0);
    }

    #[test]
    fn test_idempotent_once_log_scale() {
        let matrix = ExpressionMatrix::new(
            array![[256.0, 1024.0], [2.0, 4.0]],
            ids("f", 2),
            ids("s", 2),
        )
        .unwrap();

        let once = log2_if_needed(&matrix, DEFAULT_LOG_THRESHOLD).unwrap();
        let twice = log2_if_needed(&once, DEFAULT_LOG_THRESHOLD).unwrap();
        assert_eq!(once.values(), twice.values());
    }

    #[test]
    fn test_boundary_max_counts_as_log_scale() {
        // max exactly at the threshold passes through unchanged
        let matrix =
            ExpressionMatrix::new(array![[16.0, 3.0]], ids("f", 1), ids("s", 2)).unwrap();
        let out = log2_if_needed(&matrix, 16.0).unwrap();
        assert_eq!(out.values(), matrix.values());
    }

    #[test]
    fn test_non_positive_rejected() {
        let matrix =
            ExpressionMatrix::new(array![[100.0, -1.0]], ids("f", 1), ids("s", 2)).unwrap();
        assert!(log2_transform(&matrix).is_err());
        // heuristic requests a transform because max > threshold, so this fails too
        assert!(log2_if_needed(&matrix, DEFAULT_LOG_THRESHOLD).is_err());
    }
}
