//! Design matrix construction from sample metadata

use ndarray::Array2;

use crate::data::SampleMetadata;
use crate::error::{ExpressionError, Result};

/// A group-means design matrix: one indicator column per group level, no
/// intercept. Every sample row has exactly one 1.
#[derive(Debug, Clone)]
pub struct Design {
    /// Indicator matrix (samples x levels)
    pub matrix: Array2<f64>,
    /// Column names, one per group level
    pub level_names: Vec<String>,
    /// Metadata column the design was built from
    pub group_column: String,
}

impl Design {
    /// Number of design columns (group levels)
    pub fn n_levels(&self) -> usize {
        self.level_names.len()
    }

    /// Column index of a level name
    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.level_names.iter().position(|l| l == level)
    }
}

/// Build a one-hot design matrix from a categorical group column.
///
/// Levels are enumerated in first-encountered order unless `level_order` is
/// given; a caller-supplied order must cover every observed level (it may
/// name additional, unobserved levels, which then produce all-zero columns
/// caught by the rank check). A sample with a missing/empty group value fails
/// with `InvalidGroup` naming the sample.
pub fn build_design(
    metadata: &SampleMetadata,
    group_column: &str,
    level_order: Option<&[String]>,
) -> Result<Design> {
    let values = metadata
        .column(group_column)
        .ok_or_else(|| ExpressionError::InvalidData {
            reason: format!("group column '{}' not found in metadata", group_column),
        })?;

    for (i, value) in values.iter().enumerate() {
        if value.is_empty() {
            return Err(ExpressionError::InvalidGroup {
                sample_id: metadata.sample_ids()[i].clone(),
                column: group_column.to_string(),
            });
        }
    }

    let observed = metadata
        .levels_in_order(group_column)
        .unwrap_or_default();

    let levels: Vec<String> = match level_order {
        Some(order) => {
            for level in &observed {
                if !order.contains(level) {
                    return Err(ExpressionError::InvalidData {
                        reason: format!(
                            "observed group level '{}' missing from requested level order",
                            level
                        ),
                    });
                }
            }
            order.to_vec()
        }
        None => observed,
    };

    if levels.is_empty() {
        return Err(ExpressionError::EmptyData {
            reason: "no group levels observed".to_string(),
        });
    }

    let n_samples = metadata.n_samples();
    let mut matrix = Array2::zeros((n_samples, levels.len()));
    for (i, value) in values.iter().enumerate() {
        let j = levels
            .iter()
            .position(|l| l == value)
            .expect("observed levels verified covered");
        matrix[[i, j]] = 1.0;
    }

    check_full_rank(&matrix)?;

    Ok(Design {
        matrix,
        level_names: levels,
        group_column: group_column.to_string(),
    })
}

/// Verify a design matrix has full column rank.
///
/// Failure distinguishes an all-zero column (a group level with no samples)
/// from collinear columns.
pub fn check_full_rank(matrix: &Array2<f64>) -> Result<()> {
    let (n_rows, n_cols) = matrix.dim();

    if n_rows == 0 || n_cols == 0 {
        return Err(ExpressionError::RankDeficiency {
            reason: "design matrix has zero rows or columns".to_string(),
        });
    }

    if column_rank(matrix) < n_cols {
        let zero_col = (0..n_cols).find(|&j| matrix.column(j).iter().all(|&v| v == 0.0));
        let reason = match zero_col {
            Some(j) => format!(
                "column {} is all zeros (a group level with no samples)",
                j
            ),
            None => "one or more columns are linear combinations of the others".to_string(),
        };
        return Err(ExpressionError::RankDeficiency { reason });
    }

    Ok(())
}

/// Numerical column rank via Householder QR with column pivoting.
///
/// Counts diagonal entries of R above `max(n_rows, n_cols) * eps * max |diag R|`.
fn column_rank(matrix: &Array2<f64>) -> usize {
    let (m, p) = matrix.dim();
    let k = m.min(p);
    let mut r = matrix.to_owned();

    let mut norms_sq: Vec<f64> = (0..p)
        .map(|j| r.column(j).iter().map(|&v| v * v).sum())
        .collect();

    for step in 0..k {
        // Bring the column with the largest remaining norm to the front
        let pivot = (step..p)
            .max_by(|&a, &b| norms_sq[a].total_cmp(&norms_sq[b]))
            .unwrap_or(step);
        if pivot != step {
            for i in 0..m {
                r.swap([i, step], [i, pivot]);
            }
            norms_sq.swap(step, pivot);
        }

        let mut alpha: f64 = (step..m)
            .map(|i| r[[i, step]] * r[[i, step]])
            .sum::<f64>()
            .sqrt();
        if alpha < f64::EPSILON * 1e3 {
            // Remaining columns are numerically zero
            break;
        }
        if r[[step, step]] > 0.0 {
            alpha = -alpha;
        }

        let v0 = r[[step, step]] - alpha;
        r[[step, step]] = alpha;

        let v_norm_sq: f64 =
            v0 * v0 + (step + 1..m).map(|i| r[[i, step]] * r[[i, step]]).sum::<f64>();
        if v_norm_sq < f64::MIN_POSITIVE {
            continue;
        }
        let tau = 2.0 / v_norm_sq;

        for j in step + 1..p {
            let dot: f64 = v0 * r[[step, j]]
                + (step + 1..m).map(|i| r[[i, step]] * r[[i, j]]).sum::<f64>();
            let scale = tau * dot;
            r[[step, j]] -= scale * v0;
            for i in step + 1..m {
                r[[i, j]] -= scale * r[[i, step]];
            }
        }

        for j in step + 1..p {
            norms_sq[j] = (norms_sq[j] - r[[step, j]] * r[[step, j]]).max(0.0);
        }
    }

    let max_abs_diag = (0..k).map(|i| r[[i, i]].abs()).fold(0.0f64, f64::max);
    let tol = m.max(p) as f64 * f64::EPSILON * max_abs_diag;
    (0..k).filter(|&i| r[[i, i]].abs() > tol).count()
}
