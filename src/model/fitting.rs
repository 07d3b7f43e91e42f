//! Per-feature weighted least-squares model fitting

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

use super::design::Design;
use crate::data::ExpressionMatrix;
use crate::error::{ExpressionError, Result};

/// Fitted linear models for every feature against a shared design.
///
/// The design and per-sample weights are shared across features, so the
/// unscaled coefficient covariance `(X'WX)^-1` and the residual degrees of
/// freedom are computed once. Immutable once computed.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Feature identifiers, in matrix row order
    pub feature_ids: Vec<String>,
    /// Estimated coefficients (features x design columns)
    pub coefficients: Array2<f64>,
    /// Residual standard deviation per feature
    pub sigma: Vec<f64>,
    /// Residual degrees of freedom, samples - design columns
    pub df_residual: f64,
    /// Unscaled coefficient covariance (X'WX)^-1, shared across features
    pub cov_unscaled: Array2<f64>,
    /// Design column names
    pub coef_names: Vec<String>,
}

/// Fit a linear model per feature: minimize ||W^(1/2)(y - X beta)||^2.
///
/// `weights` are per-sample and default to 1.0; they must be positive and
/// finite. Fails with `RankDeficiency` if the design is not full column rank
/// or leaves zero residual degrees of freedom (e.g. one sample per group).
pub fn fit_linear_models(
    matrix: &ExpressionMatrix,
    design: &Design,
    weights: Option<&[f64]>,
) -> Result<FitResult> {
    let n_samples = matrix.n_samples();
    let n_coefs = design.matrix.ncols();

    if design.matrix.nrows() != n_samples {
        return Err(ExpressionError::DimensionMismatch {
            expected: format!("{} design rows", n_samples),
            got: format!("{} design rows", design.matrix.nrows()),
        });
    }

    let w: Vec<f64> = match weights {
        Some(w) => {
            if w.len() != n_samples {
                return Err(ExpressionError::DimensionMismatch {
                    expected: format!("{} weights", n_samples),
                    got: format!("{} weights", w.len()),
                });
            }
            if w.iter().any(|&v| !v.is_finite() || v <= 0.0) {
                return Err(ExpressionError::InvalidData {
                    reason: "sample weights must be positive and finite".to_string(),
                });
            }
            w.to_vec()
        }
        None => vec![1.0; n_samples],
    };

    super::design::check_full_rank(&design.matrix)?;

    if n_samples <= n_coefs {
        return Err(ExpressionError::RankDeficiency {
            reason: format!(
                "zero residual degrees of freedom: {} samples for {} design columns \
                 (is some group down to a single sample?)",
                n_samples, n_coefs
            ),
        });
    }
    let df_residual = (n_samples - n_coefs) as f64;

    // X'WX is shared by every feature; factor it once
    let x = &design.matrix;
    let mut xtwx = Array2::zeros((n_coefs, n_coefs));
    for j in 0..n_coefs {
        for k in j..n_coefs {
            let mut acc = 0.0;
            for i in 0..n_samples {
                acc += w[i] * x[[i, j]] * x[[i, k]];
            }
            xtwx[[j, k]] = acc;
            xtwx[[k, j]] = acc;
        }
    }

    let chol = cholesky(&xtwx).ok_or_else(|| ExpressionError::RankDeficiency {
        reason: "X'WX is not positive definite".to_string(),
    })?;
    let cov_unscaled = cholesky_inverse(&chol);

    let n_features = matrix.n_features();
    let fits: Vec<(Vec<f64>, f64)> = (0..n_features)
        .into_par_iter()
        .map(|g| fit_single_feature(matrix.feature_values(g), x, &w, &chol, df_residual))
        .collect();

    let mut coefficients = Array2::zeros((n_features, n_coefs));
    let mut sigma = Vec::with_capacity(n_features);
    for (g, (beta, s)) in fits.into_iter().enumerate() {
        for j in 0..n_coefs {
            coefficients[[g, j]] = beta[j];
        }
        sigma.push(s);
    }

    Ok(FitResult {
        feature_ids: matrix.feature_ids().to_vec(),
        coefficients,
        sigma,
        df_residual,
        cov_unscaled,
        coef_names: design.level_names.clone(),
    })
}

/// Solve the weighted normal equations for one feature row
fn fit_single_feature(
    y: ArrayView1<'_, f64>,
    x: &Array2<f64>,
    w: &[f64],
    chol: &Array2<f64>,
    df_residual: f64,
) -> (Vec<f64>, f64) {
    let (n_samples, n_coefs) = x.dim();

    // X'Wy
    let mut rhs = vec![0.0; n_coefs];
    for j in 0..n_coefs {
        let mut acc = 0.0;
        for i in 0..n_samples {
            acc += w[i] * x[[i, j]] * y[i];
        }
        rhs[j] = acc;
    }

    let beta = cholesky_solve(chol, &rhs);

    let mut rss = 0.0;
    for i in 0..n_samples {
        let fitted: f64 = (0..n_coefs).map(|j| x[[i, j]] * beta[j]).sum();
        let resid = y[i] - fitted;
        rss += w[i] * resid * resid;
    }

    let sigma = (rss.max(0.0) / df_residual).sqrt();
    (beta, sigma)
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
/// Returns None when the matrix is not positive definite.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l: Array2<f64> = Array2::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return None;
        }
        l[[j, j]] = diag.sqrt();
        for i in j + 1..n {
            let mut v = a[[i, j]];
            for k in 0..j {
                v -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = v / l[[j, j]];
        }
    }
    Some(l)
}

/// Solve L L' x = b given the lower Cholesky factor
fn cholesky_solve(l: &Array2<f64>, b: &[f64]) -> Vec<f64> {
    let n = l.nrows();

    // forward: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut v = b[i];
        for k in 0..i {
            v -= l[[i, k]] * z[k];
        }
        z[i] = v / l[[i, i]];
    }

    // backward: L' x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut v = z[i];
        for k in i + 1..n {
            v -= l[[k, i]] * x[k];
        }
        x[i] = v / l[[i, i]];
    }
    x
}

/// Invert A = L L' column by column
fn cholesky_inverse(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inv = Array2::zeros((n, n));
    let mut unit = vec![0.0; n];
    for j in 0..n {
        unit[j] = 1.0;
        let col = cholesky_solve(l, &unit);
        for i in 0..n {
            inv[[i, j]] = col[i];
        }
        unit[j] = 0.0;
    }
    inv
}
