//! Contrast evaluation over fitted coefficients

use super::design::Design;
use super::fitting::FitResult;
use crate::error::{ExpressionError, Result};

/// A linear combination of design coefficients defining a comparison
#[derive(Debug, Clone)]
pub struct Contrast {
    /// One weight per design column
    pub weights: Vec<f64>,
    /// Human-readable description, e.g. "tumor - normal"
    pub description: String,
}

impl Contrast {
    /// Build the standard two-group comparison `numerator - denominator`
    pub fn two_group(design: &Design, numerator: &str, denominator: &str) -> Result<Self> {
        let num_idx = design.level_index(numerator).ok_or_else(|| {
            ExpressionError::InvalidContrast {
                reason: format!(
                    "level '{}' not in design columns {:?}",
                    numerator, design.level_names
                ),
            }
        })?;
        let den_idx = design.level_index(denominator).ok_or_else(|| {
            ExpressionError::InvalidContrast {
                reason: format!(
                    "level '{}' not in design columns {:?}",
                    denominator, design.level_names
                ),
            }
        })?;
        if num_idx == den_idx {
            return Err(ExpressionError::InvalidContrast {
                reason: format!("numerator and denominator are both '{}'", numerator),
            });
        }

        let mut weights = vec![0.0; design.n_levels()];
        weights[num_idx] = 1.0;
        weights[den_idx] = -1.0;

        Ok(Self {
            weights,
            description: format!("{} - {}", numerator, denominator),
        })
    }

    /// Build a contrast from an explicit weight vector
    pub fn from_weights(weights: Vec<f64>, description: &str) -> Self {
        Self {
            weights,
            description: description.to_string(),
        }
    }
}

/// A contrast evaluated against a fit: per-feature effect sizes plus the
/// shared scale information needed for moderation.
///
/// Evaluation never mutates the `FitResult`; several contrasts can be
/// evaluated independently against the same fit.
#[derive(Debug, Clone)]
pub struct ContrastFit {
    /// Feature identifiers, in fit order
    pub feature_ids: Vec<String>,
    /// Estimated effect `c . beta` per feature
    pub effects: Vec<f64>,
    /// Unscaled standard deviation sqrt(c' (X'WX)^-1 c), shared across features
    pub unscaled_sd: f64,
    /// Residual standard deviation per feature, carried from the fit
    pub sigma: Vec<f64>,
    /// Residual degrees of freedom, carried from the fit
    pub df_residual: f64,
    /// Contrast description
    pub description: String,
}

/// Evaluate a contrast against a fit
pub fn evaluate_contrast(fit: &FitResult, contrast: &Contrast) -> Result<ContrastFit> {
    let n_coefs = fit.coefficients.ncols();
    if contrast.weights.len() != n_coefs {
        return Err(ExpressionError::InvalidContrast {
            reason: format!(
                "contrast has {} weights but the design has {} columns",
                contrast.weights.len(),
                n_coefs
            ),
        });
    }

    let c = &contrast.weights;

    // c' (X'WX)^-1 c
    let mut unscaled_var = 0.0;
    for j in 0..n_coefs {
        for k in 0..n_coefs {
            unscaled_var += c[j] * fit.cov_unscaled[[j, k]] * c[k];
        }
    }
    if !(unscaled_var > 0.0) || !unscaled_var.is_finite() {
        return Err(ExpressionError::InvalidContrast {
            reason: format!(
                "contrast '{}' has non-positive variance; is the weight vector zero?",
                contrast.description
            ),
        });
    }

    let effects: Vec<f64> = (0..fit.coefficients.nrows())
        .map(|g| (0..n_coefs).map(|j| c[j] * fit.coefficients[[g, j]]).sum())
        .collect();

    Ok(ContrastFit {
        feature_ids: fit.feature_ids.clone(),
        effects,
        unscaled_sd: unscaled_var.sqrt(),
        sigma: fit.sigma.clone(),
        df_residual: fit.df_residual,
        description: contrast.description.clone(),
    })
}
