//! Empirical Bayes moderation of per-feature statistics

use rayon::prelude::*;

use super::prior::{estimate_variance_prior, VariancePrior};
use crate::error::Result;
use crate::model::ContrastFit;
use crate::testing::{benjamini_hochberg, two_sided_t_pvalue};

/// Default prior probability that a feature is differentially expressed
pub const DEFAULT_DE_PROPORTION: f64 = 0.01;

/// Window for the prior effect standard deviation, on the residual-sd scale.
/// Keeps the log-odds statistic sane when the tail estimate misbehaves.
const EFFECT_SD_WINDOW: (f64, f64) = (0.1, 4.0);

/// Options for the moderation step
#[derive(Debug, Clone)]
pub struct ModerationOptions {
    /// Prior probability of differential expression, used by the B statistic
    pub proportion: f64,
}

impl Default for ModerationOptions {
    fn default() -> Self {
        Self {
            proportion: DEFAULT_DE_PROPORTION,
        }
    }
}

/// Per-feature moderated statistics for one contrast
#[derive(Debug, Clone)]
pub struct ModeratedStats {
    /// Feature identifiers, in fit order
    pub feature_ids: Vec<String>,
    /// Effect size (log2 fold change for a two-group contrast)
    pub effects: Vec<f64>,
    /// Moderated t-statistics
    pub t_statistics: Vec<f64>,
    /// Two-sided raw p-values
    pub p_values: Vec<f64>,
    /// Benjamini-Hochberg adjusted p-values
    pub adjusted_p_values: Vec<f64>,
    /// Log posterior odds of differential expression (B statistic)
    pub log_odds: Vec<f64>,
    /// Posterior (shrunken) residual variances
    pub posterior_variances: Vec<f64>,
    /// Total degrees of freedom d0 + d
    pub df_total: f64,
    /// The estimated variance prior (carries the fallback flag)
    pub prior: VariancePrior,
    /// Contrast description, carried from the fit
    pub contrast: String,
}

impl ModeratedStats {
    /// Number of features tested
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// True when the prior could not be estimated and ordinary t-statistics
    /// were reported
    pub fn shrinkage_disabled(&self) -> bool {
        self.prior.shrinkage_disabled
    }
}

/// Moderate a contrast fit: shrink variances toward the global prior, then
/// compute moderated t-statistics, p-values, adjusted p-values, and B.
pub fn moderate(fit: &ContrastFit, options: &ModerationOptions) -> Result<ModeratedStats> {
    let variances: Vec<f64> = fit.sigma.iter().map(|s| s * s).collect();

    // The one full-matrix reduction: every per-feature variance must be in
    // before the prior can be estimated
    let prior = estimate_variance_prior(&variances, fit.df_residual);
    if prior.shrinkage_disabled {
        log::warn!(
            "empirical Bayes shrinkage disabled for contrast '{}': reporting \
             ordinary t-statistics",
            fit.description
        );
    }

    let d0 = prior.df_prior;
    let d = fit.df_residual;
    let df_total = d0 + d;

    let posterior_variances: Vec<f64> = variances
        .iter()
        .map(|&s2| {
            if d0 > 0.0 {
                (d0 * prior.var_prior + d * s2) / df_total
            } else {
                s2
            }
        })
        .collect();

    let u = fit.unscaled_sd;
    let t_statistics: Vec<f64> = fit
        .effects
        .iter()
        .zip(posterior_variances.iter())
        .map(|(&effect, &pv)| {
            let se = pv.sqrt() * u;
            if se > 0.0 {
                effect / se
            } else if effect != 0.0 {
                // zero residual variance with a real effect: infinitely strong
                effect.signum() * f64::INFINITY
            } else {
                f64::NAN
            }
        })
        .collect();

    let p_values: Vec<f64> = t_statistics
        .par_iter()
        .map(|&t| two_sided_t_pvalue(t, df_total))
        .collect();

    let adjusted_p_values = benjamini_hochberg(&p_values);

    let v0 = effect_prior_variance(&t_statistics, u, df_total, options.proportion, &prior, &posterior_variances);
    let log_odds = log_odds_statistics(&t_statistics, u, v0, df_total, options.proportion);

    Ok(ModeratedStats {
        feature_ids: fit.feature_ids.clone(),
        effects: fit.effects.clone(),
        t_statistics,
        p_values,
        adjusted_p_values,
        log_odds,
        posterior_variances,
        df_total,
        prior,
        contrast: fit.description.clone(),
    })
}

/// Estimate the prior variance v0 of true effects, on the unscaled scale.
///
/// Matches the upper tail of the |t| distribution: for the top
/// `ceil(proportion/2 * n)` statistics, the inflation of t over its null
/// quantile implies `v0 = u^2 (t^2/q^2 - 1)`. The mean of the positive
/// estimates is clamped to an effect-sd window so a wild tail cannot swamp
/// the B statistic; when nothing is estimable the window floor applies.
fn effect_prior_variance(
    t_statistics: &[f64],
    unscaled_sd: f64,
    df_total: f64,
    proportion: f64,
    prior: &VariancePrior,
    posterior_variances: &[f64],
) -> f64 {
    use statrs::distribution::{ContinuousCDF, StudentsT};

    let n = t_statistics.len();
    let u2 = unscaled_sd * unscaled_sd;

    // Reference residual variance for the clamp window
    let s2_ref = if prior.shrinkage_disabled {
        let mut positive: Vec<f64> = posterior_variances
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        if positive.is_empty() {
            1.0
        } else {
            positive.sort_by(f64::total_cmp);
            positive[positive.len() / 2]
        }
    } else {
        prior.var_prior
    };
    let s2_ref = s2_ref.max(1e-12);

    let (lo, hi) = EFFECT_SD_WINDOW;
    let v0_min = lo * lo / s2_ref;
    let v0_max = hi * hi / s2_ref;

    let n_target = ((proportion / 2.0) * n as f64).ceil() as usize;
    if n_target == 0 {
        return v0_min;
    }

    let mut abs_t: Vec<f64> = t_statistics
        .iter()
        .map(|t| t.abs())
        .filter(|t| t.is_finite())
        .collect();
    abs_t.sort_by(|a, b| b.total_cmp(a));

    let dist = match StudentsT::new(0.0, 1.0, df_total) {
        Ok(d) => d,
        Err(_) => return v0_min,
    };

    let mut estimates = Vec::new();
    for (rank, &t) in abs_t.iter().take(n_target).enumerate() {
        let tail = (rank as f64 + 0.5) / n as f64;
        let q = dist.inverse_cdf(1.0 - tail / 2.0);
        if q > 0.0 && t > q {
            estimates.push(u2 * (t * t / (q * q) - 1.0));
        }
    }

    if estimates.is_empty() {
        return v0_min;
    }
    let v0 = estimates.iter().sum::<f64>() / estimates.len() as f64;
    v0.clamp(v0_min, v0_max)
}

/// The B statistic: log posterior odds of differential expression
fn log_odds_statistics(
    t_statistics: &[f64],
    unscaled_sd: f64,
    v0: f64,
    df_total: f64,
    proportion: f64,
) -> Vec<f64> {
    let u2 = unscaled_sd * unscaled_sd;
    let r = (u2 + v0) / u2;
    let prior_odds = (proportion / (1.0 - proportion)).ln();

    t_statistics
        .iter()
        .map(|&t| {
            if t.is_nan() {
                return f64::NAN;
            }
            let kernel = if t.is_infinite() {
                // limit of the kernel as t^2 grows without bound
                (df_total + 1.0) / 2.0 * r.ln()
            } else {
                let t2 = t * t;
                (df_total + 1.0) / 2.0 * ((t2 + df_total) / (t2 / r + df_total)).ln()
            };
            prior_odds - 0.5 * r.ln() + kernel
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ExpressionMatrix, SampleMetadata};
    use crate::model::{build_design, evaluate_contrast, fit_linear_models, Contrast};
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn three_vs_three(rows: Vec<Vec<f64>>) -> ContrastFit {
        let n_features = rows.len();
        let mut values = Array2::zeros((n_features, 6));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                values[[i, j]] = v;
            }
        }
        let matrix = ExpressionMatrix::new(
            values,
            (1..=n_features).map(|i| format!("f{}", i)).collect(),
            (1..=6).map(|i| format!("s{}", i)).collect(),
        )
        .unwrap();

        let mut meta =
            SampleMetadata::new((1..=6).map(|i| format!("s{}", i)).collect()).unwrap();
        meta.add_column(
            "group",
            vec![
                "normal".to_string(),
                "normal".to_string(),
                "normal".to_string(),
                "tumor".to_string(),
                "tumor".to_string(),
                "tumor".to_string(),
            ],
        )
        .unwrap();

        let design = build_design(&meta, "group", None).unwrap();
        let fit = fit_linear_models(&matrix, &design, None).unwrap();
        let contrast = Contrast::two_group(&design, "tumor", "normal").unwrap();
        evaluate_contrast(&fit, &contrast).unwrap()
    }

    #[test]
    fn test_fallback_matches_ordinary_t() {
        // identical within-group variances across features force the fallback
        let cf = three_vs_three(vec![
            vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0],
            vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0],
            vec![5.0, 6.0, 7.0, 5.0, 6.0, 7.0],
        ]);

        let stats = moderate(&cf, &ModerationOptions::default()).unwrap();
        assert!(stats.shrinkage_disabled());
        assert_eq!(stats.df_total, cf.df_residual);

        // moderated t collapses to effect / (sigma * unscaled sd)
        for g in 0..3 {
            let ordinary = cf.effects[g] / (cf.sigma[g] * cf.unscaled_sd);
            assert_abs_diff_eq!(stats.t_statistics[g], ordinary, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_shrinkage_pulls_variances_toward_prior() {
        // heterogeneous variances: noise rows scaled over two orders of magnitude
        let mut rows = vec![vec![0.0, 0.5, 1.0, 5.0, 5.5, 6.0]];
        for k in 1..=8 {
            let scale = 0.05 * 1.9f64.powi(k);
            rows.push(vec![-scale, 0.0, scale, -scale, 0.0, scale]);
        }
        let cf = three_vs_three(rows);

        let stats = moderate(&cf, &ModerationOptions::default()).unwrap();
        assert!(!stats.shrinkage_disabled());
        assert!(stats.df_total > cf.df_residual);

        // each posterior variance lies between its raw variance and the prior
        let s0 = stats.prior.var_prior;
        for g in 0..stats.n_features() {
            let s2 = cf.sigma[g] * cf.sigma[g];
            let post = stats.posterior_variances[g];
            let (low, high) = if s2 < s0 { (s2, s0) } else { (s0, s2) };
            assert!(
                post >= low - 1e-12 && post <= high + 1e-12,
                "posterior {} outside [{}, {}]",
                post,
                low,
                high
            );
        }
    }

    #[test]
    fn test_pvalues_valid_and_effect_ranked() {
        let cf = three_vs_three(vec![
            vec![0.0, 0.5, 1.0, 9.0, 9.5, 10.0],
            vec![0.0, 0.5, 1.0, 0.2, 0.7, 1.2],
            vec![-0.5, 0.0, 0.5, -0.4, 0.1, 0.6],
        ]);

        let stats = moderate(&cf, &ModerationOptions::default()).unwrap();
        for &p in &stats.p_values {
            assert!(p >= 0.0 && p <= 1.0);
        }
        // the shifted feature dominates both rankings
        assert!(stats.p_values[0] < stats.p_values[1]);
        assert!(stats.log_odds[0] > stats.log_odds[1]);
        assert!(stats.log_odds[0] > stats.log_odds[2]);
    }

    #[test]
    fn test_zero_variance_feature_with_effect() {
        // exact shift with zero noise alongside noisy features; the zero
        // residual must surface as overwhelming evidence, not NaN
        let mut rows = vec![vec![1.0, 1.0, 1.0, 6.0, 6.0, 6.0]];
        for k in 1..=7 {
            let scale = 0.1 * 1.8f64.powi(k);
            rows.push(vec![-scale, 0.0, scale, -scale, 0.0, scale]);
        }
        let cf = three_vs_three(rows);

        let stats = moderate(&cf, &ModerationOptions::default()).unwrap();
        // with shrinkage enabled, the zero variance is moderated upward and
        // the statistic is finite
        assert!(!stats.shrinkage_disabled());
        assert!(stats.t_statistics[0].is_finite());
        assert!(stats.p_values[0] < 1e-4);
        assert!(stats.log_odds[0] > stats.log_odds[1]);
    }
}
