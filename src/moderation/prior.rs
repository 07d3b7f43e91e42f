//! Variance prior estimation across features
//!
//! The prior for the true residual variances is a scaled inverse chi-squared
//! distribution with degrees of freedom `d0` and location `s0^2`, estimated by
//! matching moments of the log sample variances across all features at once
//! (Smyth 2004). Pooling across features is what buys power at small sample
//! sizes: no single feature could support a variance estimate this stable.

use statrs::function::gamma::digamma;

/// Estimated variance prior shared by all features
#[derive(Debug, Clone)]
pub struct VariancePrior {
    /// Prior degrees of freedom d0; 0 disables shrinkage
    pub df_prior: f64,
    /// Prior variance s0^2; meaningless when `df_prior` is 0
    pub var_prior: f64,
    /// True when the prior could not be estimated and d0 fell back to 0
    pub shrinkage_disabled: bool,
}

impl VariancePrior {
    fn disabled() -> Self {
        Self {
            df_prior: 0.0,
            var_prior: f64::NAN,
            shrinkage_disabled: true,
        }
    }
}

/// Estimate the variance prior from per-feature sample variances.
///
/// Under the model, `e_g = ln s_g^2 - digamma(d/2) + ln(d/2)` has mean
/// `ln s0^2 + digamma(d0/2) - ln(d0/2)` and variance
/// `trigamma(d0/2) + trigamma(d/2)`, so the spread of the observed log
/// variances in excess of `trigamma(d/2)` identifies d0.
///
/// Degenerate inputs (fewer than two usable variances, or log-variance spread
/// at or below the sampling noise floor, which includes all-identical and
/// all-zero variances) disable shrinkage: d0 = 0, equivalent to the ordinary
/// per-feature t-test. The fallback is logged, never silent.
pub fn estimate_variance_prior(variances: &[f64], df_residual: f64) -> VariancePrior {
    if df_residual <= 0.0 {
        log::warn!("non-positive residual degrees of freedom; shrinkage disabled");
        return VariancePrior::disabled();
    }

    let log_vars: Vec<f64> = variances
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(f64::ln)
        .collect();

    if log_vars.len() < 2 {
        log::warn!(
            "only {} usable variance(s) of {}; prior degrees of freedom cannot be \
             estimated, shrinkage disabled",
            log_vars.len(),
            variances.len()
        );
        return VariancePrior::disabled();
    }

    let half_df = df_residual / 2.0;
    let offset = digamma(half_df) - half_df.ln();

    let n = log_vars.len() as f64;
    let e_mean = log_vars.iter().map(|z| z - offset).sum::<f64>() / n;
    let e_var = log_vars
        .iter()
        .map(|z| {
            let e = z - offset;
            (e - e_mean) * (e - e_mean)
        })
        .sum::<f64>()
        / (n - 1.0);

    let excess = e_var - trigamma(half_df);
    if excess <= 0.0 {
        log::warn!(
            "log-variance spread ({:.4}) does not exceed the sampling noise floor \
             ({:.4}); prior degrees of freedom cannot be estimated, shrinkage disabled",
            e_var,
            trigamma(half_df)
        );
        return VariancePrior::disabled();
    }

    let df_prior = 2.0 * trigamma_inverse(excess);
    let half_prior = df_prior / 2.0;
    let var_prior = (e_mean + digamma(half_prior) - half_prior.ln()).exp();

    if !df_prior.is_finite() || !var_prior.is_finite() || var_prior <= 0.0 {
        log::warn!("variance prior estimate degenerate; shrinkage disabled");
        return VariancePrior::disabled();
    }

    log::debug!(
        "variance prior: d0 = {:.4}, s0^2 = {:.6}",
        df_prior,
        var_prior
    );

    VariancePrior {
        df_prior,
        var_prior,
        shrinkage_disabled: false,
    }
}

/// Trigamma function psi'(x) for x > 0.
///
/// Recurrence shifts the argument above 6, then the asymptotic series applies.
pub(crate) fn trigamma(mut x: f64) -> f64 {
    debug_assert!(x > 0.0);
    let mut acc = 0.0;
    while x < 6.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    // 1/x + 1/(2x^2) + 1/(6x^3) - 1/(30x^5) + 1/(42x^7) - 1/(30x^9)
    let series = inv
        + 0.5 * inv2
        + inv2 * inv * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 * (1.0 / 42.0 - inv2 / 30.0)));
    acc + series
}

/// Invert the trigamma function: find x > 0 with trigamma(x) = y.
///
/// Trigamma is strictly decreasing from +inf to 0, so bisection on a wide
/// bracket converges unconditionally.
pub(crate) fn trigamma_inverse(y: f64) -> f64 {
    if y > 1e7 {
        return 1.0 / y.sqrt();
    }
    if y < 1e-6 {
        return 1.0 / y;
    }

    let mut lo = 1e-4;
    let mut hi = 1e7;
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if trigamma(mid) > y {
            lo = mid;
        } else {
            hi = mid;
        }
        if (hi - lo) < 1e-12 * hi {
            break;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_trigamma_known_values() {
        // trigamma(1) = pi^2/6, trigamma(0.5) = pi^2/2
        let pi2 = std::f64::consts::PI * std::f64::consts::PI;
        assert_abs_diff_eq!(trigamma(1.0), pi2 / 6.0, epsilon = 1e-10);
        assert_abs_diff_eq!(trigamma(0.5), pi2 / 2.0, epsilon = 1e-10);
        // recurrence: trigamma(2) = trigamma(1) - 1
        assert_abs_diff_eq!(trigamma(2.0), pi2 / 6.0 - 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_trigamma_inverse_round_trip() {
        for x in [0.1, 0.5, 1.0, 2.0, 10.0, 100.0] {
            let y = trigamma(x);
            assert_abs_diff_eq!(trigamma_inverse(y), x, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_prior_estimated_for_spread_variances() {
        // variances spanning two orders of magnitude: spread well above the
        // chi-squared sampling noise for d = 4
        let variances = vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0];
        let prior = estimate_variance_prior(&variances, 4.0);

        assert!(!prior.shrinkage_disabled);
        assert!(prior.df_prior > 0.0 && prior.df_prior.is_finite());
        assert!(prior.var_prior > 0.0 && prior.var_prior.is_finite());
        // the prior location sits inside the observed range
        assert!(prior.var_prior > 0.01 && prior.var_prior < 10.0);
    }

    #[test]
    fn test_identical_variances_fall_back() {
        let variances = vec![1.5; 20];
        let prior = estimate_variance_prior(&variances, 4.0);
        assert!(prior.shrinkage_disabled);
        assert_eq!(prior.df_prior, 0.0);
    }

    #[test]
    fn test_too_few_variances_fall_back() {
        let prior = estimate_variance_prior(&[2.0], 4.0);
        assert!(prior.shrinkage_disabled);

        let all_zero = estimate_variance_prior(&[0.0, 0.0, 0.0], 4.0);
        assert!(all_zero.shrinkage_disabled);
    }

    #[test]
    fn test_zero_variances_excluded_not_fatal() {
        // zero-variance features are excluded from estimation but do not
        // prevent a prior when enough informative features remain
        let variances = vec![0.0, 0.0, 0.01, 0.1, 1.0, 10.0, 0.5, 2.0, 0.05, 5.0];
        let prior = estimate_variance_prior(&variances, 4.0);
        assert!(!prior.shrinkage_disabled);
    }
}
