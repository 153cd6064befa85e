//! The NSS fitter: attempt, judge, decide, finalize.
//!
//! The control flow is a small explicit state machine, not exception-driven:
//!
//! 1. validate inputs (fatal errors only)
//! 2. attempt the bounded NSS fit when the data can determine 6 parameters
//! 3. judge the attempt against the configured R² quality floor
//! 4. on failure or a sub-floor fit, substitute the monotone interpolant
//! 5. compute final metrics on the original observation set and finalize
//!
//! The NSS objective is non-convex in the decay constants, so a single start
//! point risks a poor local minimum. We instead launch the optimizer from a
//! deterministic grid of τ starts (log-spaced, τ2 > τ1) with data-derived β
//! starts, evaluate the starts in parallel, and select the lowest-SSE
//! converged candidate with index tie-breaking. Same inputs, same result.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{CurveFitResult, FitConfig, FitMethod, FittedCurve};
use crate::error::FitError;
use crate::fit::FitQuality;
use crate::interp::MonotonePchip;
use crate::math::{minimize, LmOptions};
use crate::models::NssParams;

/// Six free parameters need at least six observations; below this the NSS
/// attempt is skipped and the fitter goes straight to interpolation.
const MIN_NSS_OBS: usize = 6;

/// τ multi-start grid range (years), intersected with the configured bounds.
/// Conventional single-start values (τ1 ≈ 1, τ2 ≈ 3) fall inside this range.
const TAU_START_LO: f64 = 0.05;
const TAU_START_HI: f64 = 10.0;

/// Fit a curve to `(duration, value)` observations.
///
/// Durations are in years, values in basis points. The caller is expected to
/// have filtered and cleaned the data; NaN/Inf values or negative durations
/// are rejected, not repaired.
///
/// Returns a usable [`CurveFitResult`] or an error naming the failed
/// precondition; never a silently NaN-filled curve.
pub fn fit(
    durations: &[f64],
    values: &[f64],
    config: &FitConfig,
) -> Result<CurveFitResult, FitError> {
    validate_config(config)?;
    validate_observations(durations, values)?;

    let n = durations.len();

    // Attempt the parametric fit only when it is determinate.
    let nss_failure: String;
    if n >= MIN_NSS_OBS {
        match attempt_nss(durations, values, config) {
            Ok((params, quality)) => {
                return Ok(CurveFitResult {
                    method: FitMethod::Nss,
                    curve: FittedCurve::Nss(params),
                    quality,
                    diagnostic: None,
                });
            }
            Err(reason) => nss_failure = reason,
        }
    } else {
        nss_failure = format!("{n} observations cannot determine 6 NSS parameters");
    }

    warn!(
        reason = %nss_failure,
        "NSS fit discarded; falling back to monotone interpolation"
    );

    let pchip = MonotonePchip::new(durations, values).map_err(|e| FitError::CurveFit {
        method: FitMethod::Interpolation,
        reason: format!("{e}; NSS attempt: {nss_failure}"),
    })?;

    let predicted = pchip.evaluate_many(durations);
    let quality = FitQuality::compute(values, &predicted);

    Ok(CurveFitResult {
        method: FitMethod::Interpolation,
        curve: FittedCurve::Interpolated(pchip),
        quality,
        diagnostic: Some(nss_failure),
    })
}

fn validate_config(config: &FitConfig) -> Result<(), FitError> {
    if !(config.tau_min.is_finite() && config.tau_min > 0.0) {
        return Err(FitError::invalid(format!(
            "tau_min must be finite and > 0, got {}",
            config.tau_min
        )));
    }
    if !(config.tau_max.is_finite() && config.tau_max > config.tau_min) {
        return Err(FitError::invalid(format!(
            "tau_max must be finite and > tau_min, got {}",
            config.tau_max
        )));
    }
    if !(config.beta_bound.is_finite() && config.beta_bound > 0.0) {
        return Err(FitError::invalid(format!(
            "beta_bound must be finite and > 0, got {}",
            config.beta_bound
        )));
    }
    if !config.quality_floor.is_finite() {
        return Err(FitError::invalid(format!(
            "quality_floor must be finite, got {}",
            config.quality_floor
        )));
    }
    if config.max_iterations == 0 {
        return Err(FitError::invalid("max_iterations must be >= 1"));
    }
    if config.tau_starts < 2 {
        return Err(FitError::invalid("tau_starts must be >= 2"));
    }
    Ok(())
}

fn validate_observations(durations: &[f64], values: &[f64]) -> Result<(), FitError> {
    if durations.len() != values.len() {
        return Err(FitError::invalid(format!(
            "durations ({}) and values ({}) differ in length",
            durations.len(),
            values.len()
        )));
    }
    let n = durations.len();
    if n < 2 {
        return Err(FitError::InsufficientData { n });
    }
    if let Some(t) = durations.iter().find(|t| !t.is_finite()) {
        return Err(FitError::invalid(format!("non-finite duration {t}")));
    }
    if let Some(t) = durations.iter().find(|&&t| t < 0.0) {
        return Err(FitError::invalid(format!("negative duration {t}")));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(FitError::invalid("non-finite spread value"));
    }
    Ok(())
}

/// One NSS attempt: multi-start bounded LM plus the quality-floor gate.
///
/// The `Err` branch is the internal optimization-failure signal; the caller
/// recovers from it, so the payload is a diagnostic string, not a `FitError`.
fn attempt_nss(
    durations: &[f64],
    values: &[f64],
    config: &FitConfig,
) -> Result<(NssParams, FitQuality), String> {
    let starts = build_starts(durations, values, config);
    debug!(starts = starts.len(), "launching NSS multi-start");

    let b = config.beta_bound;
    let lower = [-b, -b, -b, -b, config.tau_min, config.tau_min];
    let upper = [b, b, b, b, config.tau_max, config.tau_max];
    let opts = LmOptions {
        max_iterations: config.max_iterations,
        ..LmOptions::default()
    };

    let residuals = |p: &[f64]| -> Vec<f64> {
        let params = NssParams {
            beta0: p[0],
            beta1: p[1],
            beta2: p[2],
            beta3: p[3],
            tau1: p[4],
            tau2: p[5],
        };
        durations
            .iter()
            .zip(values)
            .map(|(&t, &y)| params.evaluate(t) - y)
            .collect()
    };

    // Evaluate every start independently; selection below is deterministic.
    let candidates: Vec<(usize, crate::math::LmFit)> = starts
        .par_iter()
        .enumerate()
        .filter_map(|(idx, start)| {
            minimize(&residuals, start, &lower, &upper, &opts)
                .filter(|fit| fit.converged && fit.sse.is_finite())
                .map(|fit| (idx, fit))
        })
        .collect();

    let Some(best) = candidates.iter().min_by(|(ia, a), (ib, b)| {
        a.sse
            .partial_cmp(&b.sse)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ia.cmp(ib))
    }) else {
        return Err(format!(
            "no start converged within {} iterations",
            config.max_iterations
        ));
    };

    let p = &best.1.params;
    let params = NssParams {
        beta0: p[0],
        beta1: p[1],
        beta2: p[2],
        beta3: p[3],
        tau1: p[4],
        tau2: p[5],
    };

    let predicted = params.evaluate_many(durations);
    let quality = FitQuality::compute(values, &predicted);

    if quality.r_squared < config.quality_floor {
        return Err(format!(
            "converged fit below quality floor: R² = {:.4} < {:.4}",
            quality.r_squared, config.quality_floor
        ));
    }

    debug!(
        r_squared = quality.r_squared,
        rmse = quality.rmse,
        iterations = best.1.iterations,
        "NSS fit accepted"
    );
    Ok((params, quality))
}

/// Deterministic start points: data-derived βs crossed with a log-spaced τ
/// grid constrained to τ2 > τ1.
fn build_starts(durations: &[f64], values: &[f64], config: &FitConfig) -> Vec<[f64; 6]> {
    let b = config.beta_bound;

    // Level: mean spread. Slope: long-end minus short-end observation.
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let (mut i_min, mut i_max) = (0, 0);
    for (i, &t) in durations.iter().enumerate() {
        if t < durations[i_min] {
            i_min = i;
        }
        if t > durations[i_max] {
            i_max = i;
        }
    }
    let beta0 = mean.clamp(-b, b);
    let beta1 = (values[i_max] - values[i_min]).clamp(-b, b);

    // Intersect the conventional start range with the configured bounds;
    // fall back to the full bound range when they do not overlap.
    let mut lo = TAU_START_LO.max(config.tau_min);
    let mut hi = TAU_START_HI.min(config.tau_max);
    if !(hi > lo) {
        lo = config.tau_min;
        hi = config.tau_max;
    }
    let taus = log_space(lo, hi, config.tau_starts);

    let mut starts = Vec::new();
    for i in 0..taus.len() {
        for j in (i + 1)..taus.len() {
            starts.push([beta0, beta1, 0.0, 0.0, taus[i], taus[j]]);
        }
    }
    starts
}

/// `steps` log-spaced points between `min` and `max` (inclusive). Config
/// validation guarantees `0 < min < max` and `steps >= 2` up the stack.
fn log_space(min: f64, max: f64, steps: usize) -> Vec<f64> {
    let ln_min = min.ln();
    let step = (max.ln() - ln_min) / (steps as f64 - 1.0);
    (0..steps).map(|i| (ln_min + step * i as f64).exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hump_data() -> (Vec<f64>, Vec<f64>) {
        (
            vec![0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0],
            vec![80.0, 75.0, 70.0, 72.0, 85.0, 95.0, 110.0],
        )
    }

    #[test]
    fn hump_shaped_curve_fits_with_nss() {
        let (t, y) = hump_data();
        let result = fit(&t, &y, &FitConfig::default()).unwrap();
        assert_eq!(result.method, FitMethod::Nss);
        assert!(result.diagnostic.is_none());
        assert!(
            result.quality.r_squared >= 0.8,
            "R² = {}",
            result.quality.r_squared
        );
    }

    #[test]
    fn fitted_params_stay_within_bounds() {
        let (t, y) = hump_data();
        let config = FitConfig::default();
        let result = fit(&t, &y, &config).unwrap();
        let p = result.nss_params().unwrap();
        assert!(p.tau1 >= config.tau_min && p.tau1 <= config.tau_max);
        assert!(p.tau2 >= config.tau_min && p.tau2 <= config.tau_max);
        assert!(p.beta0.abs() <= config.beta_bound);
    }

    #[test]
    fn too_few_observations() {
        let err = fit(&[1.0], &[50.0], &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { n: 1 }));

        let err = fit(&[], &[], &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { n: 0 }));
    }

    #[test]
    fn rejects_dirty_input() {
        let cfg = FitConfig::default();
        assert!(matches!(
            fit(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0], &cfg),
            Err(FitError::InvalidInput(_))
        ));
        assert!(matches!(
            fit(&[1.0, 2.0], &[f64::INFINITY, 2.0], &cfg),
            Err(FitError::InvalidInput(_))
        ));
        assert!(matches!(
            fit(&[-0.5, 2.0], &[1.0, 2.0], &cfg),
            Err(FitError::InvalidInput(_))
        ));
        assert!(matches!(
            fit(&[1.0, 2.0, 3.0], &[1.0, 2.0], &cfg),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn small_dataset_goes_straight_to_interpolation() {
        // 3 points: determinate for interpolation, not for 6-parameter NSS.
        let result = fit(&[1.0, 3.0, 7.0], &[60.0, 75.0, 95.0], &FitConfig::default()).unwrap();
        assert_eq!(result.method, FitMethod::Interpolation);
        assert!(result.diagnostic.is_some());
        // Interpolation passes through its knots, so the metrics are exact.
        assert!(result.quality.rmse < 1e-9);
    }

    #[test]
    fn degenerate_domain_is_a_curve_fit_error() {
        // All observations share one duration: dedup collapses to a single
        // knot and interpolation needs two.
        let t = vec![1.0; 5];
        let y = vec![40.0, 45.0, 50.0, 55.0, 60.0];
        let err = fit(&t, &y, &FitConfig::default()).unwrap_err();
        match err {
            FitError::CurveFit { method, reason } => {
                assert_eq!(method, FitMethod::Interpolation);
                assert!(reason.contains("distinct"), "reason: {reason}");
            }
            other => panic!("expected CurveFit, got {other:?}"),
        }
    }

    #[test]
    fn fit_is_idempotent() {
        let (t, y) = hump_data();
        let config = FitConfig::default();
        let a = fit(&t, &y, &config).unwrap();
        let b = fit(&t, &y, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn impossible_quality_floor_forces_fallback() {
        // A floor above 1.0 can never be met, so even a good NSS fit is
        // discarded and the result reveals the fallback.
        let (t, y) = hump_data();
        let config = FitConfig {
            quality_floor: 1.1,
            ..FitConfig::default()
        };
        let result = fit(&t, &y, &config).unwrap();
        assert_eq!(result.method, FitMethod::Interpolation);
        let diag = result.diagnostic.unwrap();
        assert!(diag.contains("quality floor"), "diagnostic: {diag}");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (t, y) = hump_data();
        let bad = FitConfig {
            tau_min: 0.0,
            ..FitConfig::default()
        };
        assert!(matches!(fit(&t, &y, &bad), Err(FitError::InvalidInput(_))));

        let bad = FitConfig {
            max_iterations: 0,
            ..FitConfig::default()
        };
        assert!(matches!(fit(&t, &y, &bad), Err(FitError::InvalidInput(_))));
    }

    #[test]
    fn start_grid_is_ordered_and_bounded() {
        let (t, y) = hump_data();
        let config = FitConfig::default();
        let starts = build_starts(&t, &y, &config);
        assert!(!starts.is_empty());
        for s in &starts {
            assert!(s[4] < s[5], "τ starts must be ordered");
            assert!(s[4] >= config.tau_min && s[5] <= config.tau_max);
        }
    }
}
