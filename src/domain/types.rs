//! Shared domain types.
//!
//! These are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON by the surrounding application
//! - reloaded later for plotting or comparisons
//!
//! The crate itself does no file I/O.

use serde::{Deserialize, Serialize};

use crate::fit::FitQuality;
use crate::interp::MonotonePchip;
use crate::models::NssParams;

/// Which fitting path produced the final curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    /// Parametric Nelson-Siegel-Svensson fit.
    Nss,
    /// Monotone cubic interpolation fallback.
    Interpolation,
}

impl FitMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            FitMethod::Nss => "nss",
            FitMethod::Interpolation => "interpolation",
        }
    }
}

impl std::fmt::Display for FitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Fit configuration.
///
/// Plain data passed into every `fit` call; there is no process-wide mutable
/// state, so concurrent callers with their own configs are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Minimum acceptable R² for the NSS fit. A converged fit below this
    /// floor is discarded in favor of the interpolation fallback: NSS can
    /// converge to a technically valid but useless near-flat curve on sparse
    /// or highly non-monotonic data, and the raw convergence flag misses
    /// that case.
    pub quality_floor: f64,

    /// Hard cap on optimizer iterations per start.
    pub max_iterations: usize,

    /// Lower bound for both decay constants (years). Must stay strictly
    /// positive; τ → 0 degenerates the basis functions.
    pub tau_min: f64,

    /// Upper bound for both decay constants (years). A finite cap keeps the
    /// solver away from the flat plateau where τ no longer moves the curve.
    pub tau_max: f64,

    /// Symmetric bound on each β (bp), loose enough to be inert for real
    /// spread data while preventing runaway divergence.
    pub beta_bound: f64,

    /// Number of log-spaced τ values per axis in the multi-start grid.
    pub tau_starts: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            quality_floor: 0.5,
            max_iterations: 100,
            tau_min: 0.01,
            tau_max: 30.0,
            beta_bound: 10_000.0,
            tau_starts: 4,
        }
    }
}

/// The curve that came out of a fit: one of two branches, resolved once
/// inside the fitter rather than via error-driven control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FittedCurve {
    /// Parametric NSS curve.
    Nss(NssParams),
    /// Monotone cubic interpolation table.
    Interpolated(MonotonePchip),
}

impl FittedCurve {
    /// Evaluate the curve at tenor `t` (years).
    pub fn evaluate(&self, t: f64) -> f64 {
        match self {
            FittedCurve::Nss(params) => params.evaluate(t),
            FittedCurve::Interpolated(pchip) => pchip.evaluate(t),
        }
    }

    pub fn method(&self) -> FitMethod {
        match self {
            FittedCurve::Nss(_) => FitMethod::Nss,
            FittedCurve::Interpolated(_) => FitMethod::Interpolation,
        }
    }
}

/// A precomputed evaluation grid for quick plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub tenor_years: Vec<f64>,
    pub y: Vec<f64>,
}

/// Output of a single fit invocation. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFitResult {
    /// Which path produced `curve`. `Interpolation` on an n >= 6 dataset
    /// means the NSS attempt was discarded (see `diagnostic`).
    pub method: FitMethod,
    pub curve: FittedCurve,
    /// Metrics computed on the original (non-deduplicated) observation set.
    pub quality: FitQuality,
    /// Human-readable note attached when a recovered NSS failure forced the
    /// fallback. `None` for a clean fit.
    pub diagnostic: Option<String>,
}

impl CurveFitResult {
    /// Evaluate the fitted curve at tenor `t` (years).
    pub fn evaluate(&self, t: f64) -> f64 {
        self.curve.evaluate(t)
    }

    /// Evaluate the fitted curve at each tenor.
    pub fn evaluate_many(&self, tenors: &[f64]) -> Vec<f64> {
        tenors.iter().map(|&t| self.evaluate(t)).collect()
    }

    /// Fitted NSS parameters, when the parametric path won.
    pub fn nss_params(&self) -> Option<&NssParams> {
        match &self.curve {
            FittedCurve::Nss(params) => Some(params),
            FittedCurve::Interpolated(_) => None,
        }
    }

    /// Evenly spaced evaluation grid over `[tenor_min, tenor_max]` for
    /// drawing the fitted line.
    ///
    /// Degenerate ranges (non-finite, inverted, or near-zero width) are
    /// widened to something plottable instead of failing.
    pub fn sample(&self, tenor_min: f64, tenor_max: f64, n: usize) -> CurveGrid {
        let n = n.max(2);
        let mut t0 = tenor_min;
        let mut t1 = tenor_max;
        if !(t0.is_finite() && t1.is_finite()) || t1 <= t0 {
            t0 = 0.25;
            t1 = 30.0;
        }
        if (t1 - t0).abs() < 1e-9 {
            t0 = (t0 - 0.5).max(0.0);
            t1 += 0.5;
        }

        let mut tenor_years = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let u = i as f64 / (n as f64 - 1.0);
            let t = t0 + u * (t1 - t0);
            tenor_years.push(t);
            y.push(self.evaluate(t));
        }

        CurveGrid { tenor_years, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_tag_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FitMethod::Nss).unwrap(), "\"nss\"");
        assert_eq!(
            serde_json::to_string(&FitMethod::Interpolation).unwrap(),
            "\"interpolation\""
        );
    }

    #[test]
    fn default_config_matches_documented_constants() {
        let cfg = FitConfig::default();
        assert_eq!(cfg.quality_floor, 0.5);
        assert_eq!(cfg.max_iterations, 100);
        assert_eq!(cfg.tau_min, 0.01);
        assert_eq!(cfg.tau_max, 30.0);
    }

    #[test]
    fn sample_widens_degenerate_range() {
        let curve = FittedCurve::Interpolated(
            crate::interp::MonotonePchip::new(&[1.0, 2.0], &[10.0, 20.0]).unwrap(),
        );
        let result = CurveFitResult {
            method: FitMethod::Interpolation,
            curve,
            quality: FitQuality {
                r_squared: 1.0,
                rmse: 0.0,
                mae: 0.0,
                n: 2,
            },
            diagnostic: None,
        };

        let grid = result.sample(f64::NAN, 5.0, 11);
        assert_eq!(grid.tenor_years.len(), 11);
        assert!(grid.tenor_years[0] < grid.tenor_years[10]);
        assert!(grid.y.iter().all(|v| v.is_finite()));
        assert_eq!(result.curve.method(), result.method);
    }
}
