//! Goodness-of-fit statistics.
//!
//! Used by both fitting paths: the quality floor decision reads R² off the
//! NSS attempt, and the final result carries the metrics of whichever curve
//! was kept.

use serde::{Deserialize, Serialize};

/// Residual sums below this are treated as an exact fit when the observed
/// series has zero variance.
const SS_RES_EPS: f64 = 1e-12;

/// Standard regression fit diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Coefficient of determination, `1 - SS_res / SS_tot`.
    pub r_squared: f64,
    /// Root-mean-square error (same units as the observations, bp).
    pub rmse: f64,
    /// Mean absolute error (bp).
    pub mae: f64,
    /// Number of observations the metrics were computed on.
    pub n: usize,
}

impl FitQuality {
    /// Compute R², RMSE, and MAE for `predicted` against `observed`.
    ///
    /// `SS_tot = 0` (all observations identical) leaves R² undefined; we
    /// define it as 1.0 when the residuals are also ~0 and 0.0 otherwise,
    /// rather than dividing by zero.
    ///
    /// # Panics
    /// Panics if the slices are empty or differ in length. Callers validate
    /// input shape before fitting.
    pub fn compute(observed: &[f64], predicted: &[f64]) -> Self {
        assert_eq!(
            observed.len(),
            predicted.len(),
            "observed/predicted length mismatch"
        );
        assert!(!observed.is_empty(), "no observations");

        let n = observed.len();
        let n_f = n as f64;
        let mean = observed.iter().sum::<f64>() / n_f;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        let mut abs_sum = 0.0;
        for (&y, &y_hat) in observed.iter().zip(predicted) {
            let r = y - y_hat;
            ss_res += r * r;
            abs_sum += r.abs();
            let d = y - mean;
            ss_tot += d * d;
        }

        let r_squared = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res < SS_RES_EPS {
            1.0
        } else {
            0.0
        };

        Self {
            r_squared,
            rmse: (ss_res / n_f).sqrt(),
            mae: abs_sum / n_f,
            n,
        }
    }
}
