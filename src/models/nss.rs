//! The six-parameter Nelson-Siegel-Svensson curve.
//!
//! ```text
//! y(t) = β0
//!      + β1 · f1(t, τ1)
//!      + β2 · f2(t, τ1)
//!      + β3 · f2(t, τ2)
//! ```
//!
//! where `f1`/`f2` are the stable basis loadings from [`crate::math::basis`].
//! `y(0) = β0 + β1` (all curvature loadings vanish at the short end) and
//! `y(t) → β0` as `t → ∞`.

use serde::{Deserialize, Serialize};

use crate::math::{f1, f2};

/// Fitted NSS parameter vector.
///
/// Serialized field names follow the common long-form convention so exports
/// are self-describing without a legend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NssParams {
    /// Level: the long-horizon asymptote (bp).
    #[serde(rename = "beta0_level")]
    pub beta0: f64,
    /// Slope: short-horizon tilt (bp).
    #[serde(rename = "beta1_slope")]
    pub beta1: f64,
    /// First curvature term (bp).
    #[serde(rename = "beta2_curvature")]
    pub beta2: f64,
    /// Second curvature term (bp).
    #[serde(rename = "beta3_second_curvature")]
    pub beta3: f64,
    /// First decay constant (years, strictly positive).
    pub tau1: f64,
    /// Second decay constant (years, strictly positive).
    pub tau2: f64,
}

impl NssParams {
    /// Build from a raw 6-vector ordered `[β0, β1, β2, β3, τ1, τ2]` (the
    /// layout the optimizer works in).
    pub fn from_slice(v: &[f64; 6]) -> Self {
        Self {
            beta0: v[0],
            beta1: v[1],
            beta2: v[2],
            beta3: v[3],
            tau1: v[4],
            tau2: v[5],
        }
    }

    /// The optimizer-ordered raw vector.
    pub fn to_array(self) -> [f64; 6] {
        [
            self.beta0, self.beta1, self.beta2, self.beta3, self.tau1, self.tau2,
        ]
    }

    /// Evaluate the curve at tenor `t` (years).
    ///
    /// Safe at `t = 0`: the basis loadings take their analytic limits rather
    /// than evaluating `0/0`.
    pub fn evaluate(&self, t: f64) -> f64 {
        let g1 = f1(t, self.tau1);
        let g2 = f2(t, self.tau1);
        let g3 = f2(t, self.tau2);
        self.beta0 + self.beta1 * g1 + self.beta2 * g2 + self.beta3 * g3
    }

    /// Evaluate the curve at each tenor.
    pub fn evaluate_many(&self, tenors: &[f64]) -> Vec<f64> {
        tenors.iter().map(|&t| self.evaluate(t)).collect()
    }
}
