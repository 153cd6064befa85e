//! Stable basis factors for the Nelson-Siegel-Svensson family.
//!
//! The model uses two factor shapes per decay constant `τ`:
//!
//! - `f1(t, τ) = (1 - exp(-t/τ)) / (t/τ)` (slope loading)
//! - `f2(t, τ) = f1(t, τ) - exp(-t/τ)` (curvature loading)
//!
//! Numerical notes:
//! - `(1 - exp(-x)) / x` is a 0/0 removable singularity at `x = 0`. A naive
//!   evaluation returns NaN for `t = 0`, which is a realistic input (an
//!   overnight instrument), so small `x` goes through a series expansion and
//!   the rest through `expm1` to avoid cancellation.
//! - Analytic limits as `t → 0`: `f1 → 1`, `f2 → 0`.

/// Below this `x = t/τ` we evaluate the series expansion instead of the
/// closed form.
const SMALL_X: f64 = 1e-6;

/// Slope loading `(1 - exp(-x)) / x` evaluated at `x = t/τ`.
pub fn f1(t: f64, tau: f64) -> f64 {
    loading_x(t / tau).0
}

/// Curvature loading `f1 - exp(-x)` evaluated at `x = t/τ`.
pub fn f2(t: f64, tau: f64) -> f64 {
    let (g1, exp_neg_x) = loading_x(t / tau);
    g1 - exp_neg_x
}

/// Compute `((1 - exp(-x)) / x, exp(-x))` stably for `x >= 0`.
fn loading_x(x: f64) -> (f64, f64) {
    if x.abs() < SMALL_X {
        // Series:
        //   (1 - e^{-x}) / x ≈ 1 - x/2 + x²/6
        //   e^{-x}          ≈ 1 - x + x²/2
        let g1 = 1.0 - x / 2.0 + (x * x) / 6.0;
        let exp_neg_x = 1.0 - x + (x * x) / 2.0;
        return (g1, exp_neg_x);
    }
    let exp_neg_x = (-x).exp();
    // 1 - exp(-x) as -expm1(-x) to dodge cancellation for moderate x.
    let g1 = -(-x).exp_m1() / x;
    (g1, exp_neg_x)
}
