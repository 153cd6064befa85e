//! Box-constrained Levenberg-Marquardt least squares.
//!
//! Solves `minimize Σ r_i(p)²` subject to `lower <= p <= upper`.
//!
//! The NSS objective is nonlinear and non-convex in the decay constants, and
//! certain τ values produce nearly collinear basis columns, so the solver has
//! to cope with ill-conditioned Jacobians. LM handles that by blending
//! Gauss-Newton with gradient descent through an adaptive damping factor:
//!
//! ```text
//! (JᵀJ + λ diag(JᵀJ)) δ = -Jᵀr
//! ```
//!
//! Steps that fail to reduce the SSE are rejected and λ is increased, which
//! degenerates into short, safe gradient steps near singular configurations.
//!
//! Bounds are enforced by projection: every trial point is clamped into the
//! box before its residuals are evaluated, so the optimizer can slide along a
//! bound wall without ever evaluating the model outside its valid domain
//! (τ <= 0 would divide by zero).
//!
//! Iteration is hard-capped; the result carries a `converged` flag rather
//! than looping forever or panicking on a pathological dataset.

use nalgebra::{DMatrix, DVector};

/// Solver knobs. The defaults suit curve-fit problems with a handful of
/// parameters and tens of observations.
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Convergence threshold on the relative SSE improvement of an accepted step.
    pub sse_tolerance: f64,
    /// Convergence threshold on the relative parameter step norm.
    pub step_tolerance: f64,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Multiplier applied to λ on a rejected step.
    pub lambda_up: f64,
    /// Multiplier applied to λ on an accepted step.
    pub lambda_down: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            sse_tolerance: 1e-10,
            step_tolerance: 1e-10,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e12;

/// Outcome of one LM run.
#[derive(Debug, Clone)]
pub struct LmFit {
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimize the residual sum of squares from `start`, constrained to
/// `[lower, upper]` per component.
///
/// Returns `None` when the problem is unusable at the start point
/// (non-finite residuals, empty parameter or residual vector, or malformed
/// bounds). A run that merely fails to converge still returns `Some` with
/// `converged = false`; the caller decides what non-convergence means.
pub fn minimize<F>(
    residuals: F,
    start: &[f64],
    lower: &[f64],
    upper: &[f64],
    opts: &LmOptions,
) -> Option<LmFit>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let p = start.len();
    if p == 0 || lower.len() != p || upper.len() != p {
        return None;
    }
    if lower.iter().zip(upper).any(|(lo, hi)| !(lo <= hi)) {
        return None;
    }

    let mut params = project(start, lower, upper);
    let mut r = residuals(&params);
    let n = r.len();
    if n == 0 || r.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut sse = sum_sq(&r);
    let mut lambda = opts.initial_lambda;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..opts.max_iterations {
        iterations = iter + 1;

        let jac = jacobian(&residuals, &params, &r, lower, upper);
        let Some(jac) = jac else {
            // Non-finite Jacobian entries; treat as a failed run.
            break;
        };

        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * DVector::from_column_slice(&r);

        // Marquardt scaling: damp proportionally to the diagonal so that
        // parameters of very different magnitudes (betas in bp, taus in
        // years) are stepped sensibly.
        let mut damped = jtj.clone();
        for i in 0..p {
            let d = jtj[(i, i)].max(1e-12);
            damped[(i, i)] += lambda * d;
        }

        let Some(chol) = damped.cholesky() else {
            lambda = (lambda * opts.lambda_up).min(MAX_LAMBDA);
            continue;
        };
        let delta = chol.solve(&(-jtr));
        if delta.iter().any(|v| !v.is_finite()) {
            lambda = (lambda * opts.lambda_up).min(MAX_LAMBDA);
            continue;
        }

        let trial: Vec<f64> = params.iter().zip(delta.iter()).map(|(p, d)| p + d).collect();
        let trial = project(&trial, lower, upper);

        // Actual (projected) step, for the step-size convergence check.
        let step_norm: f64 = trial
            .iter()
            .zip(&params)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        let param_norm = params.iter().map(|v| v * v).sum::<f64>().sqrt().max(1.0);

        let trial_r = residuals(&trial);
        let trial_sse = sum_sq(&trial_r);

        if trial_sse.is_finite() && trial_sse < sse {
            let improvement = (sse - trial_sse) / sse.max(1e-300);
            params = trial;
            r = trial_r;
            sse = trial_sse;
            lambda = (lambda * opts.lambda_down).max(MIN_LAMBDA);

            if improvement < opts.sse_tolerance || step_norm / param_norm < opts.step_tolerance {
                converged = true;
                break;
            }
        } else {
            lambda = (lambda * opts.lambda_up).min(MAX_LAMBDA);
            if lambda >= MAX_LAMBDA && step_norm / param_norm < opts.step_tolerance {
                // Damping is maxed out and the proposed steps have shrunk to
                // nothing: we are at a (possibly constrained) stationary point.
                converged = true;
                break;
            }
        }
    }

    Some(LmFit {
        params,
        sse,
        iterations,
        converged,
    })
}

fn project(params: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    params
        .iter()
        .zip(lower.iter().zip(upper))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
        .collect()
}

fn sum_sq(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Forward-difference Jacobian, stepping inward when a bound is in the way.
fn jacobian<F>(
    residuals: &F,
    params: &[f64],
    r0: &[f64],
    lower: &[f64],
    upper: &[f64],
) -> Option<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = r0.len();
    let p = params.len();
    let mut jac = DMatrix::<f64>::zeros(n, p);

    for j in 0..p {
        let h = 1e-7 * params[j].abs().max(1e-3);
        let mut bumped = params.to_vec();
        // Step toward the interior if the forward bump would leave the box.
        let (h, sign) = if params[j] + h <= upper[j] {
            (h, 1.0)
        } else if params[j] - h >= lower[j] {
            (h, -1.0)
        } else {
            // Degenerate box in this component; treat the column as zero.
            continue;
        };
        bumped[j] = params[j] + sign * h;

        let rb = residuals(&bumped);
        if rb.len() != n {
            return None;
        }
        for i in 0..n {
            let d = sign * (rb[i] - r0[i]) / h;
            if !d.is_finite() {
                return None;
            }
            jac[(i, j)] = d;
        }
    }

    Some(jac)
}
