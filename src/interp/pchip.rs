//! Shape-preserving cubic interpolation (PCHIP-style).
//!
//! Piecewise cubic Hermite interpolant with Fritsch-Carlson tangent
//! corrections: on every sub-interval where the data is monotone the curve is
//! monotone too, so it never overshoots between knots the way an
//! unconstrained cubic spline can.
//!
//! Construction normalizes the input into a strictly increasing domain:
//! observations sharing a duration are collapsed by averaging their values,
//! then the knots are sorted ascending.
//!
//! Outside `[x_min, x_max]` the evaluator clamps to the boundary value.
//! Flat extrapolation is deliberate: extending the boundary cubics diverges
//! rapidly away from the data, and a spread quoted past the longest observed
//! duration is better represented as "the last level we saw".

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Two knots closer than this (relative to the larger magnitude) are treated
/// as the same duration and averaged.
const KNOT_EPS: f64 = 1e-12;

/// Monotone piecewise cubic Hermite interpolant over sorted unique knots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonotonePchip {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Corrected tangent at each knot.
    tangents: Vec<f64>,
}

impl MonotonePchip {
    /// Build the interpolant from raw (duration, value) observations.
    ///
    /// Fails when fewer than 2 distinct durations survive deduplication, or
    /// when the inputs are malformed (length mismatch, non-finite values).
    pub fn new(durations: &[f64], values: &[f64]) -> Result<Self, FitError> {
        if durations.len() != values.len() {
            return Err(FitError::invalid(format!(
                "durations ({}) and values ({}) differ in length",
                durations.len(),
                values.len()
            )));
        }
        if durations
            .iter()
            .chain(values.iter())
            .any(|v| !v.is_finite())
        {
            return Err(FitError::invalid("non-finite duration or value"));
        }

        let (xs, ys) = dedup_sorted(durations, values);
        let n = xs.len();
        if n < 2 {
            return Err(FitError::invalid(format!(
                "need at least 2 distinct durations, got {n}"
            )));
        }

        // Secant slopes per interval.
        let mut delta = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            delta.push((ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]));
        }

        // Initial tangents: one-sided at the ends, averaged interior.
        let mut tangents = vec![0.0; n];
        tangents[0] = delta[0];
        tangents[n - 1] = delta[n - 2];
        for i in 1..n - 1 {
            tangents[i] = 0.5 * (delta[i - 1] + delta[i]);
        }

        // Fritsch-Carlson correction: keep (α, β) inside the monotone region.
        for i in 0..n - 1 {
            if delta[i].abs() < 1e-30 {
                // Flat segment: zero both tangents so the cubic stays flat.
                tangents[i] = 0.0;
                tangents[i + 1] = 0.0;
            } else {
                let alpha = tangents[i] / delta[i];
                let beta = tangents[i + 1] / delta[i];
                if alpha < 0.0 {
                    tangents[i] = 0.0;
                }
                if beta < 0.0 {
                    tangents[i + 1] = 0.0;
                }
                let alpha = tangents[i] / delta[i];
                let beta = tangents[i + 1] / delta[i];
                let r2 = alpha * alpha + beta * beta;
                if r2 > 9.0 {
                    let scale = 3.0 / r2.sqrt();
                    tangents[i] = scale * alpha * delta[i];
                    tangents[i + 1] = scale * beta * delta[i];
                }
            }
        }

        Ok(Self { xs, ys, tangents })
    }

    pub fn x_min(&self) -> f64 {
        self.xs[0]
    }

    pub fn x_max(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    /// Number of distinct knots.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Evaluate at `t`, clamping to the boundary value outside the knots.
    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.xs.len();
        if t <= self.xs[0] {
            return self.ys[0];
        }
        if t >= self.xs[n - 1] {
            return self.ys[n - 1];
        }

        // Binary search for the containing interval.
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] <= t {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let h = self.xs[hi] - self.xs[lo];
        let u = (t - self.xs[lo]) / h;

        // Cubic Hermite basis.
        let h00 = (1.0 + 2.0 * u) * (1.0 - u) * (1.0 - u);
        let h10 = u * (1.0 - u) * (1.0 - u);
        let h01 = u * u * (3.0 - 2.0 * u);
        let h11 = u * u * (u - 1.0);

        h00 * self.ys[lo]
            + h10 * h * self.tangents[lo]
            + h01 * self.ys[hi]
            + h11 * h * self.tangents[hi]
    }

    /// Evaluate at each tenor.
    pub fn evaluate_many(&self, tenors: &[f64]) -> Vec<f64> {
        tenors.iter().map(|&t| self.evaluate(t)).collect()
    }
}

/// Sort by duration ascending and collapse duplicate durations by averaging
/// their values.
fn dedup_sorted(durations: &[f64], values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = durations.iter().copied().zip(values.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut xs: Vec<f64> = Vec::with_capacity(pairs.len());
    let mut ys: Vec<f64> = Vec::with_capacity(pairs.len());
    let mut counts: Vec<usize> = Vec::with_capacity(pairs.len());

    for (x, y) in pairs {
        match xs.last() {
            Some(&last) if (x - last).abs() <= KNOT_EPS * last.abs().max(1.0) => {
                let i = ys.len() - 1;
                counts[i] += 1;
                // Running mean of colliding values.
                ys[i] += (y - ys[i]) / counts[i] as f64;
            }
            _ => {
                xs.push(x);
                ys.push(y);
                counts.push(1);
            }
        }
    }

    (xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interpolates_knots_exactly() {
        let xs = [0.5, 1.0, 3.0, 7.0];
        let ys = [80.0, 75.0, 90.0, 110.0];
        let p = MonotonePchip::new(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert_relative_eq!(p.evaluate(*x), *y, max_relative = 1e-12);
        }
    }

    #[test]
    fn flat_extrapolation_outside_domain() {
        let p = MonotonePchip::new(&[1.0, 2.0, 5.0], &[50.0, 60.0, 90.0]).unwrap();
        assert_eq!(p.x_min(), 1.0);
        assert_eq!(p.x_max(), 5.0);
        assert_eq!(p.evaluate(0.0), 50.0);
        assert_eq!(p.evaluate(-3.0), 50.0);
        assert_eq!(p.evaluate(5.0), 90.0);
        assert_eq!(p.evaluate(100.0), 90.0);
    }

    #[test]
    fn preserves_monotone_data() {
        // Strictly increasing data must produce a non-decreasing curve on a
        // dense sample grid (no spline overshoot).
        let xs = [0.5, 1.0, 2.0, 3.0, 5.0, 10.0];
        let ys = [40.0, 42.0, 55.0, 57.0, 90.0, 95.0];
        let p = MonotonePchip::new(&xs, &ys).unwrap();

        let mut prev = p.evaluate(0.5);
        for i in 1..=400 {
            let t = 0.5 + 9.5 * i as f64 / 400.0;
            let v = p.evaluate(t);
            assert!(v >= prev - 1e-9, "non-monotone at t={t}: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn duplicate_durations_are_averaged() {
        let p = MonotonePchip::new(&[1.0, 1.0, 2.0], &[10.0, 30.0, 50.0]).unwrap();
        assert_eq!(p.len(), 2);
        assert_relative_eq!(p.evaluate(1.0), 20.0, max_relative = 1e-12);
    }

    #[test]
    fn rejects_single_distinct_duration() {
        let err = MonotonePchip::new(&[1.0, 1.0, 1.0], &[5.0, 6.0, 7.0]).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(MonotonePchip::new(&[1.0, 2.0], &[f64::NAN, 1.0]).is_err());
        assert!(MonotonePchip::new(&[1.0, f64::INFINITY], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn flat_data_stays_flat() {
        let p = MonotonePchip::new(&[1.0, 2.0, 3.0], &[70.0, 70.0, 70.0]).unwrap();
        for &t in &[1.0, 1.3, 2.5, 2.9] {
            assert_relative_eq!(p.evaluate(t), 70.0, max_relative = 1e-12);
        }
    }
}
