//! `oas-curves` - fit a smooth spread curve to scattered (duration, OAS)
//! bond observations.
//!
//! The engine fits the six-parameter Nelson-Siegel-Svensson model with a
//! bounded nonlinear least-squares solver, judges the fit against a
//! configurable R² floor, and falls back to monotone cubic interpolation
//! when the parametric fit fails or is not worth keeping. Data loading,
//! filtering, and plotting live in the surrounding application; this crate
//! takes two equal-length numeric sequences and hands back parameters, an
//! evaluable curve, and goodness-of-fit statistics.
//!
//! ```
//! use oas_curves::{fit, FitConfig, FitMethod};
//!
//! let durations = [0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0];
//! let oas = [80.0, 75.0, 70.0, 72.0, 85.0, 95.0, 110.0];
//!
//! let result = fit(&durations, &oas, &FitConfig::default()).unwrap();
//! assert_eq!(result.method, FitMethod::Nss);
//! assert!(result.quality.r_squared >= 0.8);
//! let _mid_curve_spread = result.evaluate(4.0);
//! ```
//!
//! Every `fit` call is a pure function of its inputs and config: no shared
//! mutable state, safe to call from independent threads.

pub mod domain;
pub mod error;
pub mod fit;
pub mod interp;
pub mod math;
pub mod models;

pub use domain::{CurveFitResult, CurveGrid, FitConfig, FitMethod, FittedCurve};
pub use error::FitError;
pub use fit::{fit, FitQuality};
pub use interp::MonotonePchip;
pub use models::NssParams;
