//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - validate the observation set
//! - run the bounded NSS least-squares fit from deterministic multi-starts
//! - judge fit quality and fall back to monotone interpolation when the
//!   parametric fit fails or is not worth keeping

pub mod fitter;
pub mod quality;

pub use fitter::*;
pub use quality::*;
