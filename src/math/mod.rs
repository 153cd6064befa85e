//! Numerical utilities: stable NSS basis factors and the bounded
//! Levenberg-Marquardt solver.

pub mod basis;
pub mod lm;

pub use basis::*;
pub use lm::*;
