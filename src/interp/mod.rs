//! Non-parametric fallback curve: monotone cubic interpolation.

pub mod pchip;

pub use pchip::*;
