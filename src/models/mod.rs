//! Nelson-Siegel-Svensson model evaluation.
//!
//! The model is a small pure function of its parameters so the fitter and
//! the fallback logic can stay generic over "a curve we can evaluate".

pub mod nss;

pub use nss::*;
