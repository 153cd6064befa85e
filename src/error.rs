//! Error taxonomy for the fitting engine.
//!
//! Only genuinely fatal conditions surface as errors:
//!
//! - the caller handed us data we can neither fit nor interpolate
//! - the caller handed us non-finite / malformed inputs
//!
//! An NSS optimization failure is *not* an error: the fitter recovers by
//! falling back to interpolation, and the returned result's `method` tag plus
//! diagnostic message reveal that the fallback fired.

use thiserror::Error;

use crate::domain::FitMethod;

#[derive(Debug, Clone, Error)]
pub enum FitError {
    /// Fewer than 2 observations: nothing can be fit or interpolated.
    #[error("insufficient data: {n} observation(s), need at least 2")]
    InsufficientData { n: usize },

    /// NaN/Inf values, negative durations, or mismatched input lengths.
    ///
    /// Input cleaning (OAS/duration range filters, NaN removal) is the
    /// caller's job; the engine refuses dirty data rather than guessing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Both the NSS fit and the interpolation fallback were unusable.
    #[error("curve fit failed (last attempted method: {method}): {reason}")]
    CurveFit { method: FitMethod, reason: String },
}

impl FitError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        FitError::InvalidInput(message.into())
    }
}
