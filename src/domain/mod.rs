//! Domain types: fit configuration, the two-branch fit outcome, and the
//! result consumed by downstream plotting/reporting collaborators.

pub mod types;

pub use types::*;
