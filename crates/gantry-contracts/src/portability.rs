//! The tagged outcome of a portability check.

use crate::error::{GantryError, GantryResult};

/// The result of asking "can this value be reconstructed in a fresh process?".
///
/// `Failed` wraps the underlying error so diagnostic-mode callers can inspect
/// what went wrong — an encode failure, a decode failure in the child, a
/// spawn failure, or a timeout — while predicate-mode callers just discard it.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The payload was encoded here and decoded by an independent process.
    Verified,
    /// Some step of the check failed; the error says which and why.
    Failed(GantryError),
}

impl CheckOutcome {
    /// True only for `Verified`.
    pub fn is_verified(&self) -> bool {
        matches!(self, CheckOutcome::Verified)
    }

    /// Convert into a `Result`, surfacing the underlying error on failure.
    pub fn into_result(self) -> GantryResult<()> {
        match self {
            CheckOutcome::Verified => Ok(()),
            CheckOutcome::Failed(err) => Err(err),
        }
    }
}
