//! Typed failure values returned by every coordination operation.

use thiserror::Error;

use crate::store::StoreError;

/// Result alias for coordination operations.
pub type CoordResult<T> = Result<T, CoordError>;

/// Errors surfaced to the UI layer by every coordination operation.
///
/// These are typed values, never raw store exceptions, so callers can
/// distinguish "retry silently" ([`CoordError::TransientStore`]) from "show
/// a message" ([`CoordError::AlreadyClaimed`], [`CoordError::InvalidMove`])
/// from "should not happen, log it" ([`CoordError::Forbidden`] outside of a
/// UI bug).
#[derive(Debug, Error)]
pub enum CoordError {
    /// No authenticated caller, or the caller does not match the claimed
    /// identity.
    #[error("an authenticated caller is required")]
    AuthRequired,
    /// Malformed input: unknown game id, self-targeting invite, wrong phase.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Caller lacks rights over this document in its current state.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Lost a conditional-write race: the claim (or the contended write)
    /// was committed by another actor first.
    #[error("already claimed by another player")]
    AlreadyClaimed,
    /// Referenced invite or session does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The game module rejected the move; no state was changed.
    #[error("the game rejected this move")]
    InvalidMove,
    /// The underlying store was unreachable or the conditional write could
    /// not be evaluated. Safe to retry.
    #[error("store unavailable")]
    TransientStore(#[source] StoreError),
}

impl From<StoreError> for CoordError {
    fn from(err: StoreError) -> Self {
        CoordError::TransientStore(err)
    }
}

impl CoordError {
    /// Whether the caller may retry the operation unchanged and expect it
    /// to eventually succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoordError::TransientStore(_))
    }
}
