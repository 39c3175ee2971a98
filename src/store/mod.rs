//! Seam to the shared document store ("change notifier").
//!
//! The store is an external collaborator offering create, conditional
//! update, and live subscription to filtered, ordered query results. The
//! coordination layer never assumes an exclusive lock: every contended
//! mutation goes through a compare-and-swap method here, and a rejected
//! write is a definitive signal that another actor committed first.
//!
//! Ordering guarantees are per-document only: a subscriber sees one
//! document's writes in commit order, but may observe a session before the
//! invite that spawned it. Subscriptions deliver whole snapshots, never
//! deltas, so a handler can always resynchronize from the latest payload
//! alone.

pub mod memory;

use std::error::Error;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{InviteEntity, InviteId, InviteStatus, SessionEntity, SessionId, UserId};
use crate::state::SessionPhase;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Live snapshot stream of the open challenge board.
pub type BoardStream = BoxStream<'static, Vec<InviteEntity>>;

/// Live snapshot stream of a single session document.
pub type SessionStream = BoxStream<'static, SessionEntity>;

/// Error raised by store backends regardless of the underlying transport.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was unreachable or a write could not be evaluated.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failed operation.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StoreError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Outcome of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The precondition held at commit time; the write is durable.
    Committed,
    /// Another writer changed the document first. Nothing was written.
    Rejected,
}

/// Abstraction over the shared document store.
///
/// For every `N` concurrent conditional writes against the same document,
/// implementations must commit exactly one and reject the rest; which one
/// wins is determined by the store's write ordering.
pub trait ChangeNotifier: Send + Sync {
    /// Create a fresh invite document.
    fn create_invite(&self, invite: InviteEntity) -> BoxFuture<'static, StoreResult<()>>;

    /// Fetch the current invite snapshot.
    fn fetch_invite(
        &self,
        id: InviteId,
    ) -> BoxFuture<'static, StoreResult<Option<InviteEntity>>>;

    /// Move an invite to `to` only if its stored status is still one of
    /// `expected`. Rejection means the invite left the expected set first.
    fn transition_invite(
        &self,
        id: InviteId,
        expected: &'static [InviteStatus],
        to: InviteStatus,
        updated_at: OffsetDateTime,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>>;

    /// The race-critical claim: commit the claimed invite and create its
    /// session in one logical operation, only if the stored invite status
    /// is still [`InviteStatus::Waiting`].
    fn claim_invite(
        &self,
        claimed: InviteEntity,
        session: SessionEntity,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>>;

    /// Fetch the current session snapshot.
    fn fetch_session(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StoreResult<Option<SessionEntity>>>;

    /// Replace a session document only if the stored revision is exactly
    /// `next.revision - 1`. This is the all-or-nothing commit for move
    /// application, including a possible terminal transition in the same
    /// write.
    fn put_session_if_revision(
        &self,
        next: SessionEntity,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>>;

    /// Move a session to `to` only if its stored phase is still one of
    /// `expected`. Used for activate/abandon, which must race safely
    /// against in-flight moves without being invalidated by them.
    fn transition_session(
        &self,
        id: SessionId,
        expected: &'static [SessionPhase],
        to: SessionPhase,
        updated_at: OffsetDateTime,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>>;

    /// Subscribe to the open challenge board: all `waiting` invites with
    /// open visibility, ordered by creation time ascending (ties broken by
    /// id). Each delivery is a fresh snapshot; re-subscribing after a
    /// disconnect yields the current snapshot, not a diff.
    fn watch_open_invites(&self) -> BoxFuture<'static, StoreResult<BoardStream>>;

    /// Subscribe to the waiting direct invites addressed to one guest,
    /// ordered by creation time ascending. Same snapshot semantics as
    /// [`ChangeNotifier::watch_open_invites`].
    fn watch_direct_invites(
        &self,
        guest_id: UserId,
    ) -> BoxFuture<'static, StoreResult<BoardStream>>;

    /// Subscribe to one session document. The current snapshot is delivered
    /// first; subsequent deliveries follow that document's commit order.
    /// `None` if the session does not exist.
    fn watch_session(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StoreResult<Option<SessionStream>>>;
}
