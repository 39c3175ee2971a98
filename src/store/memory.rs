//! In-memory [`ChangeNotifier`] backend.
//!
//! Used by the test suite and local development, and the reference for the
//! guarantees real backends must provide: exactly-one-winner conditional
//! writes, per-document commit order, and snapshot-not-delta delivery.
//! Conditional writes go through `DashMap`'s entry API, whose shard lock
//! makes each read-check-write atomic; fan-out uses `tokio::sync::watch`
//! channels, so a lagging subscriber always observes the latest snapshot
//! rather than a backlog of deltas.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::model::{
    InviteEntity, InviteId, InviteStatus, SessionEntity, SessionId, UserId, Visibility,
};
use crate::state::SessionPhase;
use crate::store::{BoardStream, CasOutcome, ChangeNotifier, SessionStream, StoreResult};

/// Shared in-memory document store with live query support.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    inner: Arc<Inner>,
}

struct Inner {
    invites: DashMap<InviteId, InviteEntity>,
    sessions: DashMap<SessionId, SessionEntity>,
    session_watch: DashMap<SessionId, watch::Sender<SessionEntity>>,
    // Version counter for the invite collection; query subscribers
    // recompute a snapshot on every bump.
    board: watch::Sender<u64>,
}

impl Default for Inner {
    fn default() -> Self {
        let (board, _) = watch::channel(0);
        Self {
            invites: DashMap::new(),
            sessions: DashMap::new(),
            session_watch: DashMap::new(),
            board,
        }
    }
}

impl MemoryNotifier {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn bump_board(&self) {
        self.board.send_modify(|version| *version += 1);
    }

    /// Waiting invites matching `filter`, oldest first, ties broken by id
    /// so concurrent creations still order identically everywhere.
    fn waiting_snapshot(&self, filter: impl Fn(&InviteEntity) -> bool) -> Vec<InviteEntity> {
        let mut invites: Vec<InviteEntity> = self
            .invites
            .iter()
            .filter(|entry| entry.status == InviteStatus::Waiting && filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        invites.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        invites
    }

    fn watch_invites(
        self: &Arc<Self>,
        filter: impl Fn(&InviteEntity) -> bool + Send + Sync + 'static,
    ) -> BoardStream {
        let inner = self.clone();
        let mut rx = inner.board.subscribe();
        let stream = async_stream::stream! {
            loop {
                yield inner.waiting_snapshot(&filter);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };
        stream.boxed()
    }

    fn notify_session(&self, next: SessionEntity) {
        if let Some(tx) = self.session_watch.get(&next.id) {
            tx.send_replace(next);
        }
    }
}

impl ChangeNotifier for MemoryNotifier {
    fn create_invite(&self, invite: InviteEntity) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.invites.insert(invite.id, invite);
            inner.bump_board();
            Ok(())
        })
    }

    fn fetch_invite(
        &self,
        id: InviteId,
    ) -> BoxFuture<'static, StoreResult<Option<InviteEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.invites.get(&id).map(|entry| entry.value().clone())) })
    }

    fn transition_invite(
        &self,
        id: InviteId,
        expected: &'static [InviteStatus],
        to: InviteStatus,
        updated_at: OffsetDateTime,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let outcome = match inner.invites.entry(id) {
                Entry::Occupied(mut entry) if expected.contains(&entry.get().status) => {
                    let invite = entry.get_mut();
                    invite.status = to;
                    invite.updated_at = updated_at;
                    drop(entry);
                    inner.bump_board();
                    CasOutcome::Committed
                }
                _ => CasOutcome::Rejected,
            };
            Ok(outcome)
        })
    }

    fn claim_invite(
        &self,
        claimed: InviteEntity,
        session: SessionEntity,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let outcome = match inner.invites.entry(claimed.id) {
                Entry::Occupied(mut entry)
                    if entry.get().status == InviteStatus::Waiting =>
                {
                    let session_id = session.id;
                    let (tx, _) = watch::channel(session.clone());
                    inner.sessions.insert(session_id, session);
                    inner.session_watch.insert(session_id, tx);
                    *entry.get_mut() = claimed;
                    drop(entry);
                    inner.bump_board();
                    debug!(%session_id, "invite claimed, session created");
                    CasOutcome::Committed
                }
                _ => CasOutcome::Rejected,
            };
            Ok(outcome)
        })
    }

    fn fetch_session(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StoreResult<Option<SessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.sessions.get(&id).map(|entry| entry.value().clone())) })
    }

    fn put_session_if_revision(
        &self,
        next: SessionEntity,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let outcome = match inner.sessions.entry(next.id) {
                Entry::Occupied(mut entry)
                    if entry.get().revision + 1 == next.revision =>
                {
                    *entry.get_mut() = next.clone();
                    drop(entry);
                    inner.notify_session(next);
                    CasOutcome::Committed
                }
                _ => CasOutcome::Rejected,
            };
            Ok(outcome)
        })
    }

    fn transition_session(
        &self,
        id: SessionId,
        expected: &'static [SessionPhase],
        to: SessionPhase,
        updated_at: OffsetDateTime,
    ) -> BoxFuture<'static, StoreResult<CasOutcome>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let outcome = match inner.sessions.entry(id) {
                Entry::Occupied(mut entry) if expected.contains(&entry.get().phase) => {
                    let session = entry.get_mut();
                    session.phase = to;
                    session.updated_at = updated_at;
                    session.revision += 1;
                    let next = session.clone();
                    drop(entry);
                    inner.notify_session(next);
                    CasOutcome::Committed
                }
                _ => CasOutcome::Rejected,
            };
            Ok(outcome)
        })
    }

    fn watch_open_invites(&self) -> BoxFuture<'static, StoreResult<BoardStream>> {
        let stream = self
            .inner
            .watch_invites(|invite| invite.visibility == Visibility::Open);
        Box::pin(async move { Ok(stream) })
    }

    fn watch_direct_invites(
        &self,
        guest_id: UserId,
    ) -> BoxFuture<'static, StoreResult<BoardStream>> {
        let stream = self.inner.watch_invites(move |invite| {
            invite.visibility == Visibility::Direct
                && invite.guest_id.as_deref() == Some(guest_id.as_str())
        });
        Box::pin(async move { Ok(stream) })
    }

    fn watch_session(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StoreResult<Option<SessionStream>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let stream = inner.session_watch.get(&id).map(|tx| {
                let rx = tx.subscribe();
                WatchStream::new(rx).boxed() as SessionStream
            });
            Ok(stream)
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::model::Seat;

    fn waiting_invite(visibility: Visibility) -> InviteEntity {
        let now = OffsetDateTime::now_utc();
        InviteEntity {
            id: Uuid::new_v4(),
            game_id: "ticTacToe".into(),
            host_id: "host".into(),
            guest_id: None,
            visibility,
            status: InviteStatus::Waiting,
            created_at: now,
            updated_at: now,
        }
    }

    fn session_for(invite: &InviteEntity, guest: &str) -> SessionEntity {
        let now = OffsetDateTime::now_utc();
        SessionEntity {
            id: invite.id,
            game_id: invite.game_id.clone(),
            players: [invite.host_id.clone(), guest.into()],
            phase: SessionPhase::Ready,
            game_state: serde_json::Value::Null,
            to_move: Seat::Host,
            moves_in_turn: 0,
            moves_applied: 0,
            result: None,
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn transition_invite_rejects_wrong_status() {
        let store = MemoryNotifier::new();
        let invite = waiting_invite(Visibility::Open);
        let id = invite.id;
        store.create_invite(invite).await.unwrap();

        let outcome = store
            .transition_invite(
                id,
                &[InviteStatus::Waiting],
                InviteStatus::Cancelled,
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Committed);

        let outcome = store
            .transition_invite(
                id,
                &[InviteStatus::Waiting],
                InviteStatus::Cancelled,
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Rejected);
    }

    #[tokio::test]
    async fn concurrent_claims_commit_exactly_once() {
        let store = MemoryNotifier::new();
        let invite = waiting_invite(Visibility::Open);
        store.create_invite(invite.clone()).await.unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            let barrier = barrier.clone();
            let mut claimed = invite.clone();
            let guest = format!("guest-{n}");
            claimed.status = InviteStatus::Claimed;
            claimed.guest_id = Some(guest.clone());
            let session = session_for(&invite, &guest);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store.claim_invite(claimed, session).await.unwrap()
            }));
        }

        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap() == CasOutcome::Committed {
                committed += 1;
            }
        }
        assert_eq!(committed, 1);

        let stored = store.fetch_invite(invite.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InviteStatus::Claimed);
        assert!(store.fetch_session(invite.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn session_watch_delivers_current_snapshot_first() {
        let store = MemoryNotifier::new();
        let invite = waiting_invite(Visibility::Direct);
        store.create_invite(invite.clone()).await.unwrap();

        let mut claimed = invite.clone();
        claimed.status = InviteStatus::Claimed;
        claimed.guest_id = Some("guest".into());
        let session = session_for(&invite, "guest");
        store.claim_invite(claimed, session).await.unwrap();

        let mut stream = store.watch_session(invite.id).await.unwrap().unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.phase, SessionPhase::Ready);
        assert_eq!(first.revision, 1);

        store
            .transition_session(
                invite.id,
                &[SessionPhase::Ready],
                SessionPhase::Active,
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(second.phase, SessionPhase::Active);
        assert_eq!(second.revision, 2);
    }

    #[tokio::test]
    async fn board_snapshot_orders_oldest_first_and_excludes_claimed() {
        let store = MemoryNotifier::new();
        let mut first = waiting_invite(Visibility::Open);
        first.created_at = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
        let mut second = waiting_invite(Visibility::Open);
        second.created_at = OffsetDateTime::from_unix_timestamp(2_000).unwrap();
        let direct = waiting_invite(Visibility::Direct);

        store.create_invite(second.clone()).await.unwrap();
        store.create_invite(first.clone()).await.unwrap();
        store.create_invite(direct).await.unwrap();

        let mut board = store.watch_open_invites().await.unwrap();
        let snapshot = board.next().await.unwrap();
        assert_eq!(
            snapshot.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );

        store
            .transition_invite(
                first.id,
                &[InviteStatus::Waiting],
                InviteStatus::Cancelled,
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        let snapshot = board.next().await.unwrap();
        assert_eq!(snapshot.iter().map(|i| i.id).collect::<Vec<_>>(), vec![second.id]);
    }

    #[tokio::test]
    async fn direct_invite_watch_sees_only_the_named_guest() {
        let store = MemoryNotifier::new();
        let mut for_guest = waiting_invite(Visibility::Direct);
        for_guest.guest_id = Some("guest".into());
        let mut for_other = waiting_invite(Visibility::Direct);
        for_other.guest_id = Some("someone-else".into());
        let open = waiting_invite(Visibility::Open);

        store.create_invite(for_guest.clone()).await.unwrap();
        store.create_invite(for_other).await.unwrap();
        store.create_invite(open).await.unwrap();

        let mut incoming = store.watch_direct_invites("guest".into()).await.unwrap();
        let snapshot = incoming.next().await.unwrap();
        assert_eq!(
            snapshot.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![for_guest.id]
        );

        store
            .transition_invite(
                for_guest.id,
                &[InviteStatus::Waiting],
                InviteStatus::Cancelled,
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        let snapshot = incoming.next().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn put_session_if_revision_rejects_stale_writer() {
        let store = MemoryNotifier::new();
        let invite = waiting_invite(Visibility::Open);
        let mut claimed = invite.clone();
        claimed.status = InviteStatus::Claimed;
        claimed.guest_id = Some("guest".into());
        store.create_invite(invite.clone()).await.unwrap();
        let session = session_for(&invite, "guest");
        store.claim_invite(claimed, session.clone()).await.unwrap();

        let mut next = session.clone();
        next.revision = 2;
        next.moves_applied = 1;
        assert_eq!(
            store.put_session_if_revision(next.clone()).await.unwrap(),
            CasOutcome::Committed
        );
        // Same stale base revision: the second writer must lose.
        assert_eq!(
            store.put_session_if_revision(next).await.unwrap(),
            CasOutcome::Rejected
        );
    }
}
