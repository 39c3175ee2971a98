//! Direct (one-to-one) invite creation and cancellation.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::{CoordError, CoordResult};
use crate::game::GameRegistry;
use crate::model::{InviteEntity, InviteId, InviteStatus, Visibility};
use crate::store::{BoardStream, CasOutcome, ChangeNotifier};

/// Creates and cancels direct invites.
#[derive(Clone)]
pub struct InviteRegistry {
    store: Arc<dyn ChangeNotifier>,
    games: Arc<GameRegistry>,
}

impl InviteRegistry {
    /// Build the registry over a store handle and the game lookup table.
    pub fn new(store: Arc<dyn ChangeNotifier>, games: Arc<GameRegistry>) -> Self {
        Self { store, games }
    }

    /// Create an invite addressed to one named guest.
    ///
    /// The invite starts `waiting` even though the guest is already bound;
    /// it becomes `claimed` only when that guest accepts.
    pub async fn create_direct_invite(
        &self,
        auth: &AuthContext,
        host_id: &str,
        guest_id: &str,
        game_id: &str,
    ) -> CoordResult<InviteId> {
        auth.require_same(host_id)?;

        if guest_id == host_id {
            return Err(CoordError::InvalidArgument(
                "cannot invite yourself".into(),
            ));
        }
        if !self.games.contains(game_id) {
            return Err(CoordError::InvalidArgument(format!(
                "unknown game `{game_id}`"
            )));
        }

        let now = OffsetDateTime::now_utc();
        let invite = InviteEntity {
            id: Uuid::new_v4(),
            game_id: game_id.to_owned(),
            host_id: host_id.to_owned(),
            guest_id: Some(guest_id.to_owned()),
            visibility: Visibility::Direct,
            status: InviteStatus::Waiting,
            created_at: now,
            updated_at: now,
        };
        let invite_id = invite.id;

        self.store.create_invite(invite).await?;
        info!(invite_id = %invite_id, game_id, guest_id, "direct invite created");
        Ok(invite_id)
    }

    /// Subscribe to the caller's incoming direct invites.
    ///
    /// Each delivery is the full ordered set of `waiting` invites naming
    /// the caller as guest, so a cancelled or claimed invite simply stops
    /// appearing in the next snapshot.
    pub async fn watch_incoming_invites(&self, auth: &AuthContext) -> CoordResult<BoardStream> {
        let caller = auth.require_uid()?;
        let stream = self.store.watch_direct_invites(caller.to_owned()).await?;
        Ok(stream)
    }

    /// Cancel an invite.
    ///
    /// Idempotent: an invite that is already `cancelled` or `claimed`
    /// yields a success no-op — a claimed invite's session is independent
    /// and cannot be retroactively cancelled. Only the host may cancel a
    /// still-`waiting` invite.
    pub async fn cancel(&self, auth: &AuthContext, invite_id: InviteId) -> CoordResult<()> {
        let caller = auth.require_uid()?;

        let invite = self
            .store
            .fetch_invite(invite_id)
            .await?
            .ok_or_else(|| CoordError::NotFound(format!("invite `{invite_id}`")))?;

        match invite.status {
            InviteStatus::Cancelled | InviteStatus::Claimed => Ok(()),
            InviteStatus::Waiting => {
                if invite.host_id != caller {
                    return Err(CoordError::Forbidden(
                        "only the host may cancel a waiting invite".into(),
                    ));
                }

                let outcome = self
                    .store
                    .transition_invite(
                        invite_id,
                        &[InviteStatus::Waiting],
                        InviteStatus::Cancelled,
                        OffsetDateTime::now_utc(),
                    )
                    .await?;

                match outcome {
                    CasOutcome::Committed => {
                        info!(invite_id = %invite_id, "invite cancelled");
                    }
                    CasOutcome::Rejected => {
                        // The status can only have left `waiting` for a
                        // terminal state, so the cancel is a no-op either
                        // way.
                        debug!(invite_id = %invite_id, "cancel raced a claim; invite already terminal");
                    }
                }
                Ok(())
            }
        }
    }
}
