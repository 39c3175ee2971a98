//! The open challenge board: many-to-one invites and race-resolved claims.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::config::CoordConfig;
use crate::directory::{Profile, ProfileDirectory};
use crate::error::{CoordError, CoordResult};
use crate::game::{GameRegistry, session_seed};
use crate::model::{
    InviteEntity, InviteId, InviteStatus, Seat, SessionEntity, SessionId, Visibility,
};
use crate::state::SessionPhase;
use crate::store::{CasOutcome, ChangeNotifier};

/// One entry of the live challenge listing, decorated with the host's
/// profile when the directory has one.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenChallenge {
    /// The waiting open invite.
    pub invite: InviteEntity,
    /// Best-effort host profile; `None` when the lookup missed or failed.
    pub host: Option<Profile>,
}

/// Live snapshot stream of hydrated open challenges.
pub type ChallengeStream = BoxStream<'static, Vec<OpenChallenge>>;

/// Publishes and claims open challenges; owns the claim race resolution.
#[derive(Clone)]
pub struct ChallengeBoard {
    store: Arc<dyn ChangeNotifier>,
    games: Arc<GameRegistry>,
    directory: Arc<dyn ProfileDirectory>,
    config: CoordConfig,
}

impl ChallengeBoard {
    /// Build the board over shared store, registry, and directory handles.
    pub fn new(
        store: Arc<dyn ChangeNotifier>,
        games: Arc<GameRegistry>,
        directory: Arc<dyn ProfileDirectory>,
        config: CoordConfig,
    ) -> Self {
        Self {
            store,
            games,
            directory,
            config,
        }
    }

    /// Publish a challenge any opponent may claim.
    pub async fn create_open_challenge(
        &self,
        auth: &AuthContext,
        host_id: &str,
        game_id: &str,
    ) -> CoordResult<InviteId> {
        auth.require_same(host_id)?;

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
            guest_id: None,
            visibility: Visibility::Open,
            status: InviteStatus::Waiting,
            created_at: now,
            updated_at: now,
        };
        let invite_id = invite.id;

        self.store.create_invite(invite).await?;
        info!(invite_id = %invite_id, game_id, "open challenge published");
        Ok(invite_id)
    }

    /// Subscribe to the board: waiting open challenges ordered oldest
    /// first, excluding the caller's own, each snapshot hydrated with host
    /// profiles.
    ///
    /// This is a long-lived subscription. Every delivery is the full
    /// current board, so a handler resynchronizes from any single snapshot;
    /// re-subscribing after a disconnect yields a fresh snapshot, not a
    /// diff.
    pub async fn list_open_challenges(
        &self,
        excluding_host: &str,
    ) -> CoordResult<ChallengeStream> {
        let mut inner = self.store.watch_open_invites().await?;
        let directory = self.directory.clone();
        let excluding = excluding_host.to_owned();
        let limit = self.config.board_snapshot_limit;

        let stream = async_stream::stream! {
            while let Some(snapshot) = inner.next().await {
                let mut board = Vec::new();
                for invite in snapshot
                    .into_iter()
                    .filter(|invite| invite.host_id != excluding)
                    .take(limit)
                {
                    let host = match directory.lookup(&invite.host_id).await {
                        Ok(profile) => profile,
                        Err(err) => {
                            // Profiles are decoration; never fail the board.
                            warn!(host_id = %invite.host_id, error = %err, "profile lookup failed");
                            None
                        }
                    };
                    board.push(OpenChallenge { invite, host });
                }
                yield board;
            }
        };

        Ok(stream.boxed())
    }

    /// Claim an invite, binding the caller as guest and creating the
    /// session in the same logical commit.
    ///
    /// Race-critical: of any number of concurrent claimers, exactly one
    /// wins; the rest get [`CoordError::AlreadyClaimed`] and must not
    /// retry, since the challenge is gone. Direct invites are claimed
    /// through the same path by their named guest.
    pub async fn accept_open_challenge(
        &self,
        auth: &AuthContext,
        invite_id: InviteId,
    ) -> CoordResult<SessionId> {
        let guest = auth.require_uid()?.to_owned();

        let invite = self
            .store
            .fetch_invite(invite_id)
            .await?
            .ok_or_else(|| CoordError::NotFound(format!("invite `{invite_id}`")))?;

        if !invite.is_waiting() {
            return Err(CoordError::AlreadyClaimed);
        }
        match invite.visibility {
            Visibility::Direct => {
                if invite.guest_id.as_deref() != Some(guest.as_str()) {
                    return Err(CoordError::Forbidden(
                        "direct invite is addressed to another user".into(),
                    ));
                }
            }
            Visibility::Open => {
                if invite.host_id == guest {
                    return Err(CoordError::InvalidArgument(
                        "cannot accept your own challenge".into(),
                    ));
                }
            }
        }

        let module = self.games.get(&invite.game_id).ok_or_else(|| {
            CoordError::InvalidArgument(format!("unknown game `{}`", invite.game_id))
        })?;

        let now = OffsetDateTime::now_utc();
        let session_id = invite.id;

        let mut claimed = invite.clone();
        claimed.status = InviteStatus::Claimed;
        claimed.guest_id = Some(guest.clone());
        claimed.updated_at = now;

        let session = SessionEntity {
            id: session_id,
            game_id: invite.game_id.clone(),
            players: [invite.host_id.clone(), guest],
            phase: SessionPhase::Ready,
            game_state: module.setup(session_seed(session_id)),
            to_move: Seat::Host,
            moves_in_turn: 0,
            moves_applied: 0,
            result: None,
            revision: 1,
            created_at: now,
            updated_at: now,
        };

        match self.store.claim_invite(claimed, session).await? {
            CasOutcome::Committed => {
                info!(session_id = %session_id, game_id = %invite.game_id, "challenge claimed");
                Ok(session_id)
            }
            CasOutcome::Rejected => {
                debug!(invite_id = %invite_id, "lost the claim race");
                Err(CoordError::AlreadyClaimed)
            }
        }
    }
}
