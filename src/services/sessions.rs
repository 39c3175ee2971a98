//! Session lifecycle and move application once two players are bound.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::auth::AuthContext;
use crate::config::CoordConfig;
use crate::error::{CoordError, CoordResult};
use crate::game::{GameRegistry, MoveContext, MoveResult};
use crate::model::{MovePayload, SessionEntity, SessionId};
use crate::state::{SessionEvent, SessionPhase};
use crate::store::{CasOutcome, ChangeNotifier, SessionStream};

const ACTIVATABLE: &[SessionPhase] = &[SessionPhase::Ready];
const ABANDONABLE: &[SessionPhase] = &[SessionPhase::Ready, SessionPhase::Active];

/// Owns the session state machine and move application.
#[derive(Clone)]
pub struct SessionCoordinator {
    store: Arc<dyn ChangeNotifier>,
    games: Arc<GameRegistry>,
    config: CoordConfig,
}

impl SessionCoordinator {
    /// Build the coordinator over shared store and registry handles.
    pub fn new(
        store: Arc<dyn ChangeNotifier>,
        games: Arc<GameRegistry>,
        config: CoordConfig,
    ) -> Self {
        Self {
            store,
            games,
            config,
        }
    }

    /// Transition `ready → active` once both players are present.
    ///
    /// When presence is acknowledged is the caller's business (a first move
    /// submission is a common trigger). Idempotent when the session is
    /// already active: both players may race to activate and either order
    /// must succeed.
    pub async fn activate(&self, auth: &AuthContext, session_id: SessionId) -> CoordResult<()> {
        let caller = auth.require_uid()?;
        let session = self.load(session_id).await?;
        self.require_player(&session, caller)?;

        match session.phase {
            SessionPhase::Active => Ok(()),
            SessionPhase::Completed | SessionPhase::Abandoned => Err(CoordError::InvalidArgument(
                format!("session is already {:?}", session.phase),
            )),
            SessionPhase::Ready => {
                let outcome = self
                    .store
                    .transition_session(
                        session_id,
                        ACTIVATABLE,
                        SessionPhase::Active,
                        OffsetDateTime::now_utc(),
                    )
                    .await?;

                match outcome {
                    CasOutcome::Committed => Ok(()),
                    // Someone else moved the phase first; re-read to decide.
                    CasOutcome::Rejected => match self.load(session_id).await?.phase {
                        SessionPhase::Active => Ok(()),
                        phase => Err(CoordError::InvalidArgument(format!(
                            "session is already {phase:?}"
                        ))),
                    },
                }
            }
        }
    }

    /// Subscribe to every committed change of a session document.
    ///
    /// Deliveries are whole snapshots in that document's commit order, with
    /// the current state first, so a handler can always resynchronize from
    /// the latest payload alone. Safe to call from both players
    /// symmetrically.
    pub async fn subscribe(&self, session_id: SessionId) -> CoordResult<SessionStream> {
        self.store
            .watch_session(session_id)
            .await?
            .ok_or_else(|| CoordError::NotFound(format!("session `{session_id}`")))
    }

    /// Apply one move and return the committed session snapshot.
    ///
    /// Fail-closed: an illegal move leaves `game_state` untouched and fails
    /// identically on resubmission. On acceptance the new state, the turn
    /// bookkeeping, and a possible `completed` transition with its result
    /// are committed as one atomic write; losing that write race surfaces
    /// as [`CoordError::AlreadyClaimed`], and a retry re-reads the truth.
    pub async fn apply_move(
        &self,
        auth: &AuthContext,
        session_id: SessionId,
        payload: MovePayload,
    ) -> CoordResult<SessionEntity> {
        let caller = auth.require_uid()?;

        let session = self.load(session_id).await?;
        let seat = self.require_player(&session, caller)?;

        let encoded = serde_json::to_vec(&payload)
            .map_err(|err| CoordError::InvalidArgument(format!("unencodable move: {err}")))?;
        if encoded.len() > self.config.max_move_payload_bytes {
            return Err(CoordError::InvalidArgument(format!(
                "move payload exceeds {} bytes",
                self.config.max_move_payload_bytes
            )));
        }

        if session.phase != SessionPhase::Active {
            return Err(CoordError::InvalidArgument(format!(
                "session is {:?}, not active",
                session.phase
            )));
        }
        if session.to_move != seat {
            return Err(CoordError::Forbidden("not your turn".into()));
        }

        let module = self.games.get(&session.game_id).ok_or_else(|| {
            CoordError::InvalidArgument(format!("unknown game `{}`", session.game_id))
        })?;

        let mut ctx = MoveContext::new(session.id, seat, session.moves_applied);
        let next_state =
            match module.apply_move(&session.game_state, &mut ctx, &payload.name, &payload.args) {
                MoveResult::Accepted(state) => state,
                MoveResult::Rejected => return Err(CoordError::InvalidMove),
            };

        let mut next = session;
        next.game_state = next_state;
        next.moves_applied += 1;
        next.moves_in_turn += 1;

        let moves_per_turn = module.turn_policy().moves_per_turn.max(1);
        if next.moves_in_turn >= moves_per_turn {
            next.to_move = seat.other();
            next.moves_in_turn = 0;
        }

        if let Some(outcome) = module.outcome(&next.game_state) {
            // Single atomic commit: state, result, and terminal phase.
            next.result = Some(outcome);
            next.phase = next
                .phase
                .transition(SessionEvent::Complete)
                .map_err(|err| CoordError::InvalidArgument(err.to_string()))?;
        }

        next.revision += 1;
        next.updated_at = OffsetDateTime::now_utc();

        match self.store.put_session_if_revision(next.clone()).await? {
            CasOutcome::Committed => {
                if next.phase == SessionPhase::Completed {
                    info!(session_id = %session_id, result = ?next.result, "session completed");
                }
                Ok(next)
            }
            CasOutcome::Rejected => {
                debug!(session_id = %session_id, "move commit lost a write race");
                Err(CoordError::AlreadyClaimed)
            }
        }
    }

    /// Force the session to `abandoned` from `ready` or `active`.
    ///
    /// Either player may call this at any time; it is idempotent, and a
    /// session that went terminal concurrently (the peer abandoned, or a
    /// final move completed it) is a success no-op. The counterpart's next
    /// subscription delivery reflects the transition.
    pub async fn abandon(&self, auth: &AuthContext, session_id: SessionId) -> CoordResult<()> {
        let caller = auth.require_uid()?;
        let session = self.load(session_id).await?;
        self.require_player(&session, caller)?;

        if session.phase.is_terminal() {
            return Ok(());
        }

        let outcome = self
            .store
            .transition_session(
                session_id,
                ABANDONABLE,
                SessionPhase::Abandoned,
                OffsetDateTime::now_utc(),
            )
            .await?;

        match outcome {
            CasOutcome::Committed => {
                info!(session_id = %session_id, "session abandoned");
            }
            CasOutcome::Rejected => {
                // Phase is monotonic, so a rejection means it went terminal
                // concurrently.
                debug!(session_id = %session_id, "abandon raced another terminal transition");
            }
        }
        Ok(())
    }

    async fn load(&self, session_id: SessionId) -> CoordResult<SessionEntity> {
        self.store
            .fetch_session(session_id)
            .await?
            .ok_or_else(|| CoordError::NotFound(format!("session `{session_id}`")))
    }

    fn require_player(
        &self,
        session: &SessionEntity,
        caller: &str,
    ) -> CoordResult<crate::model::Seat> {
        session
            .seat_of(caller)
            .ok_or_else(|| CoordError::Forbidden("caller is not a player of this session".into()))
    }
}
