//! One bundle wiring the three coordination services over shared handles.

use std::sync::Arc;

use crate::auth::AuthContext;
use crate::config::CoordConfig;
use crate::directory::ProfileDirectory;
use crate::error::CoordResult;
use crate::game::GameRegistry;
use crate::model::{InviteId, MovePayload, SessionEntity, SessionId};
use crate::services::{ChallengeBoard, ChallengeStream, InviteRegistry, SessionCoordinator};
use crate::store::{BoardStream, ChangeNotifier, SessionStream};

/// Facade over [`InviteRegistry`], [`ChallengeBoard`], and
/// [`SessionCoordinator`], exposing the operations the UI layer consumes.
///
/// Cheap to clone; all services share the same store, registry, and
/// directory handles.
#[derive(Clone)]
pub struct CoordHub {
    invites: InviteRegistry,
    board: ChallengeBoard,
    sessions: SessionCoordinator,
}

impl CoordHub {
    /// Wire the services over one store, game registry, and directory.
    pub fn new(
        store: Arc<dyn ChangeNotifier>,
        games: Arc<GameRegistry>,
        directory: Arc<dyn ProfileDirectory>,
        config: CoordConfig,
    ) -> Self {
        Self {
            invites: InviteRegistry::new(store.clone(), games.clone()),
            board: ChallengeBoard::new(
                store.clone(),
                games.clone(),
                directory,
                config.clone(),
            ),
            sessions: SessionCoordinator::new(store, games, config),
        }
    }

    /// See [`InviteRegistry::create_direct_invite`].
    pub async fn create_direct_invite(
        &self,
        auth: &AuthContext,
        host_id: &str,
        guest_id: &str,
        game_id: &str,
    ) -> CoordResult<InviteId> {
        self.invites
            .create_direct_invite(auth, host_id, guest_id, game_id)
            .await
    }

    /// See [`InviteRegistry::watch_incoming_invites`].
    pub async fn watch_incoming_invites(&self, auth: &AuthContext) -> CoordResult<BoardStream> {
        self.invites.watch_incoming_invites(auth).await
    }

    /// See [`InviteRegistry::cancel`].
    pub async fn cancel(&self, auth: &AuthContext, invite_id: InviteId) -> CoordResult<()> {
        self.invites.cancel(auth, invite_id).await
    }

    /// See [`ChallengeBoard::create_open_challenge`].
    pub async fn create_open_challenge(
        &self,
        auth: &AuthContext,
        host_id: &str,
        game_id: &str,
    ) -> CoordResult<InviteId> {
        self.board.create_open_challenge(auth, host_id, game_id).await
    }

    /// See [`ChallengeBoard::list_open_challenges`].
    pub async fn list_open_challenges(
        &self,
        excluding_host: &str,
    ) -> CoordResult<ChallengeStream> {
        self.board.list_open_challenges(excluding_host).await
    }

    /// See [`ChallengeBoard::accept_open_challenge`].
    pub async fn accept_open_challenge(
        &self,
        auth: &AuthContext,
        invite_id: InviteId,
    ) -> CoordResult<SessionId> {
        self.board.accept_open_challenge(auth, invite_id).await
    }

    /// See [`SessionCoordinator::activate`].
    pub async fn activate(&self, auth: &AuthContext, session_id: SessionId) -> CoordResult<()> {
        self.sessions.activate(auth, session_id).await
    }

    /// See [`SessionCoordinator::subscribe`].
    pub async fn subscribe(&self, session_id: SessionId) -> CoordResult<SessionStream> {
        self.sessions.subscribe(session_id).await
    }

    /// See [`SessionCoordinator::apply_move`].
    pub async fn apply_move(
        &self,
        auth: &AuthContext,
        session_id: SessionId,
        payload: MovePayload,
    ) -> CoordResult<SessionEntity> {
        self.sessions.apply_move(auth, session_id, payload).await
    }

    /// See [`SessionCoordinator::abandon`].
    pub async fn abandon(&self, auth: &AuthContext, session_id: SessionId) -> CoordResult<()> {
        self.sessions.abandon(auth, session_id).await
    }
}
