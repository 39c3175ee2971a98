//! Stored document shapes for invites and sessions.
//!
//! These are the entities persisted through [`crate::store::ChangeNotifier`]
//! and delivered back to subscribers as whole snapshots. Handlers must treat
//! every snapshot as the full current truth; there is no cross-document
//! ordering guarantee between an invite and the session it spawned.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::game::GameOutcome;
use crate::state::SessionPhase;

/// Opaque user identifier issued by the external auth service.
pub type UserId = String;
/// Identifier of an invite document.
pub type InviteId = Uuid;
/// Identifier of a session document (equal to the claimed invite id).
pub type SessionId = Uuid;

/// Who can claim an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Addressed to one named guest.
    Direct,
    /// Visible to any potential opponent on the challenge board.
    Open,
}

/// Lifecycle status of an invite. `Claimed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    /// Created, not yet claimed or cancelled.
    Waiting,
    /// Exactly one guest bound themselves to the invite; a session exists.
    Claimed,
    /// Withdrawn by the host.
    Cancelled,
}

/// A proposal to play a specific game, either targeted or open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteEntity {
    /// Primary key of the invite document.
    pub id: InviteId,
    /// Game this invite proposes, resolved through the game registry.
    pub game_id: String,
    /// User who created the invite.
    pub host_id: UserId,
    /// Bound guest. Direct invites carry the target from creation while
    /// still `Waiting`; open challenges set it at claim time.
    pub guest_id: Option<UserId>,
    /// Direct or open.
    pub visibility: Visibility,
    /// Current lifecycle status.
    pub status: InviteStatus,
    /// Creation timestamp; the challenge board orders by this, oldest first.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Timestamp of the last committed write.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl InviteEntity {
    /// Whether the invite can still be claimed.
    pub fn is_waiting(&self) -> bool {
        self.status == InviteStatus::Waiting
    }
}

/// One of the two fixed seats in a session. The host always sits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    /// `players[0]`, the invite host. Moves first.
    Host,
    /// `players[1]`, the player who claimed the invite.
    Guest,
}

impl Seat {
    /// The opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::Host => Seat::Guest,
            Seat::Guest => Seat::Host,
        }
    }

    /// Index of this seat into [`SessionEntity::players`].
    pub fn index(self) -> usize {
        match self {
            Seat::Host => 0,
            Seat::Guest => 1,
        }
    }
}

/// The live or finished instance of a game between two bound players.
///
/// Created atomically with a successful invite claim and never with fewer
/// than two distinct players. `phase` only moves forward
/// (`ready → active → completed | abandoned`); `players` is immutable after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntity {
    /// Primary key, derived from the claimed invite id.
    pub id: SessionId,
    /// Game being played; resolves the module that owns `game_state`.
    pub game_id: String,
    /// The two bound players, `[host, guest]`, order fixed at creation.
    pub players: [UserId; 2],
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Opaque state blob owned exclusively by the matching game module.
    pub game_state: serde_json::Value,
    /// Seat whose move is expected next.
    pub to_move: Seat,
    /// Accepted moves taken by `to_move` within the current turn.
    pub moves_in_turn: u8,
    /// Total accepted moves; also the replay index for the per-move rng.
    pub moves_applied: u32,
    /// Final outcome, recorded in the same commit as the `Completed`
    /// transition.
    pub result: Option<GameOutcome>,
    /// Optimistic-concurrency token; every committed write bumps it by one.
    pub revision: u64,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Timestamp of the last committed write.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SessionEntity {
    /// Player id occupying the given seat.
    pub fn player(&self, seat: Seat) -> &UserId {
        &self.players[seat.index()]
    }

    /// Seat occupied by `uid`, if they are one of the two bound players.
    pub fn seat_of(&self, uid: &str) -> Option<Seat> {
        if self.players[0] == uid {
            Some(Seat::Host)
        } else if self.players[1] == uid {
            Some(Seat::Guest)
        } else {
            None
        }
    }
}

/// A single move submission. Ephemeral: accepted moves are folded into
/// [`SessionEntity::game_state`], rejected moves leave no trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovePayload {
    /// Name of the reducer to invoke, as declared by the game module.
    pub name: String,
    /// Reducer arguments, interpreted only by the game module.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl MovePayload {
    /// Convenience constructor for a named move.
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_indexing_is_fixed() {
        assert_eq!(Seat::Host.index(), 0);
        assert_eq!(Seat::Guest.index(), 1);
        assert_eq!(Seat::Host.other(), Seat::Guest);
        assert_eq!(Seat::Guest.other(), Seat::Host);
    }

    #[test]
    fn invite_serde_round_trip_keeps_status() {
        let now = OffsetDateTime::now_utc();
        let invite = InviteEntity {
            id: Uuid::new_v4(),
            game_id: "ticTacToe".into(),
            host_id: "host".into(),
            guest_id: None,
            visibility: Visibility::Open,
            status: InviteStatus::Waiting,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&invite).unwrap();
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["visibility"], "open");

        let back: InviteEntity = serde_json::from_value(json).unwrap();
        assert!(back.is_waiting());
        assert_eq!(back.guest_id, None);
    }
}
