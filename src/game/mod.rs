//! The game-module contract and the static registry that resolves a
//! `game_id` to its rules engine.
//!
//! Each of the product's mini-games plugs in as one [`GameModule`]: a
//! deterministic reducer over an opaque JSON state blob. The coordination
//! layer never inspects the blob; it only folds accepted moves, advances the
//! turn per the module's [`TurnPolicy`], and asks for the end condition.
//! Determinism is mandatory: given the same seed and the same ordered move
//! sequence, two independently scheduled clients must converge on
//! bit-identical state, so reducers get a seeded rng through
//! [`MoveContext`] and nothing else that varies between runs.

use std::sync::Arc;

use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Seat, SessionId};

/// Final outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    /// The named seat won.
    Winner(Seat),
    /// Neither seat won.
    Draw,
}

/// Result of invoking a move reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveResult {
    /// The move is legal; this is the complete next state.
    Accepted(Value),
    /// The move is illegal in the current state. Nothing was mutated.
    Rejected,
}

/// How many accepted moves one seat takes before the turn passes.
///
/// Most games pass the turn after a single accepted move; a few (memory
/// matching, for instance) let the same seat move twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnPolicy {
    /// Accepted moves per turn, at least 1.
    pub moves_per_turn: u8,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self { moves_per_turn: 1 }
    }
}

/// Per-move execution context handed to reducers.
///
/// The rng is seeded from the session id and the move index, so replaying
/// the same move sequence reproduces every random draw regardless of how
/// many draws earlier reducers made.
pub struct MoveContext {
    actor: Seat,
    rng: ChaCha8Rng,
}

impl MoveContext {
    /// Build the context for the `move_index`-th accepted move of a session.
    pub fn new(session_id: SessionId, actor: Seat, move_index: u32) -> Self {
        Self {
            actor,
            rng: ChaCha8Rng::seed_from_u64(move_seed(session_id, move_index)),
        }
    }

    /// Seat submitting the move.
    pub fn actor(&self) -> Seat {
        self.actor
    }

    /// Deterministic random source for this move. Reducers must use this
    /// and never wall-clock time, local randomness, or unordered iteration.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// A pluggable, deterministic rules engine for exactly one game.
pub trait GameModule: Send + Sync {
    /// Stable identifier used in invites and sessions (e.g. `"ticTacToe"`).
    fn game_id(&self) -> &str;

    /// Build the initial state for a fresh session.
    fn setup(&self, seed: u64) -> Value;

    /// Invoke the named reducer. Unknown names must be rejected, and a
    /// rejection must leave no trace: the reducer returns a whole new state
    /// or nothing.
    fn apply_move(&self, state: &Value, ctx: &mut MoveContext, name: &str, args: &Value)
    -> MoveResult;

    /// Turn policy for this game.
    fn turn_policy(&self) -> TurnPolicy {
        TurnPolicy::default()
    }

    /// End condition: `None` while the game is ongoing.
    fn outcome(&self, state: &Value) -> Option<GameOutcome>;
}

/// Static, read-only `game_id → GameModule` lookup table, built once at
/// startup. Insertion order is preserved so UI listings are stable.
pub struct GameRegistry {
    modules: IndexMap<String, Arc<dyn GameModule>>,
}

impl GameRegistry {
    /// Build the registry from the product's module set.
    pub fn new(modules: impl IntoIterator<Item = Arc<dyn GameModule>>) -> Self {
        let modules = modules
            .into_iter()
            .map(|module| (module.game_id().to_owned(), module))
            .collect();
        Self { modules }
    }

    /// Resolve a module by game id.
    pub fn get(&self, game_id: &str) -> Option<&Arc<dyn GameModule>> {
        self.modules.get(game_id)
    }

    /// Whether a game id is known.
    pub fn contains(&self, game_id: &str) -> bool {
        self.modules.contains_key(game_id)
    }

    /// Registered game ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

/// Base seed for a session, derived from its id so both clients agree on it
/// without negotiation.
pub fn session_seed(session_id: SessionId) -> u64 {
    let bytes = session_id.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Seed for the rng of one move, mixing the move index into the session
/// seed (splitmix64 finalizer).
pub fn move_seed(session_id: SessionId, move_index: u32) -> u64 {
    let mut z = session_seed(session_id)
        .wrapping_add(u64::from(move_index).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
