//! Fixture game modules and wiring shared by the integration tests.

use std::sync::Arc;

use rand::Rng;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use matchplay::config::CoordConfig;
use matchplay::directory::{Profile, StaticDirectory};
use matchplay::game::{GameModule, GameOutcome, GameRegistry, MoveContext, MoveResult, TurnPolicy};
use matchplay::hub::CoordHub;
use matchplay::model::Seat;
use matchplay::store::memory::MemoryNotifier;

/// Classic three-in-a-row; one move per turn.
pub struct TicTacToe;

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

fn mark(seat: Seat) -> &'static str {
    match seat {
        Seat::Host => "h",
        Seat::Guest => "g",
    }
}

fn read_board(state: &Value) -> Option<Vec<String>> {
    serde_json::from_value(state.get("board")?.clone()).ok()
}

impl GameModule for TicTacToe {
    fn game_id(&self) -> &str {
        "ticTacToe"
    }

    fn setup(&self, _seed: u64) -> Value {
        json!({ "board": ["", "", "", "", "", "", "", "", ""] })
    }

    fn apply_move(
        &self,
        state: &Value,
        ctx: &mut MoveContext,
        name: &str,
        args: &Value,
    ) -> MoveResult {
        if name != "place" {
            return MoveResult::Rejected;
        }
        let Some(cell) = args.get("cell").and_then(Value::as_u64) else {
            return MoveResult::Rejected;
        };
        let Some(mut board) = read_board(state) else {
            return MoveResult::Rejected;
        };
        let Some(slot) = board.get_mut(cell as usize) else {
            return MoveResult::Rejected;
        };
        if !slot.is_empty() {
            return MoveResult::Rejected;
        }
        *slot = mark(ctx.actor()).to_owned();
        MoveResult::Accepted(json!({ "board": board }))
    }

    fn outcome(&self, state: &Value) -> Option<GameOutcome> {
        let board = read_board(state)?;
        for line in LINES {
            let first = board[line[0]].as_str();
            if !first.is_empty() && line.iter().all(|&cell| board[cell] == first) {
                let winner = if first == mark(Seat::Host) {
                    Seat::Host
                } else {
                    Seat::Guest
                };
                return Some(GameOutcome::Winner(winner));
            }
        }
        if board.iter().all(|slot| !slot.is_empty()) {
            return Some(GameOutcome::Draw);
        }
        None
    }
}

/// Memory-matching stand-in: two accepted moves per turn, ends in a draw
/// after a fixed number of flips.
pub struct MemoryDuel;

impl GameModule for MemoryDuel {
    fn game_id(&self) -> &str {
        "memoryDuel"
    }

    fn setup(&self, _seed: u64) -> Value {
        json!({ "flips": 0 })
    }

    fn apply_move(
        &self,
        state: &Value,
        _ctx: &mut MoveContext,
        name: &str,
        _args: &Value,
    ) -> MoveResult {
        if name != "flip" {
            return MoveResult::Rejected;
        }
        let flips = state.get("flips").and_then(Value::as_u64).unwrap_or(0);
        MoveResult::Accepted(json!({ "flips": flips + 1 }))
    }

    fn turn_policy(&self) -> TurnPolicy {
        TurnPolicy { moves_per_turn: 2 }
    }

    fn outcome(&self, state: &Value) -> Option<GameOutcome> {
        let flips = state.get("flips").and_then(Value::as_u64).unwrap_or(0);
        (flips >= 12).then_some(GameOutcome::Draw)
    }
}

/// Dice game exercising the seeded per-move rng: each seat rolls three
/// times, highest total wins.
pub struct DiceDuel;

impl GameModule for DiceDuel {
    fn game_id(&self) -> &str {
        "diceDuel"
    }

    fn setup(&self, seed: u64) -> Value {
        json!({ "seed": seed, "host": [], "guest": [] })
    }

    fn apply_move(
        &self,
        state: &Value,
        ctx: &mut MoveContext,
        name: &str,
        _args: &Value,
    ) -> MoveResult {
        if name != "roll" {
            return MoveResult::Rejected;
        }
        let key = match ctx.actor() {
            Seat::Host => "host",
            Seat::Guest => "guest",
        };
        let mut next = state.clone();
        let roll: u8 = ctx.rng().random_range(1..=6);
        let Some(rolls) = next.get_mut(key).and_then(Value::as_array_mut) else {
            return MoveResult::Rejected;
        };
        if rolls.len() >= 3 {
            return MoveResult::Rejected;
        }
        rolls.push(json!(roll));
        MoveResult::Accepted(next)
    }

    fn outcome(&self, state: &Value) -> Option<GameOutcome> {
        let total = |key: &str| -> Option<(usize, u64)> {
            let rolls = state.get(key)?.as_array()?;
            Some((
                rolls.len(),
                rolls.iter().filter_map(Value::as_u64).sum::<u64>(),
            ))
        };
        let (host_rolls, host_total) = total("host")?;
        let (guest_rolls, guest_total) = total("guest")?;
        if host_rolls < 3 || guest_rolls < 3 {
            return None;
        }
        Some(match host_total.cmp(&guest_total) {
            std::cmp::Ordering::Greater => GameOutcome::Winner(Seat::Host),
            std::cmp::Ordering::Less => GameOutcome::Winner(Seat::Guest),
            std::cmp::Ordering::Equal => GameOutcome::Draw,
        })
    }
}

/// Registry with all fixture games.
pub fn registry() -> Arc<GameRegistry> {
    Arc::new(GameRegistry::new([
        Arc::new(TicTacToe) as Arc<dyn GameModule>,
        Arc::new(MemoryDuel) as Arc<dyn GameModule>,
        Arc::new(DiceDuel) as Arc<dyn GameModule>,
    ]))
}

/// Install the log subscriber once per test binary; `RUST_LOG` filters as
/// usual. Subsequent calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// Hub over a fresh in-memory store, plus the handles tests poke directly.
pub fn hub() -> (CoordHub, MemoryNotifier, StaticDirectory) {
    init_tracing();
    let store = MemoryNotifier::new();
    let directory = StaticDirectory::new();
    directory.insert(
        "host",
        Profile {
            display_name: "Hosting Harriet".into(),
            photo_url: Some("https://example.com/harriet.jpg".into()),
        },
    );
    let hub = CoordHub::new(
        Arc::new(store.clone()),
        registry(),
        Arc::new(directory.clone()),
        CoordConfig::default(),
    );
    (hub, store, directory)
}
