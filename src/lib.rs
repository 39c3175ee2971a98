//! Matchmaking and game-session coordination for two-player mini-games.
//!
//! Two independently connected clients discover each other through invites
//! and open challenges, bind into a single session, and exchange moves, with
//! an eventually-consistent document store ([`store::ChangeNotifier`]) as
//! the only transport. Every mutation follows a read-then-conditional-write
//! discipline so concurrent claimers, cancellers, and movers resolve to
//! exactly one winner per document.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod game;
pub mod hub;
pub mod model;
pub mod services;
pub mod state;
pub mod store;

pub use auth::AuthContext;
pub use error::{CoordError, CoordResult};
pub use hub::CoordHub;
