//! Session lifecycle state, kept separate from the stored document shapes.

pub mod phase;

pub use phase::{InvalidTransition, SessionEvent, SessionPhase};
