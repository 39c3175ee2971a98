//! The three coordination services exposed upward to the UI layer.

pub mod challenges;
pub mod invites;
pub mod sessions;

pub use challenges::{ChallengeBoard, ChallengeStream, OpenChallenge};
pub use invites::InviteRegistry;
pub use sessions::SessionCoordinator;
