//! The monotonic session phase machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle phase of a session.
///
/// The phase is monotonic: `Ready → Active → {Completed, Abandoned}`. No
/// other transition is legal, which is what lets cancellation and claiming
/// race safely on conditional writes keyed on this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Created with both players bound, waiting for presence.
    Ready,
    /// Both players acknowledged; moves are accepted.
    Active,
    /// The game module's end condition was satisfied.
    Completed,
    /// One player forced the session closed.
    Abandoned,
}

/// Events that can be applied to a session's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Both players are present; start accepting moves.
    Activate,
    /// The game module reported a final outcome.
    Complete,
    /// Either player walked away.
    Abandon,
}

/// Error returned when attempting to apply an illegal phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// The phase the session was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

impl SessionPhase {
    /// Whether the session can never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Abandoned)
    }

    /// Compute the next phase for an event, enforcing monotonicity.
    pub fn transition(self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self, event) {
            (SessionPhase::Ready, SessionEvent::Activate) => SessionPhase::Active,
            (SessionPhase::Active, SessionEvent::Complete) => SessionPhase::Completed,
            (SessionPhase::Ready, SessionEvent::Abandon)
            | (SessionPhase::Active, SessionEvent::Abandon) => SessionPhase::Abandoned,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_to_completed() {
        let phase = SessionPhase::Ready.transition(SessionEvent::Activate).unwrap();
        assert_eq!(phase, SessionPhase::Active);
        let phase = phase.transition(SessionEvent::Complete).unwrap();
        assert_eq!(phase, SessionPhase::Completed);
        assert!(phase.is_terminal());
    }

    #[test]
    fn abandon_from_ready_and_active() {
        assert_eq!(
            SessionPhase::Ready.transition(SessionEvent::Abandon).unwrap(),
            SessionPhase::Abandoned
        );
        assert_eq!(
            SessionPhase::Active.transition(SessionEvent::Abandon).unwrap(),
            SessionPhase::Abandoned
        );
    }

    #[test]
    fn terminal_phases_reject_everything() {
        for phase in [SessionPhase::Completed, SessionPhase::Abandoned] {
            for event in [
                SessionEvent::Activate,
                SessionEvent::Complete,
                SessionEvent::Abandon,
            ] {
                let err = phase.transition(event).unwrap_err();
                assert_eq!(err.from, phase);
                assert_eq!(err.event, event);
            }
        }
    }

    #[test]
    fn ready_cannot_complete_directly() {
        let err = SessionPhase::Ready
            .transition(SessionEvent::Complete)
            .unwrap_err();
        assert_eq!(err.from, SessionPhase::Ready);
    }
}
