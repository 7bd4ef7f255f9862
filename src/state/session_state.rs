/// Session lifecycle states
///
/// This module defines the states a dump session moves through and which
/// transitions between them are legal.
use crate::DumpError;
use std::fmt;

/// Represents the current state of a dump session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    // ===== Entry States =====
    /// No session directory exists yet for this dump
    Fresh,

    /// A session directory with persisted state is being picked up again
    Resuming,

    // ===== Working State =====
    /// The engine adapter is enumerating and fetching content
    Active,

    // ===== Terminal States =====
    /// The adapter reported that everything enumerable has been fetched
    Complete,

    /// An unrecoverable error ended the session
    Aborted,
}

impl SessionState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }

    /// Returns true if the transition `self -> next` is allowed
    ///
    /// Any non-terminal state may abort. Terminal states never transition.
    /// `Fresh -> Resuming` is taken when path resolution finds a stored
    /// session to pick up.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (*self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Self::Aborted) => true,
            (Self::Fresh, Self::Active) => true,
            (Self::Fresh, Self::Resuming) => true,
            (Self::Resuming, Self::Active) => true,
            (Self::Active, Self::Complete) => true,
            _ => false,
        }
    }

    /// Performs a checked transition
    pub fn transition(self, next: SessionState) -> Result<SessionState, DumpError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DumpError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Resuming => "resuming",
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
        }
    }

    /// Returns all possible session states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Fresh,
            Self::Resuming,
            Self::Active,
            Self::Complete,
            Self::Aborted,
        ]
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!SessionState::Fresh.is_terminal());
        assert!(!SessionState::Resuming.is_terminal());
        assert!(!SessionState::Active.is_terminal());

        assert!(SessionState::Complete.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
    }

    #[test]
    fn test_happy_paths() {
        assert!(SessionState::Fresh.can_transition_to(SessionState::Active));
        assert!(SessionState::Fresh.can_transition_to(SessionState::Resuming));
        assert!(SessionState::Resuming.can_transition_to(SessionState::Active));
        assert!(SessionState::Active.can_transition_to(SessionState::Complete));
    }

    #[test]
    fn test_any_live_state_can_abort() {
        assert!(SessionState::Fresh.can_transition_to(SessionState::Aborted));
        assert!(SessionState::Resuming.can_transition_to(SessionState::Aborted));
        assert!(SessionState::Active.can_transition_to(SessionState::Aborted));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [SessionState::Complete, SessionState::Aborted] {
            for next in SessionState::all_states() {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} -> {} should be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_skipping_active_is_rejected() {
        assert!(!SessionState::Fresh.can_transition_to(SessionState::Complete));
        assert!(!SessionState::Resuming.can_transition_to(SessionState::Complete));
        assert!(!SessionState::Active.can_transition_to(SessionState::Resuming));
        assert!(!SessionState::Resuming.can_transition_to(SessionState::Fresh));
    }

    #[test]
    fn test_transition_error() {
        let err = SessionState::Complete
            .transition(SessionState::Active)
            .unwrap_err();
        assert!(matches!(
            err,
            DumpError::InvalidTransition {
                from: SessionState::Complete,
                to: SessionState::Active
            }
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SessionState::Fresh), "fresh");
        assert_eq!(format!("{}", SessionState::Aborted), "aborted");
    }
}
