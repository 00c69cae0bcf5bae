/// Target state definitions for tracking mirror progress
///
/// This module defines all possible states a crawl target can be in during a
/// mirror run.
use std::fmt;

/// Represents the current state of a crawl target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    // ===== Active States =====
    /// Target has been referenced but filters have not been applied yet
    Discovered,

    /// Target passed all filters and is waiting to be fetched
    Queued,

    /// Target is currently being fetched
    Fetching,

    // ===== Terminal Skip States =====
    /// Target was excluded by a filter (rejected extension, excluded
    /// directory, or foreign host) and will never be fetched
    FilteredOut,

    // ===== Terminal Success States =====
    /// Target was fetched and written to its local path
    Fetched,

    // ===== Terminal Error States =====
    /// Target fetch failed permanently (network error, bad status, write error)
    Failed,
}

impl TargetState {
    /// Returns true if this is a terminal state (no further processing needed)
    ///
    /// Active states (Discovered, Queued, Fetching) are not terminal.
    /// All other states are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Discovered | Self::Queued | Self::Fetching)
    }

    /// Returns true if this is an active state (target may still be fetched)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Discovered | Self::Queued | Self::Fetching)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched)
    }

    /// Returns true if this target was skipped by a filter
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::FilteredOut)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true if the transition from this state to `next` is valid
    ///
    /// Discovery resolves into Queued or FilteredOut, a queued target may be
    /// claimed for fetching, and a fetch ends in Fetched or Failed. Terminal
    /// states never transition.
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Queued)
                | (Self::Discovered, Self::FilteredOut)
                | (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Fetched)
                | (Self::Fetching, Self::Failed)
        )
    }

    /// Converts the target state to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::FilteredOut => "filtered_out",
            Self::Fetched => "fetched",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible target states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Discovered,
            Self::Queued,
            Self::Fetching,
            Self::FilteredOut,
            Self::Fetched,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        // Active states are not terminal
        assert!(!TargetState::Discovered.is_terminal());
        assert!(!TargetState::Queued.is_terminal());
        assert!(!TargetState::Fetching.is_terminal());

        // All other states are terminal
        assert!(TargetState::FilteredOut.is_terminal());
        assert!(TargetState::Fetched.is_terminal());
        assert!(TargetState::Failed.is_terminal());
    }

    #[test]
    fn test_is_active() {
        assert!(TargetState::Discovered.is_active());
        assert!(TargetState::Queued.is_active());
        assert!(TargetState::Fetching.is_active());

        assert!(!TargetState::Fetched.is_active());
        assert!(!TargetState::Failed.is_active());
    }

    #[test]
    fn test_is_success() {
        assert!(TargetState::Fetched.is_success());

        assert!(!TargetState::Discovered.is_success());
        assert!(!TargetState::Failed.is_success());
        assert!(!TargetState::FilteredOut.is_success());
    }

    #[test]
    fn test_is_skipped() {
        assert!(TargetState::FilteredOut.is_skipped());

        assert!(!TargetState::Fetched.is_skipped());
        assert!(!TargetState::Failed.is_skipped());
    }

    #[test]
    fn test_is_error() {
        assert!(TargetState::Failed.is_error());

        assert!(!TargetState::Fetched.is_error());
        assert!(!TargetState::FilteredOut.is_error());
        assert!(!TargetState::Discovered.is_error());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(TargetState::Discovered.can_transition_to(TargetState::Queued));
        assert!(TargetState::Discovered.can_transition_to(TargetState::FilteredOut));
        assert!(TargetState::Queued.can_transition_to(TargetState::Fetching));
        assert!(TargetState::Fetching.can_transition_to(TargetState::Fetched));
        assert!(TargetState::Fetching.can_transition_to(TargetState::Failed));
    }

    #[test]
    fn test_invalid_transitions() {
        // Filters are applied before queueing, never after
        assert!(!TargetState::Queued.can_transition_to(TargetState::FilteredOut));
        assert!(!TargetState::Fetching.can_transition_to(TargetState::FilteredOut));

        // Fetching requires a prior claim
        assert!(!TargetState::Discovered.can_transition_to(TargetState::Fetching));

        // Terminal states never transition
        for terminal in [
            TargetState::FilteredOut,
            TargetState::Fetched,
            TargetState::Failed,
        ] {
            for next in TargetState::all_states() {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} should not transition to {}",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_as_str() {
        assert_eq!(TargetState::Discovered.as_str(), "discovered");
        assert_eq!(TargetState::Queued.as_str(), "queued");
        assert_eq!(TargetState::Fetching.as_str(), "fetching");
        assert_eq!(TargetState::FilteredOut.as_str(), "filtered_out");
        assert_eq!(TargetState::Fetched.as_str(), "fetched");
        assert_eq!(TargetState::Failed.as_str(), "failed");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TargetState::Discovered), "discovered");
        assert_eq!(format!("{}", TargetState::Fetched), "fetched");
        assert_eq!(format!("{}", TargetState::FilteredOut), "filtered_out");
    }

    #[test]
    fn test_all_states_complete() {
        let all = TargetState::all_states();
        assert_eq!(all.len(), 6);

        // Verify no duplicates
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "Duplicate state found");
            }
        }
    }
}
