//! Invocation phase machine.

use thiserror::Error;

/// Where an invocation is in the connect/shell/run/capture lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Authenticating against the endpoint.
    #[default]
    Connecting,
    /// Session established, no shell yet.
    Connected,
    /// Remote shell open.
    ShellOpen,
    /// Command submitted (or submission attempted).
    Running,
    /// Reading stdout.
    Capturing,
    /// Closing shell and session.
    Releasing,
    /// Nothing left to release.
    Finished,
}

/// Rejected phase change.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid phase transition from {from:?} to {to:?}")]
pub struct PhaseError {
    pub from: Phase,
    pub to: Phase,
}

impl Phase {
    /// Check if transition to target phase is valid.
    ///
    /// Valid transitions:
    /// - Connecting -> Connected | Finished
    /// - Connected -> ShellOpen | Releasing
    /// - ShellOpen -> Running | Releasing
    /// - Running -> Capturing | Releasing
    /// - Capturing -> Releasing
    /// - Releasing -> Finished
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!(
            (*self, target),
            (Connecting, Connected)
                | (Connecting, Finished)
                | (Connected, ShellOpen)
                | (Connected, Releasing)
                | (ShellOpen, Running)
                | (ShellOpen, Releasing)
                | (Running, Capturing)
                | (Running, Releasing)
                | (Capturing, Releasing)
                | (Releasing, Finished)
        )
    }

    /// Attempt to move to `target`, leaving `self` unchanged on failure.
    pub fn transition_to(&mut self, target: Phase) -> Result<(), PhaseError> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(PhaseError {
                from: *self,
                to: target,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut phase = Phase::default();
        for next in [
            Phase::Connected,
            Phase::ShellOpen,
            Phase::Running,
            Phase::Capturing,
            Phase::Releasing,
            Phase::Finished,
        ] {
            assert!(phase.transition_to(next).is_ok());
            assert_eq!(phase, next);
        }
        assert_eq!(phase, Phase::Finished);
    }

    #[test]
    fn test_connect_failure_goes_straight_to_finished() {
        let mut phase = Phase::Connecting;
        assert!(phase.transition_to(Phase::Finished).is_ok());
        assert_eq!(phase, Phase::Finished);
    }

    #[test]
    fn test_cannot_skip_release() {
        let mut phase = Phase::Capturing;
        let err = phase.transition_to(Phase::Finished).unwrap_err();
        assert_eq!(err.from, Phase::Capturing);
        assert_eq!(err.to, Phase::Finished);
        assert_eq!(phase, Phase::Capturing);
    }

    #[test]
    fn test_invalid_from_finished() {
        let mut phase = Phase::Finished;
        assert!(phase.transition_to(Phase::Connecting).is_err());
        assert!(phase.transition_to(Phase::Releasing).is_err());
    }
}
