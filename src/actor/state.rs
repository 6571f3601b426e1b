// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::{ActorError, NotReadyReason};

/// The actor lifecycle state machine of §4.1:
/// `New → Ready → Destroying → Destroyed`, plus the sideband terminal
/// state `Crashed` reachable from `Ready`.
///
/// Transitions are monotonic — there is no path back to an earlier state,
/// `Crashed` included, matching §3's invariant that `state` transitions
/// along the state machine only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    New,
    Ready,
    Destroying,
    Destroyed,
    Crashed,
}

impl ActorState {
    /// `send`/`sendAndReceive` are only permitted in `Ready` (§4.1 Rules).
    pub fn require_ready(self) -> Result<(), ActorError> {
        match self {
            ActorState::Ready => Ok(()),
            ActorState::New => Err(ActorError::not_ready(NotReadyReason::New)),
            ActorState::Crashed => Err(ActorError::not_ready(NotReadyReason::Crashed)),
            ActorState::Destroying => Err(ActorError::not_ready(NotReadyReason::Destroying)),
            ActorState::Destroyed => Err(ActorError::not_ready(NotReadyReason::Destroyed)),
        }
    }

    /// `createChild` is allowed in `New` or `Ready` (§4.1 Rules).
    pub fn allows_create_child(self) -> bool {
        matches!(self, ActorState::New | ActorState::Ready)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ActorState::Destroyed | ActorState::Crashed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn ready_permits_dispatch() {
        assert!(ActorState::Ready.require_ready().is_ok());
    }

    #[test]
    fn new_rejects_dispatch_with_not_yet_initialized_message() {
        let err = ActorState::New.require_ready().unwrap_err();
        assert!(err.to_string().contains("not yet been initialized"));
    }

    #[test]
    fn crashed_destroying_destroyed_all_reject_dispatch() {
        assert!(ActorState::Crashed.require_ready().is_err());
        assert!(ActorState::Destroying.require_ready().is_err());
        assert!(ActorState::Destroyed.require_ready().is_err());
    }

    #[test]
    fn create_child_allowed_in_new_and_ready_only() {
        assert!(ActorState::New.allows_create_child());
        assert!(ActorState::Ready.allows_create_child());
        assert!(!ActorState::Destroying.allows_create_child());
        assert!(!ActorState::Destroyed.allows_create_child());
        assert!(!ActorState::Crashed.allows_create_child());
    }

    #[test]
    fn destroyed_and_crashed_are_terminal() {
        assert!(ActorState::Destroyed.is_terminal());
        assert!(ActorState::Crashed.is_terminal());
        assert!(!ActorState::Ready.is_terminal());
    }
}
