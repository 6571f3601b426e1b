// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::ActorId;

/// The error kinds §7 enumerates, returned by `send`/`sendAndReceive` and
/// every lifecycle operation built on top of them.
#[derive(Error, Debug, Clone)]
pub enum ActorError {
    /// Operation invoked outside `Ready`. The message text depends on the
    /// state the actor was actually in, matching §7 and the literal
    /// wording §8 tests against (`"Actor has not yet been initialized"`).
    #[error("{0}")]
    NotReady(NotReadyReason),

    /// Topic has no handler and no forwarding match.
    #[error("No handler for message")]
    NoHandler,

    /// The user handler itself returned an error.
    #[error("{0}")]
    Handler(String),

    /// The bus failed to deliver, or the peer exited.
    #[error("transport error: {0}")]
    Transport(String),

    /// A `sendAndReceive` deadline elapsed before a response arrived.
    #[error("Response timed out.")]
    Timeout,

    /// System/resource/marshaller configuration problem.
    #[error("config error: {0}")]
    Config(String),

    /// Encoder/decoder failure in the marshaller pipeline.
    #[error("marshal error: {0}")]
    Marshal(String),
}

/// Why an operation was rejected for not being in `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    New,
    Crashed,
    Destroying,
    Destroyed,
}

impl std::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotReadyReason::New => write!(f, "Actor has not yet been initialized"),
            NotReadyReason::Crashed => write!(f, "Actor has crashed"),
            NotReadyReason::Destroying => write!(f, "Actor is being destroyed"),
            NotReadyReason::Destroyed => write!(f, "Actor has been destroyed"),
        }
    }
}

impl ActorError {
    pub fn not_ready(reason: NotReadyReason) -> Self {
        ActorError::NotReady(reason)
    }

    /// Identify the actor a transport failure originated from, for
    /// logging call sites that want to attach the id without threading it
    /// through every error path.
    pub fn transport_for(actor_id: ActorId, cause: impl std::fmt::Display) -> Self {
        ActorError::Transport(format!("actor {actor_id}: {cause}"))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ActorError::Timeout)
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, ActorError::NotReady(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_new_matches_spec_wording() {
        let err = ActorError::not_ready(NotReadyReason::New);
        assert!(err.to_string().contains("Actor has not yet been initialized"));
    }

    #[test]
    fn no_handler_matches_spec_wording() {
        assert_eq!(ActorError::NoHandler.to_string(), "No handler for message");
    }

    #[test]
    fn timeout_matches_spec_wording() {
        assert_eq!(ActorError::Timeout.to_string(), "Response timed out.");
    }

    #[test]
    fn is_timeout_and_is_not_ready_helpers() {
        assert!(ActorError::Timeout.is_timeout());
        assert!(!ActorError::NoHandler.is_timeout());
        assert!(ActorError::not_ready(NotReadyReason::Crashed).is_not_ready());
        assert!(!ActorError::NoHandler.is_not_ready());
    }
}
