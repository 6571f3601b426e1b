//! System-level error types (§0.2, §0.3).

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::actor::ActorError;
use crate::bus::TransportError;
use crate::marshal::MarshalError;

/// `actors.json` loading and cluster/resource declaration failures
/// (§0.3). Unknown top-level keys are rejected rather than silently
/// ignored, matching the "unknown keys → `ConfigError::Unknown`" note.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("unknown configuration key: {0}")]
    Unknown(String),

    #[error("unknown actor mode: {0}")]
    UnknownMode(String),

    #[error("unknown cluster: {0}")]
    UnknownCluster(String),

    #[error("no marshaller registered for type: {0}")]
    MissingMarshaller(String),

    #[error("cyclic resource dependency: {0}")]
    CyclicResource(String),

    #[error("failed to load configuration from {path}: {source}")]
    Load { path: String, source: String },
}

/// Top-level error returned by [`crate::system::ActorSystem`] operations,
/// aggregating every error domain the system touches via `#[from]`
/// (§0.2).
#[derive(Error, Debug, Clone)]
pub enum SystemError {
    #[error(transparent)]
    Actor(#[from] ActorError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("system has already been destroyed")]
    AlreadyDestroyed,

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SystemError {
    fn from(err: std::io::Error) -> Self {
        SystemError::Io(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn config_error_unknown_key_wording() {
        let err = ConfigError::Unknown("foo".to_string());
        assert_eq!(err.to_string(), "unknown configuration key: foo");
    }

    #[test]
    fn system_error_wraps_actor_error_transparently() {
        let err: SystemError = ActorError::NoHandler.into();
        assert_eq!(err.to_string(), "No handler for message");
    }
}
