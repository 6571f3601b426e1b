// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

/// Bus-level failures (§0.2), always wrapped by callers into
/// `ActorError::Transport` before reaching application code.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("peer endpoint closed or unreachable: {0}")]
    PeerUnreachable(String),

    #[error("envelope framing error: {0}")]
    Framing(String),

    #[error("handle transfer is not supported on this bus")]
    HandleTransferUnsupported,

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}
