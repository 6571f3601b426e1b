// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

/// Encoder/decoder failures in the marshaller pipeline (§7
/// `marshal-error`).
#[derive(Error, Debug, Clone)]
pub enum MarshalError {
    #[error("no marshaller registered for type {0}")]
    NoMarshallerFor(String),

    #[error("marshal failed: {0}")]
    Encode(String),

    #[error("unmarshal failed: {0}")]
    Decode(String),
}
