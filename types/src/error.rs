//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for the Agora workspace.
#[derive(Debug, Error)]
pub enum AgoraError {
    #[error("invalid identity: {0:?}")]
    InvalidIdentity(String),

    #[error("invalid governance parameters: {0}")]
    InvalidParams(String),

    #[error("governance error: {0}")]
    Governance(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}
