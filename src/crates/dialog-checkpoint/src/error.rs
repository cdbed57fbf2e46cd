//! Error types for checkpoint operations.

use thiserror::Error;

/// Convenience result type using [`CheckpointError`].
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur while saving or loading checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The requested thread has no stored checkpoint.
    #[error("No checkpoint found for thread '{0}'")]
    NotFound(String),

    /// The request was malformed (e.g. empty thread id).
    #[error("Invalid checkpoint request: {0}")]
    Invalid(String),

    /// The graph state could not be serialized or deserialized.
    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific storage failure.
    #[error("Checkpoint storage error: {0}")]
    Storage(String),
}
