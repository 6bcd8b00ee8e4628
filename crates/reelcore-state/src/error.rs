//! State store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("workflow already exists: {0}")]
    AlreadyExists(String),

    #[error("workflow not found: {0}")]
    NotFound(String),

    /// Backing store unreachable. Per spec §4.1's failure-mode note, the
    /// orchestration core fails fast on this rather than retrying.
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to (de)serialize workflow context: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StateResult<T> = std::result::Result<T, StateError>;
