//! Error types for the storage boundary.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur at the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed or timed out.
    #[error("storage error: {0}")]
    Storage(String),

    /// A referenced row is missing where the schema guarantees it.
    #[error("inconsistent store: {0}")]
    Inconsistent(String),

    /// Serialization round-trip failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
