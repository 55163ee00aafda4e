//! Storage backend errors

use std::time::Duration;

/// Errors a storage backend can return
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation did not complete within the configured bound
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The in-memory store's lock was poisoned by a panicking writer
    #[error("In-memory store lock poisoned")]
    LockPoisoned,

    /// Stored data did not match the expected shape
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}
