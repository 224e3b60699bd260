//! Persistence errors.
//!
//! These never cross the `Filesystem` interface — callers of the facade
//! only see failures inherent to the filesystem operation they requested.

use thiserror::Error;

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors internal to the persistence layer.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}
