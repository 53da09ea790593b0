//! Session store error types.

use thiserror::Error;

/// Session store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session already exists: {0}")]
    AlreadyExists(String),

    #[error("session already completed: {0}")]
    Completed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for session store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
