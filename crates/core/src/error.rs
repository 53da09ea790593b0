//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid caller identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("total size {size} exceeds limit {limit}")]
    SizeExceeded { size: u64, limit: u64 },

    #[error("incomplete upload: {received} of {expected} chunks received")]
    Incomplete { received: u32, expected: u32 },

    #[error("corrupted upload: {0}")]
    Corrupted(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
