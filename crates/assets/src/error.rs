//! Asset store error types.

use thiserror::Error;

/// Asset store operation errors.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset rejected: {0}")]
    Rejected(String),

    #[error("asset store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for asset store operations.
pub type AssetResult<T> = std::result::Result<T, AssetError>;
