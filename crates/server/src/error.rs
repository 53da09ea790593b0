//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backlot_assets::AssetError;
use backlot_sessions::StoreError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid caller identity: {0}")]
    InvalidCaller(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Unauthorized(String),

    #[error("upload already completed: {0}")]
    AlreadyCompleted(String),

    #[error("completion already in progress: {0}")]
    Conflict(String),

    #[error("incomplete upload: {received} of {expected} chunks received")]
    Incomplete { received: u32, expected: u32 },

    #[error("size {size} exceeds limit {limit}")]
    SizeExceeded { size: u64, limit: u64 },

    #[error("corrupted upload: {0}")]
    CorruptedUpload(String),

    #[error("asset store upload failed: {0}")]
    UploadFailed(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCaller(_) => "invalid_caller",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::AlreadyCompleted(_) => "already_completed",
            Self::Conflict(_) => "conflict",
            Self::Incomplete { .. } => "incomplete_upload",
            Self::SizeExceeded { .. } => "size_exceeded",
            Self::CorruptedUpload(_) => "corrupted_upload",
            Self::UploadFailed(_) => "upload_failed",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCaller(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::AlreadyCompleted(_) => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Incomplete { .. } => StatusCode::BAD_REQUEST,
            Self::SizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::CorruptedUpload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::AlreadyExists(id) => Self::Conflict(id),
            StoreError::Completed(id) => Self::AlreadyCompleted(id),
            StoreError::Database(_) | StoreError::Io(_) | StoreError::Internal(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        Self::UploadFailed(err.to_string())
    }
}

impl From<backlot_core::Error> for ApiError {
    fn from(err: backlot_core::Error) -> Self {
        match err {
            backlot_core::Error::InvalidIdentity(msg) => Self::InvalidCaller(msg),
            backlot_core::Error::InvalidSession(msg) => Self::BadRequest(msg),
            backlot_core::Error::SizeExceeded { size, limit } => Self::SizeExceeded { size, limit },
            backlot_core::Error::Incomplete { received, expected } => {
                Self::Incomplete { received, expected }
            }
            backlot_core::Error::Corrupted(msg) => Self::CorruptedUpload(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
