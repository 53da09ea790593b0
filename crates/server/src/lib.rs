//! HTTP API server for Backlot.
//!
//! This crate provides the upload control plane:
//! - Upload session management
//! - Chunk upload endpoints
//! - Completion with merge verification and asset hand-off
//! - Session expiry and reclamation

pub mod auth;
pub mod error;
pub mod expiry;
pub mod handlers;
pub mod orchestrator;
pub mod routes;
pub mod state;

pub use auth::{CallerIdentity, TraceId};
pub use error::ApiError;
pub use expiry::{ExpiryHandle, ExpiryScheduler};
pub use orchestrator::UploadOrchestrator;
pub use routes::create_router;
pub use state::AppState;
