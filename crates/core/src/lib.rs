//! Core domain types and shared logic for the Backlot upload service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Session and caller identifiers
//! - The upload session aggregate and its lifecycle
//! - Merge-and-verify assembly of chunked payloads
//! - Progress projection for clients
//! - API request types and configuration

pub mod api;
pub mod config;
pub mod error;
pub mod merge;
pub mod progress;
pub mod session;

pub use api::InitiateUploadRequest;
pub use error::{Error, Result};
pub use merge::merge_chunks;
pub use progress::{SessionDescriptor, project};
pub use session::{SessionId, SessionLimits, StudioId, UploadSession, UploaderId};

/// Default cap on the assembled payload size: 2 GiB.
///
/// The merge step materializes the full payload in one contiguous buffer, so
/// this bound is checked before any allocation is attempted.
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Default cap on the number of chunks a single session may declare.
pub const DEFAULT_MAX_CHUNK_COUNT: u32 = 10_000;
