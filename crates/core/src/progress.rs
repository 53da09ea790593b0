//! Read-side progress projection.
//!
//! Pure mapping from session state to the client-facing view. No side
//! effects and no authorization logic; the orchestrator enforces ownership
//! before this projection is computed.

use crate::session::UploadSession;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Client-facing view of an upload session's progress.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// The session identifier.
    pub session_id: String,
    /// Original file name.
    pub file_name: String,
    /// Declared total payload size in bytes.
    pub total_size: u64,
    /// Number of chunks the caller committed to sending.
    pub total_chunks: u32,
    /// Number of chunks received so far.
    pub uploaded_chunks: u32,
    /// Fraction of chunks received, in `[0.0, 1.0]`.
    pub progress: f64,
    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the session completed, if it has.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

/// Project a session into its progress descriptor.
pub fn project(session: &UploadSession) -> SessionDescriptor {
    let uploaded_chunks = session.received_count();
    SessionDescriptor {
        session_id: session.id.to_string(),
        file_name: session.file_name.clone(),
        total_size: session.total_size,
        total_chunks: session.total_chunks,
        uploaded_chunks,
        progress: f64::from(uploaded_chunks) / f64::from(session.total_chunks),
        created_at: session.created_at,
        completed_at: session.completed_at,
    }
}
