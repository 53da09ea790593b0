//! API request types shared between server and clients.

use serde::{Deserialize, Serialize};

/// Request to initiate an upload session.
///
/// The caller identity comes from the transport layer (bearer credential),
/// not the body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitiateUploadRequest {
    /// Studio that will own the resulting asset.
    pub studio_id: String,
    /// Original file name.
    pub file_name: String,
    /// MIME content type.
    pub content_type: String,
    /// Declared total payload size in bytes.
    pub total_size: u64,
    /// Number of chunks the caller commits to sending.
    pub total_chunks: u32,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
}
