//! Upload session aggregate and identifiers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for an upload session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::InvalidSession(format!("invalid session ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of the uploader.
///
/// Supplied by the external identity provider; this service only compares it
/// for equality. Must be non-empty.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploaderId(String);

impl UploaderId {
    /// Validate and wrap a caller identity.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::InvalidIdentity(
                "caller identity must not be empty".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UploaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploaderId({})", self.0)
    }
}

impl fmt::Display for UploaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of the studio that owns the uploaded asset.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudioId(String);

impl StudioId {
    /// Validate and wrap a studio identifier.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::InvalidSession(
                "studio id must not be empty".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StudioId({})", self.0)
    }
}

impl fmt::Display for StudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bounds applied when a session is initiated.
#[derive(Clone, Copy, Debug)]
pub struct SessionLimits {
    /// Maximum declared payload size in bytes.
    pub max_total_size: u64,
    /// Maximum number of chunks a session may declare.
    pub max_chunk_count: u32,
}

impl SessionLimits {
    /// Validate declared session dimensions against these limits.
    pub fn validate(&self, total_size: u64, total_chunks: u32) -> Result<()> {
        if total_size == 0 {
            return Err(Error::InvalidSession(
                "total_size must be positive".to_string(),
            ));
        }
        if total_size > self.max_total_size {
            return Err(Error::SizeExceeded {
                size: total_size,
                limit: self.max_total_size,
            });
        }
        if total_chunks == 0 {
            return Err(Error::InvalidSession(
                "total_chunks must be positive".to_string(),
            ));
        }
        if total_chunks > self.max_chunk_count {
            return Err(Error::InvalidSession(format!(
                "total_chunks {} exceeds maximum {}",
                total_chunks, self.max_chunk_count
            )));
        }
        Ok(())
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_total_size: crate::DEFAULT_MAX_TOTAL_SIZE,
            max_chunk_count: crate::DEFAULT_MAX_CHUNK_COUNT,
        }
    }
}

/// An upload session tracking resumable upload state.
///
/// Chunk bytes live in the session store backend; the aggregate carries the
/// set of received indices so progress can be projected without loading data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Studio that owns the resulting asset.
    pub studio_id: StudioId,
    /// The only identity permitted to read or mutate this session.
    pub uploader: UploaderId,
    /// Original file name.
    pub file_name: String,
    /// MIME content type.
    pub content_type: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Declared total payload size in bytes.
    pub total_size: u64,
    /// Number of chunks the caller committed to sending.
    pub total_chunks: u32,
    /// Indices of chunks received so far.
    pub received: BTreeSet<u32>,
    /// Whether a completion attempt currently holds the gate.
    pub completing: bool,
    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When merge-and-store succeeded; set at most once.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl UploadSession {
    /// Create a new open session with no chunks received.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        studio_id: StudioId,
        uploader: UploaderId,
        file_name: String,
        content_type: String,
        description: Option<String>,
        total_size: u64,
        total_chunks: u32,
    ) -> Self {
        Self {
            id: SessionId::new(),
            studio_id,
            uploader,
            file_name,
            content_type,
            description,
            total_size,
            total_chunks,
            received: BTreeSet::new(),
            completing: false,
            created_at: OffsetDateTime::now_utc(),
            completed_at: None,
        }
    }

    /// Number of chunks received so far.
    pub fn received_count(&self) -> u32 {
        self.received.len() as u32
    }

    /// Whether every declared chunk index has been received.
    pub fn has_all_chunks(&self) -> bool {
        self.received_count() == self.total_chunks
    }

    /// Whether the session reached its terminal completed state.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Whether `index` is a valid chunk index for this session.
    pub fn index_in_range(&self, index: u32) -> bool {
        index < self.total_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session(total_size: u64, total_chunks: u32) -> UploadSession {
        UploadSession::new(
            StudioId::parse("studio-1").unwrap(),
            UploaderId::parse("uploader-1").unwrap(),
            "reel.mp4".to_string(),
            "video/mp4".to_string(),
            None,
            total_size,
            total_chunks,
        )
    }

    #[test]
    fn session_id_roundtrip() {
        let id = SessionId::new();
        let parsed = SessionId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(SessionId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn uploader_id_rejects_blank() {
        assert!(UploaderId::parse("").is_err());
        assert!(UploaderId::parse("   ").is_err());
        let id = UploaderId::parse("studio-bot").unwrap();
        assert_eq!(id.as_str(), "studio-bot");
    }

    #[test]
    fn studio_id_rejects_blank() {
        assert!(StudioId::parse("").is_err());
        assert_eq!(StudioId::parse("acme").unwrap().as_str(), "acme");
    }

    #[test]
    fn limits_validate_dimensions() {
        let limits = SessionLimits {
            max_total_size: 100,
            max_chunk_count: 4,
        };
        limits.validate(100, 4).unwrap();
        assert!(limits.validate(0, 1).is_err());
        assert!(limits.validate(10, 0).is_err());
        assert!(limits.validate(10, 5).is_err());
        match limits.validate(101, 1) {
            Err(Error::SizeExceeded { size: 101, limit: 100 }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn new_session_starts_empty_and_open() {
        let session = sample_session(15, 3);
        assert_eq!(session.received_count(), 0);
        assert!(!session.has_all_chunks());
        assert!(!session.is_completed());
        assert!(session.index_in_range(2));
        assert!(!session.index_in_range(3));
    }

    #[test]
    fn received_count_tracks_indices() {
        let mut session = sample_session(15, 3);
        session.received.insert(1);
        session.received.insert(0);
        session.received.insert(1);
        assert_eq!(session.received_count(), 2);
        session.received.insert(2);
        assert!(session.has_all_chunks());
    }
}
