//! Session store trait.

use crate::error::StoreResult;
use async_trait::async_trait;
use backlot_core::{SessionId, UploadSession};
use bytes::Bytes;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Outcome of an `add_chunk` call.
#[derive(Clone, Debug)]
pub struct ChunkAdded {
    /// True if the index was already present; the original bytes were kept.
    pub duplicate: bool,
    /// The session after the write.
    pub session: UploadSession,
}

/// Outcome of a `begin_complete` call.
#[derive(Clone, Debug)]
pub enum CompleteOutcome {
    /// No session with that ID.
    NotFound,
    /// The session already completed; never re-process.
    AlreadyCompleted,
    /// Another completion attempt currently holds the gate.
    InProgress,
    /// This caller holds the gate; proceed with merge and store.
    Acquired(UploadSession),
}

/// Keyed store for upload session records and their chunk bytes.
///
/// Chunk writes must be serialized per session: two `add_chunk` calls racing
/// on the same session must both land (or one report `duplicate`), never
/// silently drop a write. Backends provide this via per-key locking or an
/// atomic insert-if-absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session. Fails if the ID already exists.
    async fn create(&self, session: &UploadSession) -> StoreResult<()>;

    /// Fetch a session by ID.
    async fn get(&self, id: SessionId) -> StoreResult<Option<UploadSession>>;

    /// Store chunk bytes at `index`, insert-if-absent.
    ///
    /// First writer wins: if the index is already present the call is a no-op
    /// reported as `duplicate` and the original bytes are never overwritten.
    /// Fails `Completed` for sessions that already completed.
    async fn add_chunk(&self, id: SessionId, index: u32, bytes: Bytes) -> StoreResult<ChunkAdded>;

    /// Load all received chunk bytes for a session, keyed by index.
    async fn chunk_data(&self, id: SessionId) -> StoreResult<BTreeMap<u32, Bytes>>;

    /// Atomically acquire the completion gate for a session.
    ///
    /// Exactly one concurrent caller observes `Acquired`; the gate stays held
    /// until `finish_complete` or `abort_complete`.
    async fn begin_complete(&self, id: SessionId) -> StoreResult<CompleteOutcome>;

    /// Mark a gated session completed. Sets `completed_at` at most once and
    /// releases the gate.
    async fn finish_complete(&self, id: SessionId, completed_at: OffsetDateTime)
        -> StoreResult<()>;

    /// Release the completion gate without completing, leaving the session
    /// otherwise unchanged so the caller can retry.
    async fn abort_complete(&self, id: SessionId) -> StoreResult<()>;

    /// Delete a session and its chunks.
    async fn delete(&self, id: SessionId) -> StoreResult<()>;

    /// Sessions eligible for reclamation: completed before `completed_before`,
    /// or never completed (and not mid-completion) and created before
    /// `created_before`.
    async fn reclaimable_sessions(
        &self,
        completed_before: OffsetDateTime,
        created_before: OffsetDateTime,
        limit: u32,
    ) -> StoreResult<Vec<SessionId>>;
}
