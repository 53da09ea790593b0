//! In-memory session store.

use crate::error::{StoreError, StoreResult};
use crate::store::{ChunkAdded, CompleteOutcome, SessionStore};
use async_trait::async_trait;
use backlot_core::{SessionId, UploadSession};
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::BTreeMap;
use time::OffsetDateTime;

struct MemoryEntry {
    session: UploadSession,
    chunks: BTreeMap<u32, Bytes>,
}

/// Session store backed by a concurrent in-memory map.
///
/// DashMap entry access holds the shard lock for the duration of a mutation,
/// which serializes chunk writes per session. Sessions do not survive a
/// process restart.
#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<SessionId, MemoryEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: &UploadSession) -> StoreResult<()> {
        match self.sessions.entry(session.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(session.id.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(MemoryEntry {
                    session: session.clone(),
                    chunks: BTreeMap::new(),
                });
                Ok(())
            }
        }
    }

    async fn get(&self, id: SessionId) -> StoreResult<Option<UploadSession>> {
        Ok(self.sessions.get(&id).map(|entry| entry.session.clone()))
    }

    async fn add_chunk(&self, id: SessionId, index: u32, bytes: Bytes) -> StoreResult<ChunkAdded> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if entry.session.is_completed() {
            return Err(StoreError::Completed(id.to_string()));
        }

        // Insert-if-absent: the first writer's bytes are kept.
        let duplicate = entry.chunks.contains_key(&index);
        if !duplicate {
            entry.chunks.insert(index, bytes);
            entry.session.received.insert(index);
        }

        Ok(ChunkAdded {
            duplicate,
            session: entry.session.clone(),
        })
    }

    async fn chunk_data(&self, id: SessionId) -> StoreResult<BTreeMap<u32, Bytes>> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(entry.chunks.clone())
    }

    async fn begin_complete(&self, id: SessionId) -> StoreResult<CompleteOutcome> {
        let mut entry = match self.sessions.get_mut(&id) {
            Some(entry) => entry,
            None => return Ok(CompleteOutcome::NotFound),
        };

        if entry.session.is_completed() {
            return Ok(CompleteOutcome::AlreadyCompleted);
        }
        if entry.session.completing {
            return Ok(CompleteOutcome::InProgress);
        }

        entry.session.completing = true;
        Ok(CompleteOutcome::Acquired(entry.session.clone()))
    }

    async fn finish_complete(
        &self,
        id: SessionId,
        completed_at: OffsetDateTime,
    ) -> StoreResult<()> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if entry.session.is_completed() {
            return Err(StoreError::Completed(id.to_string()));
        }

        entry.session.completed_at = Some(completed_at);
        entry.session.completing = false;
        Ok(())
    }

    async fn abort_complete(&self, id: SessionId) -> StoreResult<()> {
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            entry.session.completing = false;
        }
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> StoreResult<()> {
        self.sessions.remove(&id);
        Ok(())
    }

    async fn reclaimable_sessions(
        &self,
        completed_before: OffsetDateTime,
        created_before: OffsetDateTime,
        limit: u32,
    ) -> StoreResult<Vec<SessionId>> {
        let mut ids = Vec::new();
        for entry in self.sessions.iter() {
            if ids.len() >= limit as usize {
                break;
            }
            let session = &entry.session;
            let reclaimable = match session.completed_at {
                Some(completed_at) => completed_at < completed_before,
                None => !session.completing && session.created_at < created_before,
            };
            if reclaimable {
                ids.push(session.id);
            }
        }
        Ok(ids)
    }
}
