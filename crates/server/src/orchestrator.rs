//! Upload orchestration.
//!
//! Every mutation of an upload session flows through the orchestrator: it
//! verifies ownership, validates inputs against configured limits, drives the
//! session store, and hands completed payloads to the asset store exactly
//! once per session.

use crate::error::{ApiError, ApiResult};
use crate::expiry::ExpiryHandle;
use backlot_assets::{AssetDescriptor, AssetMetadata, AssetStore};
use backlot_core::api::InitiateUploadRequest;
use backlot_core::progress::{self, SessionDescriptor};
use backlot_core::{SessionId, SessionLimits, StudioId, UploadSession, UploaderId, merge_chunks};
use backlot_sessions::{CompleteOutcome, SessionStore};
use bytes::Bytes;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// Outcome of a chunk upload, carrying the refreshed progress view.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ChunkReceipt {
    /// True if this index had already been received; the original bytes were kept.
    pub duplicate: bool,
    /// Progress after the write.
    #[serde(flatten)]
    pub session: SessionDescriptor,
}

/// Coordinates session mutations and the completion hand-off.
pub struct UploadOrchestrator {
    sessions: Arc<dyn SessionStore>,
    assets: Arc<dyn AssetStore>,
    limits: SessionLimits,
    completed_ttl: Duration,
    expiry: ExpiryHandle,
}

impl UploadOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        assets: Arc<dyn AssetStore>,
        limits: SessionLimits,
        completed_ttl: Duration,
        expiry: ExpiryHandle,
    ) -> Self {
        Self {
            sessions,
            assets,
            limits,
            completed_ttl,
            expiry,
        }
    }

    /// Initiate a new upload session for `caller`.
    #[tracing::instrument(skip(self, req), fields(studio_id = %req.studio_id))]
    pub async fn initiate(
        &self,
        caller: &UploaderId,
        req: InitiateUploadRequest,
    ) -> ApiResult<SessionDescriptor> {
        let studio_id = StudioId::parse(&req.studio_id)?;
        self.limits.validate(req.total_size, req.total_chunks)?;

        let session = UploadSession::new(
            studio_id,
            caller.clone(),
            req.file_name,
            req.content_type,
            req.description,
            req.total_size,
            req.total_chunks,
        );
        self.sessions.create(&session).await?;

        tracing::info!(
            session_id = %session.id,
            total_size = session.total_size,
            total_chunks = session.total_chunks,
            "Upload session created"
        );
        Ok(progress::project(&session))
    }

    /// Fetch the progress view of a session owned by `caller`.
    pub async fn status(&self, caller: &UploaderId, id: SessionId) -> ApiResult<SessionDescriptor> {
        let session = self.require_owned(caller, id).await?;
        Ok(progress::project(&session))
    }

    /// Store one chunk of a session owned by `caller`.
    ///
    /// Re-sends of an already received index are acknowledged without
    /// overwriting the stored bytes, so clients can retry blindly.
    #[tracing::instrument(skip(self, bytes), fields(session_id = %id, chunk_index = index, size = bytes.len()))]
    pub async fn upload_chunk(
        &self,
        caller: &UploaderId,
        id: SessionId,
        index: u32,
        bytes: Bytes,
    ) -> ApiResult<ChunkReceipt> {
        let session = self.require_owned(caller, id).await?;

        if session.is_completed() {
            return Err(ApiError::AlreadyCompleted(id.to_string()));
        }
        if !session.index_in_range(index) {
            return Err(ApiError::BadRequest(format!(
                "chunk index {index} out of range, session has {} chunks",
                session.total_chunks
            )));
        }
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("chunk body must not be empty".to_string()));
        }
        if bytes.len() as u64 > session.total_size {
            return Err(ApiError::BadRequest(format!(
                "chunk of {} bytes exceeds declared total size {}",
                bytes.len(),
                session.total_size
            )));
        }

        let added = self.sessions.add_chunk(id, index, bytes).await?;
        if added.duplicate {
            tracing::debug!(session_id = %id, chunk_index = index, "Duplicate chunk acknowledged");
        }

        Ok(ChunkReceipt {
            duplicate: added.duplicate,
            session: progress::project(&added.session),
        })
    }

    /// Complete a session owned by `caller`: merge, verify, and store.
    ///
    /// The completion gate in the session store admits exactly one concurrent
    /// attempt, so the asset store sees at most one upload per session. A
    /// failed hand-off releases the gate and leaves the session retriable.
    #[tracing::instrument(skip(self), fields(session_id = %id))]
    pub async fn complete(&self, caller: &UploaderId, id: SessionId) -> ApiResult<AssetDescriptor> {
        // Ownership first so a foreign caller can never flip the gate.
        self.require_owned(caller, id).await?;

        let session = match self.sessions.begin_complete(id).await? {
            CompleteOutcome::NotFound => return Err(ApiError::NotFound(id.to_string())),
            CompleteOutcome::AlreadyCompleted => {
                return Err(ApiError::AlreadyCompleted(id.to_string()));
            }
            CompleteOutcome::InProgress => {
                return Err(ApiError::Conflict(format!(
                    "completion already in progress for session {id}"
                )));
            }
            CompleteOutcome::Acquired(session) => session,
        };

        if !session.has_all_chunks() {
            self.sessions.abort_complete(id).await?;
            return Err(ApiError::Incomplete {
                received: session.received_count(),
                expected: session.total_chunks,
            });
        }

        let chunks = self.sessions.chunk_data(id).await?;
        let payload = match merge_chunks(session.total_size, session.total_chunks, &chunks) {
            Ok(payload) => payload,
            Err(err) => {
                // Merge failures are deterministic, but releasing the gate
                // keeps the session inspectable rather than wedged.
                self.sessions.abort_complete(id).await?;
                tracing::warn!(session_id = %id, error = %err, "Merge verification failed");
                return Err(err.into());
            }
        };

        let meta = AssetMetadata {
            studio_id: session.studio_id.clone(),
            uploader: session.uploader.clone(),
            file_name: session.file_name.clone(),
            content_type: session.content_type.clone(),
            size: session.total_size,
            description: session.description.clone(),
        };

        let descriptor = match self.assets.upload(payload, &meta).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.sessions.abort_complete(id).await?;
                tracing::error!(session_id = %id, error = %err, "Asset store upload failed");
                return Err(err.into());
            }
        };

        let completed_at = OffsetDateTime::now_utc();
        self.sessions.finish_complete(id, completed_at).await?;
        self.expiry.schedule(id, completed_at + self.completed_ttl);

        tracing::info!(
            session_id = %id,
            asset_id = %descriptor.asset_id,
            size = descriptor.size_bytes,
            "Upload completed"
        );
        Ok(descriptor)
    }

    /// Cancel a session owned by `caller`, discarding all received chunks.
    #[tracing::instrument(skip(self), fields(session_id = %id))]
    pub async fn cancel(&self, caller: &UploaderId, id: SessionId) -> ApiResult<()> {
        self.require_owned(caller, id).await?;
        self.sessions.delete(id).await?;
        tracing::info!(session_id = %id, "Upload session cancelled");
        Ok(())
    }

    /// Load a session and verify `caller` owns it.
    ///
    /// Ownership failures are logged as access-control events, distinct
    /// from ordinary validation errors.
    async fn require_owned(&self, caller: &UploaderId, id: SessionId) -> ApiResult<UploadSession> {
        let session = self
            .sessions
            .get(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;

        if session.uploader != *caller {
            tracing::warn!(
                session_id = %id,
                caller = %caller,
                owner = %session.uploader,
                "Access denied: caller does not own session"
            );
            return Err(ApiError::Unauthorized(format!(
                "session {id} belongs to a different caller"
            )));
        }
        Ok(session)
    }
}
