//! Upload control plane handlers.

use crate::auth::require_caller;
use crate::error::{ApiError, ApiResult};
use crate::orchestrator::ChunkReceipt;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use backlot_assets::AssetDescriptor;
use backlot_core::SessionId;
use backlot_core::api::InitiateUploadRequest;
use backlot_core::progress::SessionDescriptor;

/// Maximum request body size for initiate requests (64 KiB).
///
/// The body is metadata only; chunk bytes go through the chunk endpoint.
const MAX_INITIATE_BODY_SIZE: usize = 64 * 1024;

fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// POST /v1/uploads - Initiate a new upload session.
#[tracing::instrument(skip(state, req))]
pub async fn initiate_upload(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<SessionDescriptor>)> {
    let caller = require_caller(&req)?.clone();

    let body: InitiateUploadRequest = {
        let bytes = axum::body::to_bytes(req.into_body(), MAX_INITIATE_BODY_SIZE)
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))?
    };

    let descriptor = state.orchestrator.initiate(&caller.0, body).await?;
    Ok((StatusCode::CREATED, Json(descriptor)))
}

/// GET /v1/uploads/{session_id} - Fetch session progress.
#[tracing::instrument(skip(state, req), fields(session_id = %session_id))]
pub async fn get_upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    req: Request,
) -> ApiResult<Json<SessionDescriptor>> {
    let caller = require_caller(&req)?.clone();
    let id = parse_session_id(&session_id)?;
    let descriptor = state.orchestrator.status(&caller.0, id).await?;
    Ok(Json(descriptor))
}

/// PUT /v1/uploads/{session_id}/chunks/{index} - Store one chunk.
///
/// The body is the raw chunk bytes. Re-sending an already stored index
/// succeeds without overwriting; the response carries a `duplicate` flag.
#[tracing::instrument(skip(state, req), fields(session_id = %session_id, chunk_index = index))]
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, u32)>,
    req: Request,
) -> ApiResult<Json<ChunkReceipt>> {
    let caller = require_caller(&req)?.clone();
    let id = parse_session_id(&session_id)?;

    let limit = usize::try_from(state.config.server.max_total_size).unwrap_or(usize::MAX);
    let bytes = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read chunk body: {e}")))?;

    let receipt = state
        .orchestrator
        .upload_chunk(&caller.0, id, index, bytes)
        .await?;
    Ok(Json(receipt))
}

/// POST /v1/uploads/{session_id}/complete - Merge, verify, and store.
#[tracing::instrument(skip(state, req), fields(session_id = %session_id))]
pub async fn complete_upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    req: Request,
) -> ApiResult<Json<AssetDescriptor>> {
    let caller = require_caller(&req)?.clone();
    let id = parse_session_id(&session_id)?;
    let descriptor = state.orchestrator.complete(&caller.0, id).await?;
    Ok(Json(descriptor))
}

/// DELETE /v1/uploads/{session_id} - Cancel a session.
#[tracing::instrument(skip(state, req), fields(session_id = %session_id))]
pub async fn cancel_upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    req: Request,
) -> ApiResult<StatusCode> {
    let caller = require_caller(&req)?.clone();
    let id = parse_session_id(&session_id)?;
    state.orchestrator.cancel(&caller.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
