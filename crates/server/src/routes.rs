//! Route configuration.

use crate::auth::identity_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Individual chunks can be as large as the declared payload, so the body
    // limit follows the configured size ceiling.
    let body_limit =
        usize::try_from(state.config.server.max_total_size).unwrap_or(usize::MAX);

    Router::new()
        // Health check (intentionally unauthenticated for load balancers)
        .route("/v1/health", get(handlers::health_check))
        // Upload control plane
        .route("/v1/uploads", post(handlers::initiate_upload))
        .route("/v1/uploads/{session_id}", get(handlers::get_upload))
        .route(
            "/v1/uploads/{session_id}/chunks/{index}",
            put(handlers::upload_chunk),
        )
        .route(
            "/v1/uploads/{session_id}/complete",
            post(handlers::complete_upload),
        )
        .route("/v1/uploads/{session_id}", delete(handlers::cancel_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        // Identity middleware (resolves CallerIdentity extension and trace span)
        .layer(middleware::from_fn(identity_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
