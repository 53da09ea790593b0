//! Health check handler.

use axum::Json;
use serde_json::{Value, json};

/// GET /v1/health - Liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
