//! Application state shared across handlers.

use crate::expiry::ExpiryHandle;
use crate::orchestrator::UploadOrchestrator;
use backlot_assets::AssetStore;
use backlot_core::config::AppConfig;
use backlot_sessions::SessionStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Session store backend.
    pub sessions: Arc<dyn SessionStore>,
    /// Asset store backend.
    pub assets: Arc<dyn AssetStore>,
    /// Upload orchestrator.
    pub orchestrator: Arc<UploadOrchestrator>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        sessions: Arc<dyn SessionStore>,
        assets: Arc<dyn AssetStore>,
        expiry: ExpiryHandle,
    ) -> Self {
        let orchestrator = Arc::new(UploadOrchestrator::new(
            sessions.clone(),
            assets.clone(),
            config.server.session_limits(),
            config.server.completed_session_ttl(),
            expiry,
        ));

        Self {
            config: Arc::new(config),
            sessions,
            assets,
            orchestrator,
        }
    }
}
