//! Server test utilities.

use crate::common::assets::MockAssetStore;
use backlot_assets::{AssetStore, FilesystemAssetStore};
use backlot_core::config::{AppConfig, AssetStoreConfig, SessionStoreConfig};
use backlot_server::{AppState, ExpiryHandle, ExpiryScheduler, create_router};
use backlot_sessions::{SessionStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub mock_assets: Option<Arc<MockAssetStore>>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server with a filesystem asset store.
    pub async fn new() -> Self {
        Self::build(None, |_| {}).await
    }

    /// Create a test server whose asset store is the observable mock.
    pub async fn with_mock_assets() -> Self {
        Self::build(Some(Arc::new(MockAssetStore::new())), |_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::build(None, modifier).await
    }

    async fn build<F>(mock_assets: Option<Arc<MockAssetStore>>, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let db_path = temp_dir.path().join("sessions.db");
        let sessions: Arc<dyn SessionStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create session store"),
        );

        let asset_path = temp_dir.path().join("assets");
        let assets: Arc<dyn AssetStore> = match &mock_assets {
            Some(mock) => mock.clone(),
            None => Arc::new(
                FilesystemAssetStore::new(&asset_path)
                    .await
                    .expect("Failed to create asset store"),
            ),
        };

        let mut config = AppConfig {
            server: Default::default(),
            sessions: SessionStoreConfig::Sqlite { path: db_path },
            assets: AssetStoreConfig::Filesystem { path: asset_path },
        };
        modifier(&mut config);

        let expiry = Self::expiry_handle(&sessions, &config);
        let state = AppState::new(config, sessions, assets, expiry);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            mock_assets,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the session store.
    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.state.sessions.clone()
    }

    /// Build an expiry handle without spawning the scheduler loop.
    /// Scheduling is best-effort; tests drive reclamation via sweep_once.
    fn expiry_handle(sessions: &Arc<dyn SessionStore>, config: &AppConfig) -> ExpiryHandle {
        let (_scheduler, handle) = ExpiryScheduler::new(sessions.clone(), &config.server);
        handle
    }
}
