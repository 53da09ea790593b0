//! Session store abstraction and backends for Backlot.
//!
//! This crate provides the control-plane data model for resumable uploads:
//! - Session records with chunk tracking
//! - Atomic chunk insert-if-absent
//! - The completion gate that admits exactly one merge attempt
//! - Reclamation queries for the expiry scheduler

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{ChunkAdded, CompleteOutcome, SessionStore};

use backlot_core::config::SessionStoreConfig;
use std::sync::Arc;

/// Create a session store from configuration.
pub async fn from_config(config: &SessionStoreConfig) -> StoreResult<Arc<dyn SessionStore>> {
    match config {
        SessionStoreConfig::Memory => Ok(Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>),
        SessionStoreConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn SessionStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_sqlite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("sessions.db");
        let config = SessionStoreConfig::Sqlite {
            path: db_path.clone(),
        };

        let store = from_config(&config).await.unwrap();
        assert!(store.get(backlot_core::SessionId::new()).await.unwrap().is_none());
        assert!(db_path.exists());
    }
}
