//! Asset store abstraction and backends for Backlot.
//!
//! The asset store is the downstream home of a fully assembled upload. The
//! orchestrator hands it the merged payload exactly once per session; the
//! store verifies the payload, persists it atomically, and returns a
//! descriptor for the stored asset.

pub mod error;
pub mod filesystem;

pub use error::{AssetError, AssetResult};
pub use filesystem::FilesystemAssetStore;

use async_trait::async_trait;
use backlot_core::{StudioId, UploaderId};
use backlot_core::config::AssetStoreConfig;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Metadata accompanying an asset upload.
#[derive(Clone, Debug)]
pub struct AssetMetadata {
    /// Studio that owns the asset.
    pub studio_id: StudioId,
    /// Identity that uploaded the asset.
    pub uploader: UploaderId,
    /// Original file name.
    pub file_name: String,
    /// MIME content type.
    pub content_type: String,
    /// Declared payload size; the store rejects payloads that differ.
    pub size: u64,
    /// Optional free-form description.
    pub description: Option<String>,
}

/// Descriptor for a stored asset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Store-assigned asset identifier.
    pub asset_id: Uuid,
    /// Original file name.
    pub file_name: String,
    /// MIME content type.
    pub content_type: String,
    /// Stored payload size in bytes.
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the stored payload.
    pub checksum: String,
    /// When the asset was persisted.
    #[serde(with = "time::serde::rfc3339")]
    pub stored_at: OffsetDateTime,
}

/// Destination for assembled upload payloads.
#[async_trait]
pub trait AssetStore: Send + Sync + 'static {
    /// Persist an assembled payload.
    ///
    /// Rejects payloads whose length differs from `meta.size`. The write is
    /// atomic: a partially stored asset is never observable.
    async fn upload(&self, payload: Bytes, meta: &AssetMetadata) -> AssetResult<AssetDescriptor>;
}

/// Create an asset store from configuration.
pub async fn from_config(config: &AssetStoreConfig) -> AssetResult<Arc<dyn AssetStore>> {
    match config {
        AssetStoreConfig::Filesystem { path } => {
            let store = FilesystemAssetStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn AssetStore>)
        }
    }
}
