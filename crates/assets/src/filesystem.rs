//! Local filesystem asset store.

use crate::error::{AssetError, AssetResult};
use crate::{AssetDescriptor, AssetMetadata, AssetStore};
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Filesystem-backed asset store.
///
/// Assets land under `<root>/<studio_id>/<asset_id>`, written to a temp file
/// and renamed so a crash mid-write never leaves a partial asset visible.
pub struct FilesystemAssetStore {
    root: PathBuf,
}

impl FilesystemAssetStore {
    /// Create a new filesystem asset store rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> AssetResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }
}

#[async_trait]
impl AssetStore for FilesystemAssetStore {
    #[instrument(skip(self, payload), fields(backend = "filesystem", size = payload.len()))]
    async fn upload(&self, payload: Bytes, meta: &AssetMetadata) -> AssetResult<AssetDescriptor> {
        if payload.len() as u64 != meta.size {
            return Err(AssetError::Rejected(format!(
                "payload is {} bytes, metadata declares {}",
                payload.len(),
                meta.size
            )));
        }

        let checksum = hex::encode(Sha256::digest(&payload));
        let asset_id = Uuid::new_v4();

        let dir = self.root.join(meta.studio_id.as_str());
        fs::create_dir_all(&dir).await?;

        let final_path = dir.join(asset_id.to_string());
        let temp_path = dir.join(format!(".tmp.{asset_id}"));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&payload).await?;
            // Flush to disk before the rename makes the asset visible.
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &final_path).await?;

        Ok(AssetDescriptor {
            asset_id,
            file_name: meta.file_name.clone(),
            content_type: meta.content_type.clone(),
            size_bytes: meta.size,
            checksum,
            stored_at: OffsetDateTime::now_utc(),
        })
    }
}
