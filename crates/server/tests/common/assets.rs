//! Mock asset store for exercising the completion hand-off.

use async_trait::async_trait;
use backlot_assets::{AssetDescriptor, AssetError, AssetMetadata, AssetResult, AssetStore};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use time::OffsetDateTime;
use uuid::Uuid;

/// Asset store that records uploads and can simulate one outage.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockAssetStore {
    uploads: AtomicUsize,
    fail_next: AtomicBool,
}

#[allow(dead_code)]
impl MockAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful uploads so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Make the next upload fail with a transient error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn upload(&self, payload: Bytes, meta: &AssetMetadata) -> AssetResult<AssetDescriptor> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AssetError::Unavailable("simulated outage".to_string()));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(AssetDescriptor {
            asset_id: Uuid::new_v4(),
            file_name: meta.file_name.clone(),
            content_type: meta.content_type.clone(),
            size_bytes: payload.len() as u64,
            checksum: "0".repeat(64),
            stored_at: OffsetDateTime::now_utc(),
        })
    }
}
