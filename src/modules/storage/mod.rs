//! Storage module for uploaded file bytes
//!
//! Exposes the `BlobStore` capability and its two implementations: local disk
//! and MinIO/S3. The backend is chosen from configuration at startup.

mod blob_store;
mod local_storage;
mod minio_client;

use std::sync::Arc;

pub use blob_store::{build_locator, BlobDeletion, BlobStore, StorageError, StoredBlob};
#[cfg(test)]
pub(crate) use blob_store::strip_url_base;
pub use local_storage::LocalDiskStorage;
pub use minio_client::MinIOClient;

use crate::core::config::{StorageBackend, StorageConfig};

/// Build the blob store selected by `STORAGE_BACKEND`
pub async fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.backend {
        StorageBackend::Local => {
            let storage = LocalDiskStorage::new(config.local.clone()).await?;
            Ok(Arc::new(storage))
        }
        StorageBackend::MinIO => {
            let client = MinIOClient::new(config.minio.clone()).await?;
            tracing::info!("Using MinIO bucket: {}", client.bucket_name());
            Ok(Arc::new(client))
        }
    }
}
