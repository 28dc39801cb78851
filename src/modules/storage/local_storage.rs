//! Local filesystem blob store
//!
//! Blobs are written below a root directory using the locator as the relative
//! path. The directory is served over HTTP under `public_base_url`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::core::config::LocalStorageConfig;
use crate::modules::storage::blob_store::{
    build_locator, strip_url_base, validate_locator, BlobDeletion, BlobStore, StorageError,
    StoredBlob,
};

#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDiskStorage {
    /// Create the storage, making sure the root directory exists
    pub async fn new(config: LocalStorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.root).await?;

        info!(
            "Local storage initialized at {} (served from {})",
            config.root.display(),
            config.public_base_url
        );

        Ok(Self {
            root: config.root,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Directory that holds the blobs
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, locator: &str) -> Result<PathBuf, StorageError> {
        validate_locator(locator)?;
        Ok(self.root.join(locator))
    }
}

#[async_trait]
impl BlobStore for LocalDiskStorage {
    async fn put(
        &self,
        data: Vec<u8>,
        content_type: &str,
        folder: &str,
        original_name: &str,
    ) -> Result<StoredBlob, StorageError> {
        let locator = build_locator(folder, original_name, content_type);
        let path = self.path_for(&locator)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &data).await?;

        debug!("Stored {} bytes at '{}'", data.len(), locator);

        Ok(StoredBlob {
            public_url: self.public_url(&locator),
            locator,
        })
    }

    async fn delete(&self, locator: &str) -> Result<BlobDeletion, StorageError> {
        let path = self.path_for(locator)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted local blob '{}'", locator);
                Ok(BlobDeletion::Deleted)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BlobDeletion::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, locator: &str) -> Result<bool, StorageError> {
        let path = self.path_for(locator)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn public_url(&self, locator: &str) -> String {
        format!("{}/{}", self.public_base_url, locator)
    }

    fn locator_from_url(&self, url: &str) -> Option<String> {
        strip_url_base(url, &self.public_base_url)
    }
}
