//! Blob store abstraction
//!
//! A blob store holds the bytes of uploaded files. Each blob is addressed by an
//! opaque locator; the public URL is always derivable from the locator.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::upload::extension_for_mime;
use crate::shared::validation::{sanitize_file_stem, sanitize_folder};

/// Result of a successful `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Key used to address the blob inside the store
    pub locator: String,
    /// Address clients use to download the blob
    pub public_url: String,
}

/// Outcome of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobDeletion {
    Deleted,
    NotFound,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid locator '{0}'")]
    InvalidLocator(String),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store request failed: {0}")]
    Remote(String),
}

/// Durable storage for file bytes.
///
/// Implementations must be safe to share across requests; no call relies on
/// state left behind by another call.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under a fresh locator inside `folder`
    async fn put(
        &self,
        data: Vec<u8>,
        content_type: &str,
        folder: &str,
        original_name: &str,
    ) -> Result<StoredBlob, StorageError>;

    /// Remove the blob addressed by `locator`
    async fn delete(&self, locator: &str) -> Result<BlobDeletion, StorageError>;

    /// Whether a blob is currently stored under `locator`
    async fn exists(&self, locator: &str) -> Result<bool, StorageError>;

    /// Public address for `locator`
    fn public_url(&self, locator: &str) -> String;

    /// Recover the locator from a public URL produced by this store
    fn locator_from_url(&self, url: &str) -> Option<String>;
}

/// Build a fresh locator: `{folder}/{uuid}-{stem}.{ext}`.
///
/// The extension follows `content_type`; the original name only contributes
/// the stem, so `evil.html` sent as a PDF is stored as `...-evil.pdf`.
pub fn build_locator(folder: &str, original_name: &str, content_type: &str) -> String {
    let ext = extension_for_mime(content_type).unwrap_or("bin");
    format!(
        "{}/{}-{}.{}",
        sanitize_folder(folder),
        Uuid::new_v4(),
        sanitize_file_stem(original_name),
        ext
    )
}

/// Reject locators that could escape the store namespace
pub fn validate_locator(locator: &str) -> Result<(), StorageError> {
    let invalid = locator.is_empty()
        || locator.starts_with('/')
        || locator.contains('\\')
        || locator
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(StorageError::InvalidLocator(locator.to_string()));
    }
    Ok(())
}

/// Strip `base/` from `url` and drop any query string or fragment
pub(crate) fn strip_url_base(url: &str, base: &str) -> Option<String> {
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    if rest.is_empty() || validate_locator(rest).is_err() {
        return None;
    }
    Some(rest.to_string())
}
