//! Upload pipeline: blob write, then metadata row, with a single compensating
//! blob delete when the metadata write fails.

use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::Actor;
use crate::features::documents::models::{Document, NewDocument};
use crate::features::documents::repositories::DocumentRepository;
use crate::modules::storage::BlobStore;
use crate::shared::upload::{mime_essence, validate_upload, UploadKind, UploadedFile};

/// Everything needed to ingest one document
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub file: UploadedFile,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
}

pub struct IngestionPipeline {
    blobs: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentRepository>,
}

impl IngestionPipeline {
    pub fn new(blobs: Arc<dyn BlobStore>, documents: Arc<dyn DocumentRepository>) -> Self {
        Self { blobs, documents }
    }

    /// Store the file and record its metadata on behalf of `actor`.
    ///
    /// Invalid input is rejected before any store call. Once validation
    /// passes, the store sequence runs on its own task, so a dropped request
    /// future cannot stop it between the blob write and the metadata write or
    /// compensation.
    pub async fn ingest(&self, actor: &Actor, request: IngestRequest) -> Result<Document> {
        validate_upload(&request.file, UploadKind::Document)?;

        let blobs = Arc::clone(&self.blobs);
        let documents = Arc::clone(&self.documents);
        let owner_id = actor.id;

        tokio::spawn(async move { store_and_record(blobs, documents, owner_id, request).await })
            .await
            .map_err(|e| AppError::Internal(format!("Ingestion task failed: {}", e)))?
    }
}

async fn store_and_record(
    blobs: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentRepository>,
    owner_id: Uuid,
    request: IngestRequest,
) -> Result<Document> {
    let IngestRequest {
        file,
        description,
        course_id,
    } = request;

    let size = file.size() as i64;
    let mimetype = mime_essence(&file.content_type);

    let stored = blobs
        .put(file.data, &mimetype, UploadKind::Document.folder(), &file.file_name)
        .await
        .map_err(|e| {
            tracing::warn!("Blob write failed for upload by {}: {}", owner_id, e);
            AppError::StorageUnavailable(e.to_string())
        })?;

    let new_document = NewDocument {
        name: file.file_name,
        filename: stored.locator.clone(),
        url: stored.public_url,
        mimetype,
        size,
        description,
        course_id,
        user_id: owner_id,
    };

    match documents.create(new_document).await {
        Ok(document) => {
            tracing::info!(
                "Document ingested: id={}, locator={}, owner={}",
                document.id,
                document.filename,
                owner_id
            );
            Ok(document)
        }
        Err(err) => {
            compensate(blobs.as_ref(), &stored.locator).await;
            Err(err)
        }
    }
}

/// One attempt at removing a blob whose metadata row was never written
async fn compensate(blobs: &dyn BlobStore, locator: &str) {
    match blobs.delete(locator).await {
        Ok(_) => tracing::info!("Removed blob {} after failed metadata write", locator),
        Err(e) => tracing::error!(
            locator = %locator,
            "Orphaned blob: metadata write failed and cleanup failed: {}",
            e
        ),
    }
}
