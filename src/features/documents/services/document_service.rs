use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::Result;
use crate::features::access::{
    authorize_operation, document_not_found, require_course_participation,
    require_document_access, DocumentAction, Operation,
};
use crate::features::auth::model::Actor;
use crate::features::documents::dtos::{DocumentResponseDto, UpdateDocumentDto};
use crate::features::documents::models::{DocumentChanges, DocumentWithCourse};
use crate::features::documents::repositories::DocumentRepository;
use crate::features::documents::services::{DeletionCoordinator, IngestRequest, IngestionPipeline};
use crate::modules::storage::BlobStore;

/// Service for document operations
pub struct DocumentService {
    documents: Arc<dyn DocumentRepository>,
    blobs: Arc<dyn BlobStore>,
    ingestion: IngestionPipeline,
    deletion: DeletionCoordinator,
}

impl DocumentService {
    pub fn new(blobs: Arc<dyn BlobStore>, documents: Arc<dyn DocumentRepository>) -> Self {
        Self {
            ingestion: IngestionPipeline::new(Arc::clone(&blobs), Arc::clone(&documents)),
            deletion: DeletionCoordinator::new(Arc::clone(&blobs), Arc::clone(&documents)),
            documents,
            blobs,
        }
    }

    /// Upload a file and record it as a document owned by the actor.
    /// A course can only be named by someone who takes part in it.
    pub async fn upload(&self, actor: &Actor, request: IngestRequest) -> Result<DocumentResponseDto> {
        authorize_operation(actor, Operation::UploadDocument)?;
        if let Some(course_id) = request.course_id {
            self.require_course(actor, course_id).await?;
        }
        let document = self.ingestion.ingest(actor, request).await?;
        Ok(self.present(document.into()))
    }

    /// Documents uploaded by the actor, newest first
    pub async fn list_own(&self, actor: &Actor) -> Result<Vec<DocumentResponseDto>> {
        let documents = self.documents.list_by_owner(actor.id).await?;
        Ok(documents
            .into_iter()
            .map(|d| self.present(d.into()))
            .collect())
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<DocumentResponseDto> {
        let record = self.load_for(actor, id, DocumentAction::Read).await?;
        Ok(self.present(record.into()))
    }

    /// Update name, description or course. Blob fields never change.
    ///
    /// Moving the document into a course needs the same course participation
    /// as uploading into it; `null` detaches it.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        dto: UpdateDocumentDto,
    ) -> Result<DocumentResponseDto> {
        let record = self.load_for(actor, id, DocumentAction::Update).await?;

        let changes = DocumentChanges::from(dto);
        if changes.is_empty() {
            return Ok(self.present(record.into()));
        }
        if let Some(Some(course_id)) = changes.course_id {
            if record.document.course_id != Some(course_id) {
                self.require_course(actor, course_id).await?;
            }
        }

        self.documents
            .update(id, changes)
            .await?
            .ok_or_else(|| document_not_found(id))?;

        tracing::info!("Document updated: id={}, by={}", id, actor.id);

        let updated = self
            .documents
            .find_with_course(id)
            .await?
            .ok_or_else(|| document_not_found(id))?;
        Ok(self.present(updated.into()))
    }

    /// Delete a document; returns the record as it was before deletion
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<DocumentResponseDto> {
        let document = self.deletion.delete(actor, id).await?;
        Ok(self.present(document.into()))
    }

    async fn load_for(
        &self,
        actor: &Actor,
        id: Uuid,
        action: DocumentAction,
    ) -> Result<DocumentWithCourse> {
        let record = self
            .documents
            .find_with_course(id)
            .await?
            .ok_or_else(|| document_not_found(id))?;

        require_document_access(actor, id, &record.access(), action)?;
        Ok(record)
    }

    async fn require_course(&self, actor: &Actor, course_id: Uuid) -> Result<()> {
        let membership = self.documents.course_membership(course_id, actor.id).await?;
        require_course_participation(actor, course_id, membership.as_ref())
    }

    /// The stored URL is a cache; always hand out the one derived from the locator
    pub(crate) fn present(&self, mut dto: DocumentResponseDto) -> DocumentResponseDto {
        dto.url = self.blobs.public_url(&dto.filename);
        dto
    }
}
