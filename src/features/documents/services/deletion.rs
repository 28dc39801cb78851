//! Document deletion: the metadata row goes first and is authoritative; blob
//! removal afterwards is attempted once and never fails the request.

use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access::{document_not_found, require_document_access, DocumentAction};
use crate::features::auth::model::Actor;
use crate::features::documents::models::Document;
use crate::features::documents::repositories::DocumentRepository;
use crate::modules::storage::{BlobDeletion, BlobStore};

pub struct DeletionCoordinator {
    blobs: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentRepository>,
}

impl DeletionCoordinator {
    pub fn new(blobs: Arc<dyn BlobStore>, documents: Arc<dyn DocumentRepository>) -> Self {
        Self { blobs, documents }
    }

    /// Delete a document the actor may delete; returns its prior state.
    ///
    /// Absence and denial both fail with `NotFound`. A row that disappears
    /// between the load and the delete counts as already deleted.
    pub async fn delete(&self, actor: &Actor, document_id: Uuid) -> Result<Document> {
        let record = self
            .documents
            .find_with_course(document_id)
            .await?
            .ok_or_else(|| document_not_found(document_id))?;

        require_document_access(actor, document_id, &record.access(), DocumentAction::Delete)?;

        let blobs = Arc::clone(&self.blobs);
        let documents = Arc::clone(&self.documents);
        let document = record.document;
        let actor_id = actor.id;

        tokio::spawn(async move {
            if !documents.delete(document.id).await? {
                tracing::info!("Document {} was already deleted", document.id);
                return Ok(document);
            }

            tracing::info!(
                "Document deleted: id={}, locator={}, by={}",
                document.id,
                document.filename,
                actor_id
            );
            remove_blob(blobs.as_ref(), &document.filename).await;
            Ok(document)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Deletion task failed: {}", e)))?
    }
}

async fn remove_blob(blobs: &dyn BlobStore, locator: &str) {
    match blobs.delete(locator).await {
        Ok(BlobDeletion::Deleted) => tracing::debug!("Blob {} removed", locator),
        Ok(BlobDeletion::NotFound) => {
            tracing::warn!("Blob {} was already missing from storage", locator)
        }
        Err(e) => tracing::warn!(
            locator = %locator,
            "Blob cleanup failed after document deletion: {}",
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::Role;
    use crate::shared::test_helpers::{
        actor, eventually, InMemoryBlobStore, InMemoryDocumentRepository,
    };
    use tokio_test::assert_ok;

    struct Fixture {
        coordinator: DeletionCoordinator,
        blobs: Arc<InMemoryBlobStore>,
        documents: Arc<InMemoryDocumentRepository>,
    }

    fn fixture() -> Fixture {
        let blobs = Arc::new(InMemoryBlobStore::default());
        let documents = Arc::new(InMemoryDocumentRepository::default());
        Fixture {
            coordinator: DeletionCoordinator::new(blobs.clone(), documents.clone()),
            blobs,
            documents,
        }
    }

    async fn seed(fx: &Fixture, owner: Uuid, course_id: Option<Uuid>) -> Document {
        fx.documents
            .seed_with_blob(fx.blobs.as_ref(), owner, course_id)
            .await
    }

    #[tokio::test]
    async fn test_owner_deletes_row_and_blob() {
        let fx = fixture();
        let s1 = actor(Role::Student);
        let doc = seed(&fx, s1.id, None).await;

        let deleted = assert_ok!(fx.coordinator.delete(&s1, doc.id).await);

        assert_eq!(deleted.id, doc.id);
        assert_eq!(fx.documents.len(), 0);
        assert!(!fx.blobs.contains(&doc.filename));
    }

    #[tokio::test]
    async fn test_other_student_gets_not_found_and_nothing_changes() {
        let fx = fixture();
        let doc = seed(&fx, Uuid::new_v4(), None).await;

        let result = fx.coordinator.delete(&actor(Role::Student), doc.id).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(fx.documents.len(), 1);
        assert!(fx.blobs.contains(&doc.filename));
        assert_eq!(fx.blobs.delete_count(), 0);
    }

    #[tokio::test]
    async fn test_course_teacher_and_admin_may_delete() {
        let fx = fixture();
        let t1 = actor(Role::Teacher);
        let course_id = Uuid::new_v4();
        fx.documents.set_course_teacher(course_id, t1.id);

        let doc = seed(&fx, Uuid::new_v4(), Some(course_id)).await;
        assert_ok!(fx.coordinator.delete(&t1, doc.id).await);

        let other = seed(&fx, Uuid::new_v4(), None).await;
        assert_ok!(fx.coordinator.delete(&actor(Role::Admin), other.id).await);
        assert_eq!(fx.documents.len(), 0);
    }

    #[tokio::test]
    async fn test_blob_failure_does_not_fail_deletion() {
        let fx = fixture();
        let s1 = actor(Role::Student);
        let doc = seed(&fx, s1.id, None).await;
        fx.blobs.fail_deletes(true);

        assert_ok!(fx.coordinator.delete(&s1, doc.id).await);
        assert_eq!(fx.documents.len(), 0);
        assert!(fx.blobs.contains(&doc.filename));
    }

    #[tokio::test]
    async fn test_second_delete_is_not_found_without_another_blob_delete() {
        let fx = fixture();
        let s1 = actor(Role::Student);
        let doc = seed(&fx, s1.id, None).await;

        assert_ok!(fx.coordinator.delete(&s1, doc.id).await);
        let second = fx.coordinator.delete(&s1, doc.id).await;

        assert!(matches!(second, Err(AppError::NotFound(_))));
        assert_eq!(fx.blobs.delete_count(), 1);
    }

    #[tokio::test]
    async fn test_row_removed_by_concurrent_deleter_counts_as_deleted() {
        let fx = fixture();
        let s1 = actor(Role::Student);
        let doc = seed(&fx, s1.id, None).await;
        fx.documents.vanish_on_delete(true);

        let deleted = assert_ok!(fx.coordinator.delete(&s1, doc.id).await);

        assert_eq!(deleted.id, doc.id);
        assert_eq!(fx.blobs.delete_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_request_still_removes_the_blob() {
        let fx = fixture();
        let s1 = actor(Role::Student);
        let doc = seed(&fx, s1.id, None).await;
        let gate = fx.blobs.hold_deletes();

        tokio::select! {
            _ = fx.coordinator.delete(&s1, doc.id) => panic!("delete finished while the blob store was held"),
            _ = eventually(|| fx.blobs.delete_count() == 1) => {}
        }
        assert_eq!(fx.documents.len(), 0);
        assert!(fx.blobs.contains(&doc.filename));

        gate.notify_one();
        eventually(|| !fx.blobs.contains(&doc.filename)).await;
    }
}
