use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access::{authorize_operation, Operation};
use crate::features::auth::model::Actor;
use crate::features::uploads::dtos::ImageUploadDto;
use crate::modules::storage::{BlobDeletion, BlobStore};
use crate::shared::upload::{mime_essence, validate_upload, UploadKind, UploadedFile};

/// Stand-alone image uploads (avatars, inline pictures)
pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
}

impl UploadService {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub async fn upload_image(&self, actor: &Actor, file: UploadedFile) -> Result<ImageUploadDto> {
        authorize_operation(actor, Operation::UploadImage)?;
        validate_upload(&file, UploadKind::Image)?;

        let size = file.size() as i64;
        let mimetype = mime_essence(&file.content_type);

        let stored = self
            .blobs
            .put(file.data, &mimetype, &owner_folder(actor.id), &file.file_name)
            .await
            .map_err(|e| {
                tracing::warn!("Image write failed for upload by {}: {}", actor.id, e);
                AppError::StorageUnavailable(e.to_string())
            })?;

        tracing::info!("Image stored: locator={}, by={}", stored.locator, actor.id);
        Ok(ImageUploadDto {
            original_name: file.file_name,
            size,
            mimetype,
            url: stored.public_url,
        })
    }

    /// Delete an image by the URL handed out at upload time. Only images
    /// the actor uploaded can be reached this way, unless the actor is ADMIN.
    pub async fn delete_image(&self, actor: &Actor, url: &str) -> Result<()> {
        authorize_operation(actor, Operation::DeleteImage)?;

        let locator = self.blobs.locator_from_url(url).ok_or_else(image_not_found)?;
        let owner = image_owner(&locator).ok_or_else(image_not_found)?;

        if owner != actor.id && !actor.is_admin() {
            tracing::warn!(
                locator = %locator,
                "User {} tried to delete an image owned by {}",
                actor.id,
                owner
            );
            return Err(image_not_found());
        }

        match self.blobs.delete(&locator).await {
            Ok(BlobDeletion::Deleted) => {
                tracing::info!("Image deleted: locator={}, by={}", locator, actor.id);
                Ok(())
            }
            Ok(BlobDeletion::NotFound) => Err(image_not_found()),
            Err(e) => Err(AppError::StorageUnavailable(e.to_string())),
        }
    }
}

/// Images live under `images/{owner}/`
fn owner_folder(owner: Uuid) -> String {
    format!("{}/{}", UploadKind::Image.folder(), owner)
}

/// Uploader recorded in an image locator; `None` for anything that is not an
/// image blob
fn image_owner(locator: &str) -> Option<Uuid> {
    let mut segments = locator.rsplit('/').skip(1);
    let owner = segments.next()?;
    if segments.next()? != UploadKind::Image.folder() {
        return None;
    }
    Uuid::parse_str(owner).ok()
}

fn image_not_found() -> AppError {
    AppError::NotFound("Image not found".to_string())
}
