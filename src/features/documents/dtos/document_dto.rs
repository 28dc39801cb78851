use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::documents::models::{Document, DocumentChanges, DocumentWithCourse};
use crate::shared::types::nullable;

/// Course reference embedded in a document response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentCourseDto {
    pub id: Uuid,
    pub name: String,
}

/// Response DTO for document
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponseDto {
    pub id: Uuid,
    pub name: String,
    /// Blob locator
    pub filename: String,
    pub url: String,
    pub mimetype: String,
    pub size: i64,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<DocumentCourseDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponseDto {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            name: d.name,
            filename: d.filename,
            url: d.url,
            mimetype: d.mimetype,
            size: d.size,
            description: d.description,
            course_id: d.course_id,
            user_id: d.user_id,
            course: None,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

impl From<DocumentWithCourse> for DocumentResponseDto {
    fn from(d: DocumentWithCourse) -> Self {
        let course = match (d.document.course_id, d.course_name) {
            (Some(id), Some(name)) => Some(DocumentCourseDto { id, name }),
            _ => None,
        };
        Self {
            course,
            ..DocumentResponseDto::from(d.document)
        }
    }
}

/// Upload form for OpenAPI documentation.
/// The handler reads the multipart body directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadDocumentDto {
    /// The file to upload (field `document` or `file`)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub document: String,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
}

/// Longest description a document may carry
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Request DTO for updating document metadata.
///
/// `description` and `courseId` accept `null` to clear the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Uuid>)]
    pub course_id: Option<Option<Uuid>>,
}

impl UpdateDocumentDto {
    /// Derived rules plus the description limit, which only applies when a
    /// description is being set
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(Some(description)) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(AppError::Validation(format!(
                    "Description must not exceed {} characters",
                    MAX_DESCRIPTION_LENGTH
                )));
            }
        }
        Ok(())
    }
}

impl From<UpdateDocumentDto> for DocumentChanges {
    fn from(dto: UpdateDocumentDto) -> Self {
        Self {
            name: dto.name.map(|n| n.trim().to_string()),
            description: dto.description,
            course_id: dto.course_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_dto_distinguishes_clear_from_keep() {
        let dto: UpdateDocumentDto =
            serde_json::from_str(r#"{"description":null,"name":"Week 2"}"#).unwrap();
        assert_eq!(dto.description, Some(None));
        assert_eq!(dto.course_id, None);

        let changes = DocumentChanges::from(dto);
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_update_dto_description_limit() {
        let ok = UpdateDocumentDto {
            description: Some(Some("x".repeat(MAX_DESCRIPTION_LENGTH))),
            ..Default::default()
        };
        let long = UpdateDocumentDto {
            description: Some(Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1))),
            ..Default::default()
        };
        let cleared = UpdateDocumentDto {
            description: Some(None),
            ..Default::default()
        };

        assert!(ok.check().is_ok());
        assert!(matches!(long.check(), Err(AppError::Validation(_))));
        assert!(cleared.check().is_ok());
    }
}
