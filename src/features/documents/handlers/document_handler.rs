use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::Actor;
use crate::features::documents::dtos::{DocumentResponseDto, UpdateDocumentDto, UploadDocumentDto};
use crate::features::documents::services::{DocumentService, IngestRequest};
use crate::shared::types::ApiResponse;
use crate::shared::upload::read_upload_form;

/// Multipart parts accepted as the uploaded file
const FILE_FIELDS: &[&str] = &["document", "file"];

/// Upload a document
///
/// Accepts multipart/form-data with:
/// - `document` (or `file`): the file to upload (required)
/// - `description`: optional free text
/// - `course_id`: optional course to attach the document to
#[utoipa::path(
    post,
    path = "/api/documents/upload",
    tag = "documents",
    request_body(
        content = UploadDocumentDto,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "Document uploaded", body = ApiResponse<DocumentResponseDto>),
        (status = 400, description = "Missing file, disallowed type or bad course id"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Course not found"),
        (status = 413, description = "File too large"),
        (status = 503, description = "File storage unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_document(
    actor: Actor,
    State(service): State<Arc<DocumentService>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<DocumentResponseDto>>)> {
    let mut form = read_upload_form(multipart, FILE_FIELDS).await?;

    let course_id = form
        .text("course_id")
        .or_else(|| form.text("courseId"))
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| AppError::BadRequest(format!("Invalid course ID '{}'", raw)))
        })
        .transpose()?;
    let description = form.text("description").map(str::to_string);
    let file = form.take_file()?;

    let document = service
        .upload(
            &actor,
            IngestRequest {
                file,
                description,
                course_id,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(document),
            Some("Document uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// List the caller's documents, newest first
#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "documents",
    responses(
        (status = 200, description = "Documents owned by the caller", body = ApiResponse<Vec<DocumentResponseDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_documents(
    actor: Actor,
    State(service): State<Arc<DocumentService>>,
) -> Result<Json<ApiResponse<Vec<DocumentResponseDto>>>> {
    let documents = service.list_own(&actor).await?;
    Ok(Json(ApiResponse::success(Some(documents), None, None)))
}

/// Get a document by ID
#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document found", body = ApiResponse<DocumentResponseDto>),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_document(
    actor: Actor,
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DocumentResponseDto>>> {
    let document = service.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(document), None, None)))
}

/// Update document metadata
#[utoipa::path(
    patch,
    path = "/api/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = UpdateDocumentDto,
    responses(
        (status = 200, description = "Document updated", body = ApiResponse<DocumentResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Document or course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_document(
    actor: Actor,
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateDocumentDto>,
) -> Result<Json<ApiResponse<DocumentResponseDto>>> {
    dto.check()?;

    let document = service.update(&actor, id, dto).await?;
    Ok(Json(ApiResponse::success(Some(document), None, None)))
}

/// Delete a document and its stored file
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted; returns the deleted record", body = ApiResponse<DocumentResponseDto>),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_document(
    actor: Actor,
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DocumentResponseDto>>> {
    let document = service.delete(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        Some(document),
        Some("Document deleted successfully".to_string()),
        None,
    )))
}
