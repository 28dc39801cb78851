use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::Actor;
use crate::features::uploads::dtos::{DeleteImageDto, ImageUploadDto, UploadImageDto};
use crate::features::uploads::services::UploadService;
use crate::shared::types::ApiResponse;
use crate::shared::upload::read_upload_form;

/// Upload an image
#[utoipa::path(
    post,
    path = "/api/uploads/image",
    tag = "uploads",
    request_body(
        content = UploadImageDto,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "Image stored", body = ApiResponse<ImageUploadDto>),
        (status = 400, description = "Missing file or not an image"),
        (status = 503, description = "File storage unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_image(
    actor: Actor,
    State(service): State<Arc<UploadService>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ImageUploadDto>>)> {
    let mut form = read_upload_form(multipart, &["image", "file"]).await?;
    let file = form.take_file()?;

    let image = service.upload_image(&actor, file).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(image),
            Some("Image uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// Delete a previously uploaded image by its URL
#[utoipa::path(
    delete,
    path = "/api/uploads/image",
    tag = "uploads",
    request_body = DeleteImageDto,
    responses(
        (status = 200, description = "Image deleted"),
        (status = 400, description = "Invalid URL"),
        (status = 404, description = "Image not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_image(
    actor: Actor,
    State(service): State<Arc<UploadService>>,
    AppJson(dto): AppJson<DeleteImageDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    service.delete_image(&actor, &dto.url).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Image deleted successfully".to_string()),
        None,
    )))
}
