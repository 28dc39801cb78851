use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Stored image; no metadata row is kept for it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadDto {
    pub original_name: String,
    pub size: i64,
    pub mimetype: String,
    pub url: String,
}

/// Multipart body for image uploads (OpenAPI only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadImageDto {
    /// Image file (jpeg, png, gif or webp)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeleteImageDto {
    /// Public URL returned by the upload
    #[validate(url(message = "Invalid image URL"))]
    pub url: String,
}
