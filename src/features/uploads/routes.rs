use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::post, Router};

use crate::features::uploads::handlers;
use crate::features::uploads::services::UploadService;
use crate::shared::upload::UPLOAD_BODY_LIMIT;

/// Create routes for image uploads
pub fn routes(service: Arc<UploadService>) -> Router {
    Router::new()
        .route(
            "/api/uploads/image",
            post(handlers::upload_image)
                .delete(handlers::delete_image)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .with_state(service)
}
