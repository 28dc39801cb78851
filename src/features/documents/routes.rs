use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::features::documents::handlers;
use crate::features::documents::services::DocumentService;
use crate::shared::upload::UPLOAD_BODY_LIMIT;

/// Create routes for the documents feature
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<DocumentService>) -> Router {
    Router::new()
        .route(
            "/api/documents/upload",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/documents", get(handlers::list_documents))
        .route(
            "/api/documents/{id}",
            get(handlers::get_document)
                .patch(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .with_state(service)
}
