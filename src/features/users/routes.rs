use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::users::handlers;
use crate::features::users::services::UserService;

/// Create routes for the users feature
pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/api/users", get(handlers::list_students))
        .route("/api/users/search", get(handlers::search_user))
        .route(
            "/api/users/teachers",
            get(handlers::list_teachers).post(handlers::create_teacher),
        )
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .with_state(service)
}
