use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::features::courses::handlers;
use crate::features::courses::services::CourseService;
use crate::shared::upload::UPLOAD_BODY_LIMIT;

/// Create routes for the courses feature
pub fn routes(service: Arc<CourseService>) -> Router {
    Router::new()
        .route(
            "/api/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/api/courses/{id}",
            get(handlers::get_course)
                .patch(handlers::update_course)
                .delete(handlers::delete_course),
        )
        .route(
            "/api/courses/{id}/files",
            post(handlers::upload_course_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/courses/{id}/students", post(handlers::add_student))
        .with_state(service)
}
