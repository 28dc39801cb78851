use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::courses::{dtos as courses_dtos, handlers as courses_handlers};
use crate::features::documents::{dtos as documents_dtos, handlers as documents_handlers};
use crate::features::uploads::{dtos as uploads_dtos, handlers as uploads_handlers};
use crate::features::users::{dtos as users_dtos, handlers as users_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::register,
        auth::handlers::login,
        auth::handlers::refresh_token,
        auth::handlers::get_me,
        // Users
        users_handlers::list_students,
        users_handlers::search_user,
        users_handlers::create_teacher,
        users_handlers::list_teachers,
        users_handlers::get_user,
        users_handlers::update_user,
        users_handlers::delete_user,
        // Documents
        documents_handlers::upload_document,
        documents_handlers::list_documents,
        documents_handlers::get_document,
        documents_handlers::update_document,
        documents_handlers::delete_document,
        // Courses
        courses_handlers::create_course,
        courses_handlers::list_courses,
        courses_handlers::get_course,
        courses_handlers::upload_course_file,
        courses_handlers::add_student,
        courses_handlers::update_course,
        courses_handlers::delete_course,
        // Uploads
        uploads_handlers::upload_image,
        uploads_handlers::delete_image,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Auth
            auth::model::Role,
            auth::dtos::RegisterRequestDto,
            auth::dtos::LoginRequestDto,
            auth::dtos::RefreshTokenRequestDto,
            auth::dtos::AuthTokensDto,
            ApiResponse<auth::dtos::AuthTokensDto>,
            // Users
            users_dtos::UserResponseDto,
            users_dtos::UserSummaryDto,
            users_dtos::CreateTeacherDto,
            users_dtos::UpdateUserDto,
            ApiResponse<users_dtos::UserResponseDto>,
            ApiResponse<Vec<users_dtos::UserResponseDto>>,
            // Documents
            documents_dtos::DocumentCourseDto,
            documents_dtos::DocumentResponseDto,
            documents_dtos::UploadDocumentDto,
            documents_dtos::UpdateDocumentDto,
            ApiResponse<documents_dtos::DocumentResponseDto>,
            ApiResponse<Vec<documents_dtos::DocumentResponseDto>>,
            // Courses
            courses_dtos::CourseResponseDto,
            courses_dtos::CourseSummaryDto,
            courses_dtos::CourseDetailDto,
            courses_dtos::CourseDocumentDto,
            courses_dtos::CourseDocumentUploaderDto,
            courses_dtos::CreateCourseDto,
            courses_dtos::UpdateCourseDto,
            courses_dtos::EnrollStudentDto,
            courses_dtos::UploadCourseFileDto,
            ApiResponse<courses_dtos::CourseResponseDto>,
            ApiResponse<Vec<courses_dtos::CourseSummaryDto>>,
            ApiResponse<courses_dtos::CourseDetailDto>,
            // Uploads
            uploads_dtos::ImageUploadDto,
            uploads_dtos::UploadImageDto,
            uploads_dtos::DeleteImageDto,
            ApiResponse<uploads_dtos::ImageUploadDto>,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "users", description = "User accounts and administration"),
        (name = "documents", description = "Uploaded documents and their metadata"),
        (name = "courses", description = "Courses, enrolments and course files"),
        (name = "uploads", description = "Stand-alone image uploads"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Instidocs API",
        version = "0.1.0",
        description = "API documentation for Instidocs",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_routes_are_documented_with_bearer_auth() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/documents/{id}"));
        assert!(doc.paths.paths.contains_key("/api/courses/{id}/files"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
