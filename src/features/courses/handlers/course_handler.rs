use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::Actor;
use crate::features::courses::dtos::{
    CourseDetailDto, CourseResponseDto, CourseSummaryDto, CreateCourseDto, EnrollStudentDto,
    UpdateCourseDto, UploadCourseFileDto,
};
use crate::features::courses::services::CourseService;
use crate::features::documents::dtos::DocumentResponseDto;
use crate::shared::types::ApiResponse;
use crate::shared::upload::read_upload_form;

/// Create a course (ADMIN)
#[utoipa::path(
    post,
    path = "/api/courses",
    tag = "courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = ApiResponse<CourseResponseDto>),
        (status = 400, description = "Validation error or invalid teacher ID"),
        (status = 403, description = "Administrator role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_course(
    actor: Actor,
    State(service): State<Arc<CourseService>>,
    AppJson(dto): AppJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<ApiResponse<CourseResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let course = service.create(&actor, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(course), None, None)),
    ))
}

/// List courses visible to the caller
#[utoipa::path(
    get,
    path = "/api/courses",
    tag = "courses",
    responses(
        (status = 200, description = "Courses for the caller's role", body = ApiResponse<Vec<CourseSummaryDto>>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_courses(
    actor: Actor,
    State(service): State<Arc<CourseService>>,
) -> Result<Json<ApiResponse<Vec<CourseSummaryDto>>>> {
    let courses = service.list(&actor).await?;
    Ok(Json(ApiResponse::success(Some(courses), None, None)))
}

/// Get a course with teacher, students and documents
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course found", body = ApiResponse<CourseDetailDto>),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_course(
    actor: Actor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CourseDetailDto>>> {
    let course = service.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(course), None, None)))
}

/// Upload a document to a course
#[utoipa::path(
    post,
    path = "/api/courses/{id}/files",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body(
        content = UploadCourseFileDto,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "Document uploaded", body = ApiResponse<DocumentResponseDto>),
        (status = 400, description = "Missing or disallowed file"),
        (status = 404, description = "Course not found"),
        (status = 503, description = "File storage unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_course_file(
    actor: Actor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<DocumentResponseDto>>)> {
    let mut form = read_upload_form(multipart, &["file", "document"]).await?;
    let description = form.text("description").map(str::to_string);
    let file = form.take_file()?;

    let document = service.upload_file(&actor, id, file, description).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(document), None, None)),
    ))
}

/// Enrol a student by email (ADMIN, TEACHER)
#[utoipa::path(
    post,
    path = "/api/courses/{id}/students",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = EnrollStudentDto,
    responses(
        (status = 200, description = "Student enrolled", body = ApiResponse<CourseDetailDto>),
        (status = 403, description = "Role not allowed to enrol students"),
        (status = 404, description = "Course or student not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_student(
    actor: Actor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<EnrollStudentDto>,
) -> Result<Json<ApiResponse<CourseDetailDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let course = service.add_student(&actor, id, &dto.email).await?;
    Ok(Json(ApiResponse::success(Some(course), None, None)))
}

/// Update a course (ADMIN, TEACHER)
#[utoipa::path(
    patch,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = ApiResponse<CourseResponseDto>),
        (status = 400, description = "Validation error or invalid teacher ID"),
        (status = 403, description = "Role not allowed, or teacher reassignment by a non-administrator"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_course(
    actor: Actor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateCourseDto>,
) -> Result<Json<ApiResponse<CourseResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let course = service.update(&actor, id, dto).await?;
    Ok(Json(ApiResponse::success(Some(course), None, None)))
}

/// Delete a course (ADMIN)
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course deleted", body = ApiResponse<CourseResponseDto>),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_course(
    actor: Actor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CourseResponseDto>>> {
    let course = service.delete(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        Some(course),
        Some("Course deleted successfully".to_string()),
        None,
    )))
}
