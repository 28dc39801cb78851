use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::Actor;
use crate::features::users::dtos::{
    CreateTeacherDto, SearchUserQuery, UpdateUserDto, UserResponseDto,
};
use crate::features::users::services::UserService;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// List students (paginated)
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "List of students", body = ApiResponse<Vec<UserResponseDto>>),
        (status = 403, description = "Administrator or teacher role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_students(
    actor: Actor,
    State(service): State<Arc<UserService>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponseDto>>>> {
    let (items, total) = service
        .list_students(&actor, params.offset(), params.limit())
        .await?;

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Find a user by email
#[utoipa::path(
    get,
    path = "/api/users/search",
    tag = "users",
    params(SearchUserQuery),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponseDto>),
        (status = 403, description = "Administrator or teacher role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_user(
    actor: Actor,
    State(service): State<Arc<UserService>>,
    Query(query): Query<SearchUserQuery>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = service.search_by_email(&actor, &query.email).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

/// Create a teacher account (ADMIN)
#[utoipa::path(
    post,
    path = "/api/users/teachers",
    tag = "users",
    request_body = CreateTeacherDto,
    responses(
        (status = 201, description = "Teacher created", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Administrator role required"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_teacher(
    actor: Actor,
    State(service): State<Arc<UserService>>,
    AppJson(dto): AppJson<CreateTeacherDto>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = service.create_teacher(&actor, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(user), None, None)),
    ))
}

/// List teachers (ADMIN, paginated)
#[utoipa::path(
    get,
    path = "/api/users/teachers",
    tag = "users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "List of teachers", body = ApiResponse<Vec<UserResponseDto>>),
        (status = 403, description = "Administrator role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_teachers(
    actor: Actor,
    State(service): State<Arc<UserService>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponseDto>>>> {
    let (items, total) = service
        .list_teachers(&actor, params.offset(), params.limit())
        .await?;

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponseDto>),
        (status = 403, description = "Not allowed to view this user"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    actor: Actor,
    State(service): State<Arc<UserService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    let user = service.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not allowed to update this user"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    actor: Actor,
    State(service): State<Arc<UserService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateUserDto>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = service.update(&actor, id, dto).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

/// Delete a user and their documents (ADMIN)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "User still teaches a course or is the caller"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    actor: Actor,
    State(service): State<Arc<UserService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    let user = service.delete(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        Some(user),
        Some("User deleted successfully".to_string()),
        None,
    )))
}
