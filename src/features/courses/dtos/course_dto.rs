use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::courses::models::{Course, CourseChanges, CourseDocument, CourseSummary};
use crate::features::documents::dtos::DocumentResponseDto;
use crate::features::users::dtos::UserSummaryDto;

/// Response DTO for course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponseDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseResponseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            teacher_id: c.teacher_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Course list entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummaryDto {
    #[serde(flatten)]
    pub course: CourseResponseDto,
    pub teacher_name: String,
    pub teacher_email: String,
    pub student_count: i64,
    pub document_count: i64,
}

impl From<CourseSummary> for CourseSummaryDto {
    fn from(s: CourseSummary) -> Self {
        Self {
            course: s.course.into(),
            teacher_name: s.teacher_name,
            teacher_email: s.teacher_email,
            student_count: s.student_count,
            document_count: s.document_count,
        }
    }
}

/// Course document with its uploader
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDocumentDto {
    #[serde(flatten)]
    pub document: DocumentResponseDto,
    pub uploader: CourseDocumentUploaderDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDocumentUploaderDto {
    pub full_name: String,
    pub email: String,
}

impl From<CourseDocument> for CourseDocumentDto {
    fn from(d: CourseDocument) -> Self {
        Self {
            document: d.document.into(),
            uploader: CourseDocumentUploaderDto {
                full_name: d.uploader_name,
                email: d.uploader_email,
            },
        }
    }
}

/// Full course view: teacher, students and visible documents
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDetailDto {
    #[serde(flatten)]
    pub course: CourseResponseDto,
    pub teacher: Option<UserSummaryDto>,
    pub students: Vec<UserSummaryDto>,
    pub documents: Vec<CourseDocumentDto>,
}

/// Request DTO for creating a course
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    pub description: Option<String>,

    pub teacher_id: Uuid,
}

/// Request DTO for updating a course
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<Uuid>,
}

impl From<UpdateCourseDto> for CourseChanges {
    fn from(dto: UpdateCourseDto) -> Self {
        Self {
            name: dto.name.map(|n| n.trim().to_string()),
            description: dto.description,
            teacher_id: dto.teacher_id,
        }
    }
}

/// Request DTO for enrolling a student by email
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EnrollStudentDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Upload form for OpenAPI documentation
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadCourseFileDto {
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    pub description: Option<String>,
}
