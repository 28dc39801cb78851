use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::features::documents::models::Document;

/// Database model for course
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course row used by list views
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CourseSummary {
    #[sqlx(flatten)]
    pub course: Course,
    pub teacher_name: String,
    pub teacher_email: String,
    pub student_count: i64,
    pub document_count: i64,
}

/// Course document together with its uploader
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CourseDocument {
    #[sqlx(flatten)]
    pub document: Document,
    pub uploader_name: String,
    pub uploader_email: String,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub name: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub teacher_id: Option<Uuid>,
}
