use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::features::access::DocumentAccess;

/// Database model for document
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    /// Blob locator; the only key needed to address the stored bytes
    pub filename: String,
    /// Public address derived from `filename` at upload time
    pub url: String,
    pub mimetype: String,
    pub size: i64,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Document joined with the fields of its course that reads and access checks need
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DocumentWithCourse {
    #[sqlx(flatten)]
    pub document: Document,
    pub course_name: Option<String>,
    pub course_teacher_id: Option<Uuid>,
}

impl DocumentWithCourse {
    pub fn access(&self) -> DocumentAccess {
        DocumentAccess {
            owner_id: self.document.user_id,
            course_teacher_id: self.course_teacher_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub mimetype: String,
    pub size: i64,
    pub description: Option<String>,
    pub course_id: Option<Uuid>,
    pub user_id: Uuid,
}

/// Mutable metadata; blob fields are fixed once the document exists.
///
/// `Some(None)` clears a nullable column, `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct DocumentChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub course_id: Option<Option<Uuid>>,
}

impl DocumentChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.course_id.is_none()
    }
}
