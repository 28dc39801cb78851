use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::database::map_db_error;
use crate::core::error::Result;
use crate::features::access::CourseMembership;
use crate::features::documents::models::{Document, DocumentChanges, DocumentWithCourse, NewDocument};

const DOCUMENT_COLUMNS: &str = "id, name, filename, url, mimetype, size, description, course_id, \
                                user_id, created_at, updated_at";

const DOCUMENT_WITH_COURSE_SELECT: &str = r#"
    SELECT
        d.id, d.name, d.filename, d.url, d.mimetype, d.size, d.description,
        d.course_id, d.user_id, d.created_at, d.updated_at,
        c.name AS course_name,
        c.teacher_id AS course_teacher_id
    FROM documents d
    LEFT JOIN courses c ON c.id = d.course_id
"#;

/// Persistence port for document metadata
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, document: NewDocument) -> Result<Document>;

    /// Document plus its course name and course teacher
    async fn find_with_course(&self, id: Uuid) -> Result<Option<DocumentWithCourse>>;

    /// Documents uploaded by `user_id`, newest first
    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<DocumentWithCourse>>;

    async fn update(&self, id: Uuid, changes: DocumentChanges) -> Result<Option<Document>>;

    /// Returns `false` when the row was already gone
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Teacher of `course_id` and whether `user_id` is enrolled in it;
    /// `None` when the course does not exist
    async fn course_membership(&self, course_id: Uuid, user_id: Uuid) -> Result<Option<CourseMembership>>;
}

pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn create(&self, document: NewDocument) -> Result<Document> {
        let sql = format!(
            r#"
            INSERT INTO documents (name, filename, url, mimetype, size, description, course_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        );

        sqlx::query_as::<_, Document>(&sql)
            .bind(&document.name)
            .bind(&document.filename)
            .bind(&document.url)
            .bind(&document.mimetype)
            .bind(document.size)
            .bind(&document.description)
            .bind(document.course_id)
            .bind(document.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "create document"))
    }

    async fn find_with_course(&self, id: Uuid) -> Result<Option<DocumentWithCourse>> {
        let sql = format!("{} WHERE d.id = $1", DOCUMENT_WITH_COURSE_SELECT);

        sqlx::query_as::<_, DocumentWithCourse>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "load document"))
    }

    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<DocumentWithCourse>> {
        let sql = format!(
            "{} WHERE d.user_id = $1 ORDER BY d.created_at DESC",
            DOCUMENT_WITH_COURSE_SELECT
        );

        sqlx::query_as::<_, DocumentWithCourse>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "list documents"))
    }

    async fn update(&self, id: Uuid, changes: DocumentChanges) -> Result<Option<Document>> {
        let sql = format!(
            r#"
            UPDATE documents SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                course_id = CASE WHEN $5 THEN $6 ELSE course_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        );

        sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.description.is_some())
            .bind(changes.description.flatten())
            .bind(changes.course_id.is_some())
            .bind(changes.course_id.flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "update document"))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "delete document"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn course_membership(&self, course_id: Uuid, user_id: Uuid) -> Result<Option<CourseMembership>> {
        let row = sqlx::query_as::<_, (Uuid, bool)>(
            r#"
            SELECT
                c.teacher_id,
                EXISTS (
                    SELECT 1 FROM course_students cs
                    WHERE cs.course_id = c.id AND cs.student_id = $2
                ) AS enrolled
            FROM courses c
            WHERE c.id = $1
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "load course membership"))?;

        Ok(row.map(|(teacher_id, enrolled)| CourseMembership {
            teacher_id,
            enrolled,
        }))
    }
}
