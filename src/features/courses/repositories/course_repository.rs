use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::database::map_db_error;
use crate::core::error::Result;
use crate::features::courses::models::{Course, CourseChanges, CourseDocument, CourseSummary, NewCourse};
use crate::features::users::models::User;

const COURSE_COLUMNS: &str = "id, name, description, teacher_id, created_at, updated_at";

const SUMMARY_SELECT: &str = r#"
    SELECT
        c.id, c.name, c.description, c.teacher_id, c.created_at, c.updated_at,
        t.full_name AS teacher_name,
        t.email AS teacher_email,
        (SELECT COUNT(*) FROM course_students cs WHERE cs.course_id = c.id) AS student_count,
        (SELECT COUNT(*) FROM documents d WHERE d.course_id = c.id) AS document_count
    FROM courses c
    JOIN users t ON t.id = c.teacher_id
"#;

/// Persistence port for courses and enrolments
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, course: NewCourse) -> Result<Course>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>>;

    async fn list_all(&self) -> Result<Vec<CourseSummary>>;

    async fn list_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<CourseSummary>>;

    async fn list_by_student(&self, student_id: Uuid) -> Result<Vec<CourseSummary>>;

    async fn students(&self, course_id: Uuid) -> Result<Vec<User>>;

    /// Documents attached to the course, newest first
    async fn documents(&self, course_id: Uuid) -> Result<Vec<CourseDocument>>;

    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Returns `false` when the user was already enrolled
    async fn enroll(&self, course_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn update(&self, id: Uuid, changes: CourseChanges) -> Result<Option<Course>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

pub struct PgCourseRepository {
    pool: PgPool,
}

impl PgCourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(&self, filter: &str, id: Option<Uuid>) -> Result<Vec<CourseSummary>> {
        let sql = format!("{} {} ORDER BY c.name ASC", SUMMARY_SELECT, filter);

        let mut query = sqlx::query_as::<_, CourseSummary>(&sql);
        if let Some(id) = id {
            query = query.bind(id);
        }

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "list courses"))
    }
}

#[async_trait]
impl CourseRepository for PgCourseRepository {
    async fn create(&self, course: NewCourse) -> Result<Course> {
        let sql = format!(
            "INSERT INTO courses (name, description, teacher_id) VALUES ($1, $2, $3) RETURNING {}",
            COURSE_COLUMNS
        );

        sqlx::query_as::<_, Course>(&sql)
            .bind(&course.name)
            .bind(&course.description)
            .bind(course.teacher_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "create course"))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>> {
        let sql = format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS);

        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "load course"))
    }

    async fn list_all(&self) -> Result<Vec<CourseSummary>> {
        self.list_where("", None).await
    }

    async fn list_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<CourseSummary>> {
        self.list_where("WHERE c.teacher_id = $1", Some(teacher_id))
            .await
    }

    async fn list_by_student(&self, student_id: Uuid) -> Result<Vec<CourseSummary>> {
        self.list_where(
            "WHERE EXISTS (SELECT 1 FROM course_students cs \
             WHERE cs.course_id = c.id AND cs.student_id = $1)",
            Some(student_id),
        )
        .await
    }

    async fn students(&self, course_id: Uuid) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.full_name, u.role, u.is_active, u.password_hash,
                   u.created_at, u.updated_at
            FROM course_students cs
            JOIN users u ON u.id = cs.student_id
            WHERE cs.course_id = $1
            ORDER BY u.full_name ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "list course students"))
    }

    async fn documents(&self, course_id: Uuid) -> Result<Vec<CourseDocument>> {
        sqlx::query_as::<_, CourseDocument>(
            r#"
            SELECT
                d.id, d.name, d.filename, d.url, d.mimetype, d.size, d.description,
                d.course_id, d.user_id, d.created_at, d.updated_at,
                u.full_name AS uploader_name,
                u.email AS uploader_email
            FROM documents d
            JOIN users u ON u.id = d.user_id
            WHERE d.course_id = $1
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "list course documents"))
    }

    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM course_students WHERE course_id = $1 AND student_id = $2)",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "check enrolment"))
    }

    async fn enroll(&self, course_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO course_students (course_id, student_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(course_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "enrol student"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&self, id: Uuid, changes: CourseChanges) -> Result<Option<Course>> {
        let sql = format!(
            r#"
            UPDATE courses SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                teacher_id = COALESCE($4, teacher_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COURSE_COLUMNS
        );

        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.teacher_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "update course"))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "delete course"))?;

        Ok(result.rows_affected() > 0)
    }
}
