use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::database::map_db_error;
use crate::core::error::Result;
use crate::features::auth::model::Role;
use crate::features::users::models::{NewUser, User, UserChanges};

const USER_COLUMNS: &str =
    "id, email, full_name, role, is_active, password_hash, created_at, updated_at";

/// Persistence port for user records.
///
/// Email uniqueness is enforced by the store; `create` and `update` surface a
/// violation as `AppError::Conflict`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// One page of users with `role`, ordered by name, plus the total count
    async fn list_by_role(&self, role: Role, offset: i64, limit: i64) -> Result<(Vec<User>, i64)>;

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>>;

    /// Remove the user together with their documents. Returns the blob
    /// locators of every document removed with the row, or `None` when there
    /// was no such user.
    async fn delete(&self, id: Uuid) -> Result<Option<Vec<String>>>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (email, full_name, role, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(user.role)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "create user"))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "load user"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "load user by email"))
    }

    async fn list_by_role(&self, role: Role, offset: i64, limit: i64) -> Result<(Vec<User>, i64)> {
        let sql = format!(
            "SELECT {} FROM users WHERE role = $1 ORDER BY full_name ASC, id ASC LIMIT $2 OFFSET $3",
            USER_COLUMNS
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "list users"))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "count users"))?;

        Ok((users, total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active),
                password_hash = COALESCE($6, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.full_name)
            .bind(changes.role)
            .bind(changes.is_active)
            .bind(changes.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "update user"))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vec<String>>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error(e, "delete user"))?;

        // Document inserts check their FK against this row and wait for the
        // lock, so the locator list below is complete
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_db_error(e, "delete user"))?;
        if locked.is_none() {
            return Ok(None);
        }

        let locators = sqlx::query_scalar::<_, String>(
            "DELETE FROM documents WHERE user_id = $1 RETURNING filename",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_db_error(e, "delete user documents"))?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error(e, "delete user"))?;

        tx.commit()
            .await
            .map_err(|e| map_db_error(e, "delete user"))?;

        Ok(Some(locators))
    }
}
