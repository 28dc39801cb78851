use crate::core::config::DatabaseConfig;
use crate::core::error::AppError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// SQLSTATE raised by Postgres when a value cannot be parsed (e.g. malformed enum or uuid)
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await
}

/// Translate a store error into the application error taxonomy.
///
/// This is the single place where raw `sqlx` errors are interpreted. Callers
/// pass a short description of the operation so unmapped failures can be
/// logged with context before a generic error is surfaced.
pub fn map_db_error(error: sqlx::Error, operation: &str) -> AppError {
    match error {
        sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            tracing::debug!("Unique constraint violated while trying to {}", operation);
            AppError::Conflict("A record with the same unique data already exists".to_string())
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            tracing::debug!("Foreign key violated while trying to {}", operation);
            AppError::BadRequest(
                "The operation could not be completed because of related records".to_string(),
            )
        }
        sqlx::Error::Database(ref db_err)
            if db_err.code().as_deref() == Some(INVALID_TEXT_REPRESENTATION) =>
        {
            AppError::BadRequest("Invalid identifier".to_string())
        }
        other => {
            tracing::error!("Failed to {}: {:?}", operation, other);
            AppError::Database(other)
        }
    }
}
