//! Database operations for `occurrence_submission`.
//!
//! A submission moves `submitted -> scraped` (inside the occurrence insert
//! transaction, see [`crate::insert_occurrences`]) or `submitted -> failed`.
//! Both end states are final; corrections arrive as a new submission.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub const SUBMISSION_SUBMITTED: &str = "submitted";
pub const SUBMISSION_SCRAPED: &str = "scraped";
pub const SUBMISSION_FAILED: &str = "failed";

/// A row from the `occurrence_submission` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub public_id: Uuid,
    /// Free-form label for where the submission came from, e.g. `"cli"`.
    pub source: String,
    pub input_file_name: Option<String>,
    pub status: String,
    /// The schema defines this as `INTEGER NOT NULL DEFAULT 0`.
    pub occurrence_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub scraped_at: Option<DateTime<Utc>>,
}

/// Registers a new submission in `submitted` status and returns the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_submission(
    pool: &PgPool,
    source: &str,
    input_file_name: Option<&str>,
) -> Result<SubmissionRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, SubmissionRow>(
        "INSERT INTO occurrence_submission (public_id, source, input_file_name, status) \
         VALUES ($1, $2, $3, 'submitted') \
         RETURNING id, public_id, source, input_file_name, status, occurrence_count, \
                   error_message, created_at, scraped_at",
    )
    .bind(public_id)
    .bind(source)
    .bind(input_file_name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a submission by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_submission(pool: &PgPool, id: i64) -> Result<SubmissionRow, DbError> {
    let row = sqlx::query_as::<_, SubmissionRow>(
        "SELECT id, public_id, source, input_file_name, status, occurrence_count, \
                error_message, created_at, scraped_at \
         FROM occurrence_submission \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Marks a `submitted` submission as `failed` with `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSubmissionTransition`] if the submission is not
/// in `submitted` status (or does not exist), or [`DbError::Sqlx`] if the
/// update fails.
pub async fn fail_submission(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE occurrence_submission \
         SET status = 'failed', error_message = $1 \
         WHERE id = $2 AND status = 'submitted'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSubmissionTransition {
            id,
            expected_status: SUBMISSION_SUBMITTED,
        });
    }

    Ok(())
}
