//! The distributed pipeline lock and `pipeline_runs` lifecycle.
//!
//! The lock is a single row per logical name holding a `locked_until`
//! lease. Acquisition is one atomic conditional upsert, so two concurrent
//! callers can never both succeed; a crashed holder self-heals once the
//! lease expires.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Lock name used by the scheduled pipeline.
pub const PIPELINE_LOCK_NAME: &str = "cron_pipeline";

/// Try to acquire the named lock for `ttl`.
///
/// Succeeds if no row exists for `name` or the existing lease has expired.
/// The `WHERE locked_until <= NOW()` predicate on the conflict branch makes
/// stale-lock recovery race-free: of two concurrent takers, exactly one
/// sees the expired lease.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn try_acquire_lock(pool: &PgPool, name: &str, ttl: Duration) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO pipeline_locks (name, locked_until) \
         VALUES ($1, NOW() + make_interval(secs => $2)) \
         ON CONFLICT (name) DO UPDATE SET \
             locked_until = EXCLUDED.locked_until \
         WHERE pipeline_locks.locked_until <= NOW()",
    )
    .bind(name)
    .bind(ttl.as_secs_f64())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Release the named lock by expiring its lease immediately.
///
/// The row is kept (not deleted) so acquisition stays a plain upsert.
/// Callers treat failures as log-only: correctness rests on TTL expiry,
/// not on release succeeding.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn release_lock(pool: &PgPool, name: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE pipeline_locks SET locked_until = NOW() WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether the named lock currently holds an unexpired lease.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_locked(pool: &PgPool, name: &str) -> Result<bool, DbError> {
    let locked = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM pipeline_locks WHERE name = $1 AND locked_until > NOW())",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(locked)
}

// ---------------------------------------------------------------------------
// pipeline_runs operations
// ---------------------------------------------------------------------------

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub articles_ingested: i32,
    pub clusters_touched: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Creates a new pipeline run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_pipeline_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<PipelineRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, PipelineRunRow>(
        "INSERT INTO pipeline_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING id, public_id, trigger_source, status, started_at, completed_at, \
                   articles_ingested, clusters_touched, error_message, created_at",
    )
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_pipeline_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` with its final counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_pipeline_run(
    pool: &PgPool,
    id: i64,
    articles_ingested: i32,
    clusters_touched: i32,
    notes: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             articles_ingested = $1, clusters_touched = $2, error_message = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(articles_ingested)
    .bind(clusters_touched)
    .bind(notes)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_pipeline_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_pipeline_run(pool: &PgPool, id: i64) -> Result<PipelineRunRow, DbError> {
    let row = sqlx::query_as::<_, PipelineRunRow>(
        "SELECT id, public_id, trigger_source, status, started_at, completed_at, \
                articles_ingested, clusters_touched, error_message, created_at \
         FROM pipeline_runs \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}
