//! Database operations for the `summaries` table.
//!
//! One row per cluster, overwritten in place — `version` counts rewrites.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `summaries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    pub cluster_id: i64,
    pub text_en: Option<String>,
    pub text_si: Option<String>,
    pub text_ta: Option<String>,
    pub quality: f32,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

/// Fetch the summary for a cluster, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_summary(pool: &PgPool, cluster_id: i64) -> Result<Option<SummaryRow>, DbError> {
    let row = sqlx::query_as::<_, SummaryRow>(
        "SELECT cluster_id, text_en, text_si, text_ta, quality, version, updated_at \
         FROM summaries \
         WHERE cluster_id = $1",
    )
    .bind(cluster_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert or overwrite a cluster's summary, bumping `version` on rewrite.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_summary(
    pool: &PgPool,
    cluster_id: i64,
    text_en: Option<&str>,
    text_si: Option<&str>,
    text_ta: Option<&str>,
    quality: f32,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO summaries (cluster_id, text_en, text_si, text_ta, quality) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (cluster_id) DO UPDATE SET \
             text_en    = EXCLUDED.text_en, \
             text_si    = EXCLUDED.text_si, \
             text_ta    = EXCLUDED.text_ta, \
             quality    = EXCLUDED.quality, \
             version    = summaries.version + 1, \
             updated_at = NOW()",
    )
    .bind(cluster_id)
    .bind(text_en)
    .bind(text_si)
    .bind(text_ta)
    .bind(quality)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fill missing translated summary texts. Existing texts always win.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_summary_translations(
    pool: &PgPool,
    cluster_id: i64,
    text_si: Option<&str>,
    text_ta: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE summaries SET \
             text_si    = COALESCE(text_si, $2), \
             text_ta    = COALESCE(text_ta, $3), \
             updated_at = NOW() \
         WHERE cluster_id = $1",
    )
    .bind(cluster_id)
    .bind(text_si)
    .bind(text_ta)
    .execute(pool)
    .await?;

    Ok(())
}
