//! Database operations for the `sources` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub feed_url: String,
    pub language: String,
    pub enabled: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

/// Insert or update a source from the catalog, keyed by slug.
///
/// Returns the source's `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_source(
    pool: &PgPool,
    slug: &str,
    name: &str,
    feed_url: &str,
    language: &str,
    enabled: bool,
    priority: i32,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO sources (slug, name, feed_url, language, enabled, priority) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (slug) DO UPDATE SET \
             name     = EXCLUDED.name, \
             feed_url = EXCLUDED.feed_url, \
             language = EXCLUDED.language, \
             enabled  = EXCLUDED.enabled, \
             priority = EXCLUDED.priority \
         RETURNING id",
    )
    .bind(slug)
    .bind(name)
    .bind(feed_url)
    .bind(language)
    .bind(enabled)
    .bind(priority)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Disable every source whose slug is not in `keep_slugs`.
///
/// Used after seeding so sources removed from the catalog stop being
/// fetched without losing their rows or articles.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn disable_sources_not_in(pool: &PgPool, keep_slugs: &[String]) -> Result<u64, DbError> {
    let result = sqlx::query("UPDATE sources SET enabled = FALSE WHERE slug <> ALL($1)")
        .bind(keep_slugs)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// List all enabled sources, ordered by language then ascending priority.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_enabled_sources(pool: &PgPool) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(
        "SELECT id, slug, name, feed_url, language, enabled, priority, created_at \
         FROM sources \
         WHERE enabled \
         ORDER BY language, priority, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
