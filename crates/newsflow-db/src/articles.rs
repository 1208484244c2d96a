//! Database operations for the `articles` table.
//!
//! Articles are write-once: a row is created per unique `(source_id,
//! dedup_key)` pair and never modified afterwards except for the cluster
//! assignment (and the embedding cached alongside it).

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `articles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub dedup_key: String,
    pub published_at: Option<DateTime<Utc>>,
    pub excerpt: Option<String>,
    pub language: String,
    pub image_url: Option<String>,
    pub cluster_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new article, as produced by the fetch layer.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub dedup_key: String,
    pub published_at: Option<DateTime<Utc>>,
    pub excerpt: Option<String>,
    pub language: String,
    pub image_url: Option<String>,
}

/// Insert an article unless one already exists for `(source_id, dedup_key)`.
///
/// Returns `Some(id)` for a newly created row, `None` when the article was
/// already known (re-fetching a feed is a no-op).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_article_if_new(
    pool: &PgPool,
    article: &NewArticle,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO articles \
             (source_id, title, url, dedup_key, published_at, excerpt, language, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (source_id, dedup_key) DO NOTHING \
         RETURNING id",
    )
    .bind(article.source_id)
    .bind(&article.title)
    .bind(&article.url)
    .bind(&article.dedup_key)
    .bind(article.published_at)
    .bind(&article.excerpt)
    .bind(&article.language)
    .bind(&article.image_url)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// List articles that have no cluster yet, oldest first.
///
/// Articles left unclustered by an embedding failure reappear here on the
/// next cycle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unclustered_articles(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, source_id, title, url, dedup_key, published_at, excerpt, \
                language, image_url, cluster_id, created_at \
         FROM articles \
         WHERE cluster_id IS NULL \
         ORDER BY created_at, id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Set an article's cluster and cache the embedding computed for it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the article does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn assign_article_cluster(
    pool: &PgPool,
    article_id: i64,
    cluster_id: i64,
    embedding: &[f32],
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE articles SET cluster_id = $2, embedding = $3 WHERE id = $1")
        .bind(article_id)
        .bind(cluster_id)
        .bind(Json(embedding))
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// All member articles of a cluster, newest published first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cluster_articles(
    pool: &PgPool,
    cluster_id: i64,
) -> Result<Vec<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, source_id, title, url, dedup_key, published_at, excerpt, \
                language, image_url, cluster_id, created_at \
         FROM articles \
         WHERE cluster_id = $1 \
         ORDER BY published_at DESC NULLS LAST, id",
    )
    .bind(cluster_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
