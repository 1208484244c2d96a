//! Database operations for the `clusters` table.
//!
//! A cluster is one real-world story. Membership only grows: articles are
//! attached, never detached, and clusters are never hard-deleted — stale
//! ones simply fall out of the enrichment lookback window.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::articles::ArticleRow;
use crate::DbError;

/// A row from the `clusters` table (without the centroid payload).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClusterRow {
    pub id: i64,
    pub status: String,
    pub title_en: Option<String>,
    pub title_si: Option<String>,
    pub title_ta: Option<String>,
    pub category: Option<String>,
    pub article_count: i32,
    pub source_count: i32,
    pub image_url: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A nearest-neighbour candidate: cluster id plus its centroid vector.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClusterCandidate {
    pub id: i64,
    pub centroid: Json<Vec<f32>>,
    pub article_count: i32,
}

const CLUSTER_COLUMNS: &str = "id, status, title_en, title_si, title_ta, category, \
     article_count, source_count, image_url, seo_title, seo_description, seo_keywords, \
     first_seen_at, last_seen_at, created_at";

/// Fetch one cluster by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_cluster(pool: &PgPool, id: i64) -> Result<ClusterRow, DbError> {
    let row = sqlx::query_as::<_, ClusterRow>(&format!(
        "SELECT {CLUSTER_COLUMNS} FROM clusters WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Candidates for nearest-neighbour matching: clusters seen within the
/// lookback window that have a centroid.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cluster_candidates(
    pool: &PgPool,
    lookback_hours: i64,
) -> Result<Vec<ClusterCandidate>, DbError> {
    let rows = sqlx::query_as::<_, ClusterCandidate>(
        "SELECT id, centroid, article_count \
         FROM clusters \
         WHERE centroid IS NOT NULL \
           AND last_seen_at >= NOW() - make_interval(hours => $1) \
         ORDER BY last_seen_at DESC",
    )
    .bind(i32::try_from(lookback_hours).unwrap_or(i32::MAX))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Create a new draft cluster seeded with `article` as its sole member.
///
/// Sets the provisional headline for the article's language, assigns the
/// article, and returns the new cluster id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn create_cluster_for_article(
    pool: &PgPool,
    article: &ArticleRow,
    embedding: &[f32],
) -> Result<i64, DbError> {
    let (title_en, title_si, title_ta) = title_slots(&article.language, &article.title);

    let cluster_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO clusters \
             (status, title_en, title_si, title_ta, article_count, source_count, centroid, image_url) \
         VALUES ('draft', $1, $2, $3, 1, 1, $4, $5) \
         RETURNING id",
    )
    .bind(title_en)
    .bind(title_si)
    .bind(title_ta)
    .bind(Json(embedding))
    .bind(&article.image_url)
    .fetch_one(pool)
    .await?;

    crate::articles::assign_article_cluster(pool, article.id, cluster_id, embedding).await?;

    Ok(cluster_id)
}

/// Attach an already-assigned article to a cluster's metadata.
///
/// The caller must have set the article's `cluster_id` first (the
/// `source_count` subquery counts member rows). Updates counts, running-mean
/// centroid, `last_seen_at`, and fills the headline slot for the article's
/// language if still empty.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the cluster does not exist, or
/// [`DbError::Sqlx`] on query failure.
pub async fn attach_article_to_cluster(
    pool: &PgPool,
    cluster_id: i64,
    article: &ArticleRow,
    new_centroid: &[f32],
) -> Result<(), DbError> {
    let (title_en, title_si, title_ta) = title_slots(&article.language, &article.title);

    let result = sqlx::query(
        "UPDATE clusters SET \
             article_count = article_count + 1, \
             source_count  = (SELECT COUNT(DISTINCT source_id) FROM articles WHERE cluster_id = $1), \
             centroid      = $2, \
             last_seen_at  = NOW(), \
             title_en      = COALESCE(title_en, $3), \
             title_si      = COALESCE(title_si, $4), \
             title_ta      = COALESCE(title_ta, $5), \
             image_url     = COALESCE(image_url, $6) \
         WHERE id = $1",
    )
    .bind(cluster_id)
    .bind(Json(new_centroid))
    .bind(title_en)
    .bind(title_si)
    .bind(title_ta)
    .bind(&article.image_url)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Clusters seen within the lookback window whose enrichment is missing or
/// below the quality bar.
///
/// A missing image only keeps a cluster pending while a member article
/// actually carries an image URL; clusters whose candidates are exhausted
/// would otherwise requeue every cycle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_clusters_needing_enrichment(
    pool: &PgPool,
    lookback_hours: i64,
    min_quality: f32,
) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT c.id \
         FROM clusters c \
         LEFT JOIN summaries s ON s.cluster_id = c.id \
         WHERE c.last_seen_at >= NOW() - make_interval(hours => $1) \
           AND (s.cluster_id IS NULL \
             OR s.quality < $2 \
             OR s.text_si IS NULL \
             OR s.text_ta IS NULL \
             OR c.category IS NULL \
             OR c.seo_title IS NULL \
             OR (c.image_url IS NULL AND EXISTS (\
                   SELECT 1 FROM articles a \
                   WHERE a.cluster_id = c.id AND a.image_url IS NOT NULL))) \
         ORDER BY c.last_seen_at DESC",
    )
    .bind(i32::try_from(lookback_hours).unwrap_or(i32::MAX))
    .bind(min_quality)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Fill missing per-language headlines. Existing values always win.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_cluster_titles(
    pool: &PgPool,
    cluster_id: i64,
    title_en: Option<&str>,
    title_si: Option<&str>,
    title_ta: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE clusters SET \
             title_en = COALESCE(title_en, $2), \
             title_si = COALESCE(title_si, $3), \
             title_ta = COALESCE(title_ta, $4) \
         WHERE id = $1",
    )
    .bind(cluster_id)
    .bind(title_en)
    .bind(title_si)
    .bind(title_ta)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store SEO metadata for a cluster.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_cluster_seo(
    pool: &PgPool,
    cluster_id: i64,
    title: &str,
    description: &str,
    keywords: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE clusters SET seo_title = $2, seo_description = $3, seo_keywords = $4 WHERE id = $1",
    )
    .bind(cluster_id)
    .bind(title)
    .bind(description)
    .bind(keywords)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store the selected image URL for a cluster.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_cluster_image(pool: &PgPool, cluster_id: i64, url: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE clusters SET image_url = $2 WHERE id = $1")
        .bind(cluster_id)
        .bind(url)
        .execute(pool)
        .await?;

    Ok(())
}

/// Store the category for a cluster.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_cluster_category(
    pool: &PgPool,
    cluster_id: i64,
    category: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE clusters SET category = $2 WHERE id = $1")
        .bind(cluster_id)
        .bind(category)
        .execute(pool)
        .await?;

    Ok(())
}

/// Move a cluster from `draft` to `published`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn publish_cluster(pool: &PgPool, cluster_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE clusters SET status = 'published' WHERE id = $1 AND status = 'draft'")
        .bind(cluster_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Map an article's language tag onto the three headline columns.
fn title_slots<'a>(
    language: &str,
    title: &'a str,
) -> (Option<&'a str>, Option<&'a str>, Option<&'a str>) {
    match language {
        "si" => (None, Some(title), None),
        "ta" => (None, None, Some(title)),
        // Unknown-language titles land in the English slot so every cluster
        // has at least one provisional headline.
        _ => (Some(title), None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_slots_routes_by_language() {
        assert_eq!(title_slots("en", "t"), (Some("t"), None, None));
        assert_eq!(title_slots("si", "t"), (None, Some("t"), None));
        assert_eq!(title_slots("ta", "t"), (None, None, Some("t")));
        assert_eq!(title_slots("unknown", "t"), (Some("t"), None, None));
    }
}
