//! Assignment of unclustered articles to event clusters.

use sqlx::PgPool;
use tracing::{debug, info, warn};

use newsflow_db::{
    articles::{assign_article_cluster, list_unclustered_articles, ArticleRow},
    clusters::{attach_article_to_cluster, create_cluster_for_article, list_cluster_candidates},
};

use crate::embeddings::EmbeddingsClient;
use crate::error::ClusterError;
use crate::similarity::{cosine_similarity, running_mean};

/// Tuning knobs for one clustering pass.
#[derive(Debug, Clone, Copy)]
pub struct ClusterOptions {
    /// Minimum cosine similarity for attaching to an existing cluster.
    pub similarity_threshold: f32,
    /// Only clusters active within this window are match candidates.
    pub lookback_hours: i64,
    /// Maximum articles examined per pass.
    pub batch_limit: i64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.82,
            lookback_hours: 48,
            batch_limit: 500,
        }
    }
}

/// What happened to one article during a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment {
    /// Attached to an existing cluster.
    Attached { cluster_id: i64, similarity: f32 },
    /// No candidate cleared the threshold; a new cluster was created.
    Created { cluster_id: i64 },
    /// Left unclustered (embedding unavailable); retried next pass.
    Skipped,
}

/// Counters for one clustering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    pub examined: usize,
    pub attached: usize,
    pub created: usize,
    pub skipped: usize,
}

/// In-memory view of a candidate, kept current within a pass so articles
/// from the same batch can land in a cluster created moments earlier.
struct Candidate {
    id: i64,
    centroid: Vec<f32>,
    article_count: i32,
}

/// Run one clustering pass over all unclustered articles.
///
/// Articles are embedded in a single batch. If the embeddings service is
/// down the whole batch is skipped with a warning and retried on the next
/// cycle; a clustering failure never aborts the pipeline.
///
/// # Errors
///
/// Returns [`ClusterError::Db`] if a database operation fails. Embedding
/// failures are absorbed into `skipped` counts, not raised.
pub async fn cluster_unclustered_articles(
    pool: &PgPool,
    embedder: &EmbeddingsClient,
    options: ClusterOptions,
) -> Result<ClusterStats, ClusterError> {
    let articles = list_unclustered_articles(pool, options.batch_limit).await?;
    if articles.is_empty() {
        return Ok(ClusterStats::default());
    }

    let mut stats = ClusterStats {
        examined: articles.len(),
        ..ClusterStats::default()
    };

    let texts: Vec<String> = articles.iter().map(embedding_text).collect();
    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let embeddings = match embedder.embed(&inputs).await {
        Ok(embeddings) => embeddings,
        Err(e) => {
            warn!(error = %e, count = articles.len(), "embedding batch failed, skipping pass");
            stats.skipped = articles.len();
            return Ok(stats);
        }
    };

    let mut candidates: Vec<Candidate> = list_cluster_candidates(pool, options.lookback_hours)
        .await?
        .into_iter()
        .map(|c| Candidate {
            id: c.id,
            centroid: c.centroid.0,
            article_count: c.article_count,
        })
        .collect();

    for (article, embedding) in articles.iter().zip(embeddings.iter()) {
        let assignment = assign_one(
            pool,
            article,
            embedding,
            &mut candidates,
            options.similarity_threshold,
        )
        .await?;

        match assignment {
            Assignment::Attached {
                cluster_id,
                similarity,
            } => {
                debug!(article_id = article.id, cluster_id, similarity, "attached");
                stats.attached += 1;
            }
            Assignment::Created { cluster_id } => {
                debug!(article_id = article.id, cluster_id, "created cluster");
                stats.created += 1;
            }
            Assignment::Skipped => stats.skipped += 1,
        }
    }

    info!(
        examined = stats.examined,
        attached = stats.attached,
        created = stats.created,
        skipped = stats.skipped,
        "clustering pass finished"
    );

    Ok(stats)
}

async fn assign_one(
    pool: &PgPool,
    article: &ArticleRow,
    embedding: &[f32],
    candidates: &mut Vec<Candidate>,
    threshold: f32,
) -> Result<Assignment, ClusterError> {
    if embedding.is_empty() {
        return Ok(Assignment::Skipped);
    }

    let best = candidates
        .iter_mut()
        .map(|c| {
            let similarity = cosine_similarity(&c.centroid, embedding);
            (c, similarity)
        })
        .max_by(|(_, a), (_, b)| a.total_cmp(b));

    if let Some((candidate, similarity)) = best {
        if similarity >= threshold {
            let new_centroid = running_mean(&candidate.centroid, candidate.article_count, embedding);
            // The article row must carry its cluster_id before the cluster's
            // source_count subquery runs.
            assign_article_cluster(pool, article.id, candidate.id, embedding).await?;
            attach_article_to_cluster(pool, candidate.id, article, &new_centroid).await?;

            candidate.centroid = new_centroid;
            candidate.article_count += 1;
            return Ok(Assignment::Attached {
                cluster_id: candidate.id,
                similarity,
            });
        }
    }

    let cluster_id = create_cluster_for_article(pool, article, embedding).await?;
    candidates.push(Candidate {
        id: cluster_id,
        centroid: embedding.to_vec(),
        article_count: 1,
    });

    Ok(Assignment::Created { cluster_id })
}

/// Text fed to the embedder: headline plus excerpt when available.
fn embedding_text(article: &ArticleRow) -> String {
    match &article.excerpt {
        Some(excerpt) if !excerpt.is_empty() => format!("{}\n{excerpt}", article.title),
        _ => article.title.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_text_includes_excerpt_when_present() {
        let article = ArticleRow {
            id: 1,
            source_id: 1,
            title: "Headline".into(),
            url: "https://x.example/a".into(),
            dedup_key: "k".into(),
            published_at: None,
            excerpt: Some("Lead paragraph.".into()),
            language: "en".into(),
            image_url: None,
            cluster_id: None,
            created_at: chrono::Utc::now(),
        };
        assert_eq!(embedding_text(&article), "Headline\nLead paragraph.");

        let bare = ArticleRow {
            excerpt: None,
            ..article
        };
        assert_eq!(embedding_text(&bare), "Headline");
    }
}
