//! The cron pipeline entry point.
//!
//! One run = lock, ingest, cluster, enrich, unlock. Overlap is excluded by
//! the `cron_pipeline` lock; a crashed run self-heals when its lease
//! expires.

use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, warn};

use newsflow_agents::{GenerationClient, OperationLog, Orchestrator, OrchestratorConfig};
use newsflow_cluster::{cluster_unclustered_articles, ClusterOptions, EmbeddingsClient};
use newsflow_core::{load_sources, AppConfig, Language};
use newsflow_db::{
    complete_pipeline_run, create_pipeline_run, disable_sources_not_in, fail_pipeline_run,
    insert_article_if_new, list_clusters_needing_enrichment, list_enabled_sources, release_lock,
    start_pipeline_run, try_acquire_lock, upsert_source, NewArticle, PIPELINE_LOCK_NAME,
};
use newsflow_fetcher::{fetch_all_sources, FetchOptions, FetchReport, FetchSource};

use crate::error::PipelineError;
use crate::processor::{process_clusters, EnrichDeps, EnrichStats};

/// Why a pipeline invocation ended the way it did.
#[derive(Debug)]
pub enum RunOutcome {
    /// Another holder's lease is still valid. Normal, not an error.
    Skipped,
    Completed {
        run_id: i64,
        articles_ingested: usize,
        clusters_touched: usize,
    },
}

/// Run one full pipeline pass.
///
/// Lock contention returns `Ok(RunOutcome::Skipped)`. The lock is released
/// best-effort on every exit path; the TTL is the correctness backstop.
///
/// # Errors
///
/// Returns [`PipelineError`] when a run-fatal step fails (run bookkeeping,
/// source listing, clustering-level database errors). Per-source and
/// per-cluster failures are absorbed into stats instead.
pub async fn run_pipeline(
    pool: &PgPool,
    config: &AppConfig,
    trigger_source: &str,
) -> Result<RunOutcome, PipelineError> {
    let ttl = Duration::from_secs(u64::try_from(config.lock_ttl_minutes).unwrap_or(10) * 60);
    if !try_acquire_lock(pool, PIPELINE_LOCK_NAME, ttl).await? {
        info!("pipeline lock is held, skipping this run");
        return Ok(RunOutcome::Skipped);
    }

    let result = execute_run(pool, config, trigger_source).await;

    if let Err(e) = release_lock(pool, PIPELINE_LOCK_NAME).await {
        warn!(error = %e, "failed to release pipeline lock, lease will expire via TTL");
    }

    result
}

async fn execute_run(
    pool: &PgPool,
    config: &AppConfig,
    trigger_source: &str,
) -> Result<RunOutcome, PipelineError> {
    let run = create_pipeline_run(pool, trigger_source).await?;
    start_pipeline_run(pool, run.id).await?;
    info!(run_id = run.id, public_id = %run.public_id, trigger_source, "pipeline run started");

    match drive(pool, config).await {
        Ok((articles_ingested, enrich)) => {
            let notes = if enrich.errors.is_empty() {
                None
            } else {
                Some(format!("{} enrichment errors", enrich.errors.len()))
            };
            complete_pipeline_run(
                pool,
                run.id,
                i32::try_from(articles_ingested).unwrap_or(i32::MAX),
                i32::try_from(enrich.clusters_processed).unwrap_or(i32::MAX),
                notes.as_deref(),
            )
            .await?;
            info!(
                run_id = run.id,
                articles_ingested,
                clusters_touched = enrich.clusters_processed,
                "pipeline run succeeded"
            );
            Ok(RunOutcome::Completed {
                run_id: run.id,
                articles_ingested,
                clusters_touched: enrich.clusters_processed,
            })
        }
        Err(e) => {
            if let Err(mark) = fail_pipeline_run(pool, run.id, &e.to_string()).await {
                warn!(run_id = run.id, error = %mark, "failed to mark run as failed");
            }
            Err(e)
        }
    }
}

async fn drive(pool: &PgPool, config: &AppConfig) -> Result<(usize, EnrichStats), PipelineError> {
    let articles_ingested = fetch_and_ingest(pool, config).await?;

    let embedder = EmbeddingsClient::new(
        &config.embeddings_url,
        Duration::from_secs(config.fetch_timeout_secs),
    )?;
    let cluster_stats = cluster_unclustered_articles(
        pool,
        &embedder,
        ClusterOptions {
            similarity_threshold: config.similarity_threshold,
            lookback_hours: config.cluster_lookback_hours,
            ..ClusterOptions::default()
        },
    )
    .await?;
    info!(
        attached = cluster_stats.attached,
        created = cluster_stats.created,
        skipped = cluster_stats.skipped,
        "clustering finished"
    );

    let enrich = enrich_pending_clusters(pool, config).await?;
    Ok((articles_ingested, enrich))
}

/// Fetch every enabled source and insert the new articles.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] on database failure; individual feed
/// failures are already absorbed by the fetch pool.
pub async fn fetch_and_ingest(pool: &PgPool, config: &AppConfig) -> Result<usize, PipelineError> {
    let report = fetch_enabled_sources(pool, config).await?;

    let mut ingested = 0usize;
    for result in &report.results {
        for item in &result.items {
            let article = NewArticle {
                source_id: result.source_id,
                title: item.title.clone(),
                url: item.link.clone(),
                dedup_key: item.dedup_key(),
                published_at: item.published_at,
                excerpt: item.description.clone(),
                language: result.language.as_str().to_string(),
                image_url: item.image_url.clone(),
            };
            if insert_article_if_new(pool, &article).await?.is_some() {
                ingested += 1;
            }
        }
    }

    info!(
        fetched = report.total_items(),
        ingested, "ingestion finished"
    );
    Ok(ingested)
}

/// Fetch all enabled sources without touching the articles table.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the source listing fails.
pub async fn fetch_enabled_sources(
    pool: &PgPool,
    config: &AppConfig,
) -> Result<FetchReport, PipelineError> {
    let sources = list_enabled_sources(pool)
        .await?
        .into_iter()
        .map(|row| FetchSource {
            id: row.id,
            slug: row.slug,
            feed_url: row.feed_url,
            language: Language::parse(&row.language),
            priority: row.priority,
        })
        .collect();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent("newsflow/0.1 (+feed-aggregator)")
        .build()?;

    let options = FetchOptions {
        concurrency: config.fetch_concurrency,
        max_retries: config.fetch_max_retries,
        backoff_base_ms: config.fetch_backoff_base_ms,
    };

    Ok(fetch_all_sources(&client, sources, options).await)
}

/// Run the enrichment processor over every cluster that needs it.
///
/// # Errors
///
/// Returns [`PipelineError`] if the cluster selection or orchestrator
/// construction fails; per-cluster failures land in the returned stats.
pub async fn enrich_pending_clusters(
    pool: &PgPool,
    config: &AppConfig,
) -> Result<EnrichStats, PipelineError> {
    let cluster_ids = list_clusters_needing_enrichment(
        pool,
        config.cluster_lookback_hours,
        newsflow_agents::QUALITY_THRESHOLD,
    )
    .await?;

    if cluster_ids.is_empty() {
        return Ok(EnrichStats::default());
    }

    let client = GenerationClient::new(&config.generation_url, config.generation_api_key.clone())?;
    let orchestrator = Orchestrator::new(
        client,
        OrchestratorConfig::from_app_config(config),
        OperationLog::postgres(pool.clone()),
    );
    let deps = EnrichDeps {
        pool: pool.clone(),
        orchestrator,
    };

    Ok(process_clusters(&deps, cluster_ids, config.enrich_concurrency).await)
}

/// Sync the YAML source catalog into the `sources` table.
///
/// Catalog entries are upserted by slug; sources missing from the catalog
/// are disabled, never deleted.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] if the catalog cannot be read, or
/// [`PipelineError::Db`] on database failure.
pub async fn seed_sources(pool: &PgPool, config: &AppConfig) -> Result<usize, PipelineError> {
    let catalog = load_sources(&config.sources_path)?;

    let mut slugs = Vec::with_capacity(catalog.sources.len());
    for source in &catalog.sources {
        let slug = source.slug();
        upsert_source(
            pool,
            &slug,
            &source.name,
            &source.feed_url,
            source.language.as_str(),
            source.enabled,
            source.priority,
        )
        .await?;
        slugs.push(slug);
    }

    let disabled = disable_sources_not_in(pool, &slugs).await?;
    info!(
        seeded = slugs.len(),
        disabled, "source catalog synchronised"
    );
    Ok(slugs.len())
}
