//! Parallel cluster enrichment.
//!
//! Clusters run through the five capabilities in sequence; clusters
//! themselves run in settle-all batches. Every stage persists its own
//! result, and a stage failure is recorded without aborting the cluster's
//! remaining stages or any sibling cluster.

use std::time::{Duration, Instant};

use sqlx::PgPool;
use tracing::{info, warn};

use newsflow_agents::{
    Capability, ClusterContext, Orchestrator, TranslationRequest, QUALITY_THRESHOLD,
};
use newsflow_db::{
    get_cluster, get_summary, list_cluster_articles, publish_cluster, set_cluster_category,
    set_cluster_image, set_cluster_seo, set_cluster_titles, update_summary_translations,
    upsert_summary, DbError,
};

use crate::batch::process_in_batches;

/// Everything the processor needs, bundled so per-cluster futures can
/// borrow one value.
pub struct EnrichDeps {
    pub pool: PgPool,
    pub orchestrator: Orchestrator,
}

/// Per-capability counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// One recorded failure, scoped to a cluster and stage.
#[derive(Debug, Clone)]
pub struct EnrichError {
    pub cluster_id: i64,
    pub stage: String,
    pub message: String,
}

/// Aggregate outcome of one enrichment pass.
#[derive(Debug, Default)]
pub struct EnrichStats {
    pub clusters_processed: usize,
    pub clusters_failed: usize,
    pub summary: CapabilityStats,
    pub translation: CapabilityStats,
    pub seo: CapabilityStats,
    pub image: CapabilityStats,
    pub category: CapabilityStats,
    pub duration: Duration,
    pub errors: Vec<EnrichError>,
}

enum StageResult {
    Skipped,
    Done,
    Failed(String),
}

impl EnrichStats {
    fn capability_mut(&mut self, capability: Capability) -> &mut CapabilityStats {
        match capability {
            Capability::Summary => &mut self.summary,
            Capability::Translation => &mut self.translation,
            Capability::Seo => &mut self.seo,
            Capability::Image => &mut self.image,
            Capability::Category => &mut self.category,
        }
    }

    fn absorb(&mut self, cluster_id: i64, stages: &[(Capability, StageResult)]) {
        let mut any_failed = false;
        for (capability, result) in stages {
            match result {
                StageResult::Skipped => {}
                StageResult::Done => {
                    let stats = self.capability_mut(*capability);
                    stats.attempted += 1;
                    stats.succeeded += 1;
                }
                StageResult::Failed(message) => {
                    let stats = self.capability_mut(*capability);
                    stats.attempted += 1;
                    stats.failed += 1;
                    any_failed = true;
                    self.errors.push(EnrichError {
                        cluster_id,
                        stage: capability.as_str().to_string(),
                        message: message.clone(),
                    });
                }
            }
        }
        self.clusters_processed += 1;
        if any_failed {
            self.clusters_failed += 1;
        }
    }
}

/// Enrich `cluster_ids` in batches of `max_concurrency`.
pub async fn process_clusters(
    deps: &EnrichDeps,
    cluster_ids: Vec<i64>,
    max_concurrency: usize,
) -> EnrichStats {
    let started = Instant::now();
    let mut stats = EnrichStats::default();

    let outcomes = process_in_batches(cluster_ids, max_concurrency, |cluster_id| async move {
        (cluster_id, enrich_cluster(deps, cluster_id).await)
    })
    .await;

    for (cluster_id, outcome) in outcomes {
        match outcome {
            Ok(stages) => stats.absorb(cluster_id, &stages),
            Err(e) => {
                warn!(cluster_id, error = %e, "cluster enrichment could not start");
                stats.clusters_processed += 1;
                stats.clusters_failed += 1;
                stats.errors.push(EnrichError {
                    cluster_id,
                    stage: "load".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    stats.duration = started.elapsed();
    info!(
        processed = stats.clusters_processed,
        failed = stats.clusters_failed,
        errors = stats.errors.len(),
        duration_ms = u64::try_from(stats.duration.as_millis()).unwrap_or(u64::MAX),
        "enrichment pass finished"
    );
    stats
}

/// Run the capability sequence for one cluster.
///
/// Stages that already meet their freshness bar are skipped; each stage
/// persists before the next runs; a stage failure is captured and the
/// sequence continues.
async fn enrich_cluster(
    deps: &EnrichDeps,
    cluster_id: i64,
) -> Result<Vec<(Capability, StageResult)>, DbError> {
    let pool = &deps.pool;
    let cluster = get_cluster(pool, cluster_id).await?;
    let articles = list_cluster_articles(pool, cluster_id).await?;
    let summary = get_summary(pool, cluster_id).await?;

    let mut ctx = ClusterContext::from_rows(&cluster, &articles);
    ctx.summary_en = summary.as_ref().and_then(|s| s.text_en.clone());

    let mut stages = Vec::with_capacity(6);

    // Summary: skip when the stored one already clears the quality bar.
    let summary_fresh = summary
        .as_ref()
        .is_some_and(|s| s.quality >= QUALITY_THRESHOLD && s.text_en.is_some());
    if summary_fresh {
        stages.push((Capability::Summary, StageResult::Skipped));
    } else {
        let result = match deps.orchestrator.summary(&ctx).await {
            Ok((payload, quality)) => {
                ctx.summary_en = Some(payload.text_en.clone());
                persist(
                    upsert_summary(
                        pool,
                        cluster_id,
                        Some(&payload.text_en),
                        payload.text_si.as_deref(),
                        payload.text_ta.as_deref(),
                        quality,
                    )
                    .await,
                )
            }
            Err(e) => StageResult::Failed(e.to_string()),
        };
        stages.push((Capability::Summary, result));
    }

    // Translation: only the slots still missing.
    let stored = get_summary(pool, cluster_id).await?;
    let request = TranslationRequest {
        title_si: cluster.title_si.is_none(),
        title_ta: cluster.title_ta.is_none(),
        text_si: stored.as_ref().map_or(true, |s| s.text_si.is_none()),
        text_ta: stored.as_ref().map_or(true, |s| s.text_ta.is_none()),
    };
    if request.is_empty() {
        stages.push((Capability::Translation, StageResult::Skipped));
    } else {
        let result = match deps.orchestrator.translation(&ctx, request).await {
            Ok(payload) => {
                let titles = set_cluster_titles(
                    pool,
                    cluster_id,
                    None,
                    payload.title_si.as_deref(),
                    payload.title_ta.as_deref(),
                )
                .await;
                let texts = update_summary_translations(
                    pool,
                    cluster_id,
                    payload.text_si.as_deref(),
                    payload.text_ta.as_deref(),
                )
                .await;
                persist(titles.and(texts))
            }
            Err(e) => StageResult::Failed(e.to_string()),
        };
        stages.push((Capability::Translation, result));
    }

    // SEO.
    if cluster.seo_title.is_some() {
        stages.push((Capability::Seo, StageResult::Skipped));
    } else {
        let payload = deps.orchestrator.seo(&ctx).await;
        let result = persist(
            set_cluster_seo(
                pool,
                cluster_id,
                &payload.title,
                &payload.description,
                &payload.keywords,
            )
            .await,
        );
        stages.push((Capability::Seo, result));
    }

    // Image.
    if cluster.image_url.is_some() {
        stages.push((Capability::Image, StageResult::Skipped));
    } else {
        let payload = deps.orchestrator.image(&ctx).await;
        let result = match payload.url {
            Some(url) => persist(set_cluster_image(pool, cluster_id, &url).await),
            // No candidates is a legitimate outcome, not a failure.
            None => StageResult::Done,
        };
        stages.push((Capability::Image, result));
    }

    // Category.
    if cluster.category.is_some() {
        stages.push((Capability::Category, StageResult::Skipped));
    } else {
        let category = deps.orchestrator.category(&ctx).await;
        let result = persist(set_cluster_category(pool, cluster_id, &category).await);
        stages.push((Capability::Category, result));
    }

    if let Err(e) = publish_cluster(pool, cluster_id).await {
        warn!(cluster_id, error = %e, "failed to publish cluster");
    }

    Ok(stages)
}

fn persist(result: Result<(), DbError>) -> StageResult {
    match result {
        Ok(()) => StageResult::Done,
        Err(e) => StageResult::Failed(format!("persistence failed: {e}")),
    }
}
