//! Bounded per-language fetch pools.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use newsflow_core::{retry_with_backoff, Language};

use crate::feed::fetch_feed;
use crate::types::{FetchReport, FetchSource, SourceFetchResult};

/// Tuning knobs for a fetch pass.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Maximum in-flight requests per language partition.
    pub concurrency: usize,
    /// Retries per source on retriable errors.
    pub max_retries: u32,
    /// Base back-off delay in milliseconds.
    pub backoff_base_ms: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

/// Fetch every source, partitioned by language.
///
/// Each language gets its own bounded pool and the pools run
/// concurrently, so a stalled partition cannot starve the others.
/// Within a partition, sources are attempted in ascending priority
/// order. Failures are captured per source and never abort the pass.
pub async fn fetch_all_sources(
    client: &reqwest::Client,
    sources: Vec<FetchSource>,
    options: FetchOptions,
) -> FetchReport {
    let partitions: Vec<(Language, Vec<FetchSource>)> = Language::ALL
        .iter()
        .filter_map(|&language| {
            let mut partition: Vec<FetchSource> = sources
                .iter()
                .filter(|s| s.language == language)
                .cloned()
                .collect();
            if partition.is_empty() {
                return None;
            }
            partition.sort_by_key(|s| s.priority);
            Some((language, partition))
        })
        .collect();

    let pools = partitions
        .into_iter()
        .map(|(language, partition)| fetch_partition(client, language, partition, options));

    let mut results = Vec::with_capacity(sources.len());
    for partition_results in futures::future::join_all(pools).await {
        results.extend(partition_results);
    }

    let report = FetchReport::from_results(results);
    for stats in &report.stats {
        info!(
            language = stats.language.as_str(),
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            items = stats.items,
            "fetch partition finished"
        );
    }
    report
}

async fn fetch_partition(
    client: &reqwest::Client,
    language: Language,
    partition: Vec<FetchSource>,
    options: FetchOptions,
) -> Vec<SourceFetchResult> {
    stream::iter(partition)
        .map(|source| fetch_one(client, source, options))
        .buffer_unordered(options.concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .inspect(|result| {
            if !result.success {
                warn!(
                    language = language.as_str(),
                    slug = %result.slug,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "source fetch failed"
                );
            }
        })
        .collect()
}

async fn fetch_one(
    client: &reqwest::Client,
    source: FetchSource,
    options: FetchOptions,
) -> SourceFetchResult {
    let outcome = retry_with_backoff(
        options.max_retries,
        options.backoff_base_ms,
        crate::error::FetchError::is_retriable,
        || fetch_feed(client, &source.feed_url),
    )
    .await;

    match outcome {
        Ok(items) => SourceFetchResult {
            source_id: source.id,
            slug: source.slug,
            language: source.language,
            success: true,
            items,
            error: None,
        },
        Err(e) => SourceFetchResult {
            source_id: source.id,
            slug: source.slug,
            language: source.language,
            success: false,
            items: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}
