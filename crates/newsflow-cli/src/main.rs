//! Newsflow command line interface.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use newsflow_core::{load_app_config_from_env, AppConfig};
use newsflow_db::{connect_pool, run_migrations, PoolConfig};
use newsflow_pipeline::{
    enrich_pending_clusters, fetch_enabled_sources, run_pipeline, seed_sources, RunOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "newsflow")]
#[command(about = "News ingestion, clustering and enrichment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full pipeline pass (fetch, cluster, enrich).
    Run,
    /// Fetch all enabled feeds and print per-language stats, no ingestion.
    Fetch,
    /// Run only the enrichment processor over pending clusters.
    Enrich,
    /// Start the cron scheduler and run the pipeline on its schedule.
    Schedule,
    /// Sync config/sources.yaml into the sources table.
    SeedSources,
    /// Apply pending database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = load_app_config_from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let cli = Cli::parse();
    let pool = connect_pool(&config.database_url, PoolConfig::from_app_config(&config)).await?;

    match cli.command {
        Commands::Run => {
            run_migrations(&pool).await?;
            match run_pipeline(&pool, &config, "cli").await? {
                RunOutcome::Skipped => println!("pipeline lock held, run skipped"),
                RunOutcome::Completed {
                    run_id,
                    articles_ingested,
                    clusters_touched,
                } => println!(
                    "run {run_id}: {articles_ingested} articles ingested, \
                     {clusters_touched} clusters touched"
                ),
            }
        }
        Commands::Fetch => {
            let report = fetch_enabled_sources(&pool, &config).await?;
            for stats in &report.stats {
                println!(
                    "{}: {}/{} sources ok, {} items",
                    stats.language, stats.succeeded, stats.total, stats.items
                );
            }
            println!("total items: {}", report.total_items());
        }
        Commands::Enrich => {
            let stats = enrich_pending_clusters(&pool, &config).await?;
            println!(
                "{} clusters processed, {} failed, {} errors, took {:?}",
                stats.clusters_processed,
                stats.clusters_failed,
                stats.errors.len(),
                stats.duration
            );
            for err in &stats.errors {
                println!("  cluster {} [{}]: {}", err.cluster_id, err.stage, err.message);
            }
        }
        Commands::Schedule => {
            run_migrations(&pool).await?;
            schedule_pipeline(pool, config).await?;
        }
        Commands::SeedSources => {
            run_migrations(&pool).await?;
            let seeded = seed_sources(&pool, &config).await?;
            println!("{seeded} sources seeded from {}", config.sources_path.display());
        }
        Commands::Migrate => {
            run_migrations(&pool).await?;
            println!("migrations applied");
        }
    }

    Ok(())
}

/// Register the pipeline cron job and block until shutdown.
///
/// Overlapping fires are excluded by the pipeline lock, not the
/// scheduler, so a slow run simply makes the next fire a no-op.
async fn schedule_pipeline(pool: sqlx::PgPool, config: AppConfig) -> anyhow::Result<()> {
    let scheduler = JobScheduler::new().await?;
    let cron = config.pipeline_cron.clone();
    let pool = Arc::new(pool);
    let config = Arc::new(config);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            info!("scheduler: starting pipeline run");
            match run_pipeline(&pool, &config, "scheduler").await {
                Ok(RunOutcome::Skipped) => info!("scheduler: run skipped, lock held"),
                Ok(RunOutcome::Completed {
                    run_id,
                    articles_ingested,
                    clusters_touched,
                }) => info!(
                    run_id,
                    articles_ingested, clusters_touched, "scheduler: pipeline run complete"
                ),
                Err(e) => error!(error = %e, "scheduler: pipeline run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!(%cron, "scheduler started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}
