//! Pipeline assembly: ingest, cluster, enrich, under one lock.

mod batch;
mod error;
mod processor;
mod run;

pub use batch::process_in_batches;
pub use error::PipelineError;
pub use processor::{
    process_clusters, CapabilityStats, EnrichDeps, EnrichError, EnrichStats,
};
pub use run::{
    enrich_pending_clusters, fetch_and_ingest, fetch_enabled_sources, run_pipeline, seed_sources,
    RunOutcome,
};
