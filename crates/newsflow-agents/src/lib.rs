//! Agent-backed enrichment with deterministic fallbacks.
//!
//! Five capabilities (summary, translation, SEO, image, category), each
//! with an agent path and a fallback path, fronted by an orchestrator that
//! decides the path per invocation, bounds it with a timeout, and records
//! every call in the `agent_operations` audit trail.

pub mod capabilities;
mod client;
mod context;
mod error;
mod oplog;
mod orchestrator;
pub mod quality;

pub use capabilities::category::{DEFAULT_CATEGORY, CATEGORIES};
pub use capabilities::image::ImagePayload;
pub use capabilities::seo::SeoPayload;
pub use capabilities::summary::SummaryPayload;
pub use capabilities::translation::{TranslationPayload, TranslationRequest};
pub use capabilities::Capability;
pub use client::GenerationClient;
pub use context::{ArticleBrief, ClusterContext};
pub use error::AgentError;
pub use oplog::OperationLog;
pub use orchestrator::{decide, is_complex, Orchestrator, OrchestratorConfig};
pub use quality::{score_summary, MAX_ATTEMPTS, QUALITY_THRESHOLD};
