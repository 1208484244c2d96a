//! Agent-vs-fallback orchestration.
//!
//! The decision function is pure; randomness and clocks live only in the
//! thin wrappers around it. Every invocation is recorded through the
//! [`OperationLog`], including the ones that fail.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use newsflow_core::AppConfig;
use newsflow_db::NewAgentOperation;

use crate::capabilities::category::{agent_category, fallback_category, keyword_category};
use crate::capabilities::image::{agent_image, deterministic_image, fallback_image, ImagePayload};
use crate::capabilities::seo::{agent_seo, deterministic_seo, fallback_seo, SeoPayload};
use crate::capabilities::summary::{agent_summary, fallback_summary, SummaryPayload};
use crate::capabilities::translation::{
    agent_translation, fallback_translation, TranslationPayload, TranslationRequest,
};
use crate::capabilities::Capability;
use crate::client::{truncate, GenerationClient};
use crate::context::ClusterContext;
use crate::error::AgentError;
use crate::oplog::OperationLog;
use crate::quality::{score_summary, MAX_ATTEMPTS, QUALITY_THRESHOLD};

/// Immutable orchestration policy, built once from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub enabled: bool,
    pub rollout_percent: u8,
    pub model_summary: String,
    pub model_translation: String,
    pub model_seo: String,
    pub model_image: String,
    pub model_category: String,
    pub timeout_summary: Duration,
    pub timeout_translation: Duration,
    pub timeout_seo: Duration,
    pub timeout_image: Duration,
    pub timeout_category: Duration,
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.agents_enabled,
            rollout_percent: config.agent_rollout_percent,
            model_summary: config.model_summary.clone(),
            model_translation: config.model_translation.clone(),
            model_seo: config.model_seo.clone(),
            model_image: config.model_image.clone(),
            model_category: config.model_category.clone(),
            timeout_summary: Duration::from_secs(config.timeout_summary_secs),
            timeout_translation: Duration::from_secs(config.timeout_translation_secs),
            timeout_seo: Duration::from_secs(config.timeout_seo_secs),
            timeout_image: Duration::from_secs(config.timeout_image_secs),
            timeout_category: Duration::from_secs(config.timeout_category_secs),
        }
    }

    #[must_use]
    pub fn model(&self, capability: Capability) -> &str {
        match capability {
            Capability::Summary => &self.model_summary,
            Capability::Translation => &self.model_translation,
            Capability::Seo => &self.model_seo,
            Capability::Image => &self.model_image,
            Capability::Category => &self.model_category,
        }
    }

    #[must_use]
    pub fn timeout(&self, capability: Capability) -> Duration {
        match capability {
            Capability::Summary => self.timeout_summary,
            Capability::Translation => self.timeout_translation,
            Capability::Seo => self.timeout_seo,
            Capability::Image => self.timeout_image,
            Capability::Category => self.timeout_category,
        }
    }
}

/// An input known to need agent-level quality regardless of rollout:
/// multi-source stories and every translation request.
#[must_use]
pub fn is_complex(capability: Capability, source_count: i32) -> bool {
    source_count > 3 || capability == Capability::Translation
}

/// Pure path decision. `draw` is a uniform sample in 0..100 supplied by
/// the caller, so the policy is deterministic under test.
#[must_use]
pub fn decide(
    config: &OrchestratorConfig,
    capability: Capability,
    source_count: i32,
    draw: u8,
) -> bool {
    if !config.enabled {
        return false;
    }
    if is_complex(capability, source_count) {
        return true;
    }
    draw < config.rollout_percent
}

/// The orchestration entry point: holds the client, policy and audit log.
pub struct Orchestrator {
    client: GenerationClient,
    config: OrchestratorConfig,
    log: OperationLog,
}

impl Orchestrator {
    #[must_use]
    pub fn new(client: GenerationClient, config: OrchestratorConfig, log: OperationLog) -> Self {
        Self {
            client,
            config,
            log,
        }
    }

    #[must_use]
    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    fn use_agent(&self, capability: Capability, source_count: i32) -> bool {
        decide(
            &self.config,
            capability,
            source_count,
            rand::random_range(0..100),
        )
    }

    async fn with_timeout<T, F>(&self, capability: Capability, fut: F) -> Result<T, AgentError>
    where
        F: std::future::Future<Output = Result<T, AgentError>>,
    {
        let limit = self.config.timeout(capability);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                capability: capability.as_str().to_string(),
                secs: limit.as_secs(),
            }),
        }
    }

    async fn record(
        &self,
        ctx: &ClusterContext,
        capability: Capability,
        path: &str,
        status: &str,
        started: Instant,
        quality: Option<f32>,
        output: Option<&str>,
    ) {
        self.log
            .record(NewAgentOperation {
                cluster_id: Some(ctx.cluster_id),
                capability: capability.as_str().to_string(),
                path: path.to_string(),
                status: status.to_string(),
                duration_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
                quality,
                model: Some(self.config.model(capability).to_string()),
                input_snippet: Some(truncate(ctx.headline(), 180)),
                output_snippet: output.map(|o| truncate(o, 180)),
            })
            .await;
    }

    fn failure_status(error: &AgentError) -> &'static str {
        match error {
            AgentError::Timeout { .. } => "timeout",
            _ => "failed",
        }
    }

    /// Generate a summary, quality loop included.
    ///
    /// Agent path: up to [`MAX_ATTEMPTS`] generations, keeping the
    /// best-scoring text; the loop exits early once a text clears
    /// [`QUALITY_THRESHOLD`]. Any agent error drops to the fallback.
    ///
    /// # Errors
    ///
    /// Propagates the original agent error only when the fallback also
    /// fails, or the fallback's own error when the agent path was never
    /// selected.
    pub async fn summary(
        &self,
        ctx: &ClusterContext,
    ) -> Result<(SummaryPayload, f32), AgentError> {
        let capability = Capability::Summary;
        let started = Instant::now();

        let agent_error = if self.use_agent(capability, ctx.source_count) {
            match self.agent_summary_loop(ctx).await {
                Ok((payload, score)) => {
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        "success",
                        started,
                        Some(score),
                        Some(&payload.text_en),
                    )
                    .await;
                    return Ok((payload, score));
                }
                Err(e) => {
                    warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                        "summary agent failed, falling back");
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        Self::failure_status(&e),
                        started,
                        None,
                        None,
                    )
                    .await;
                    Some(e)
                }
            }
        } else {
            None
        };

        let fallback_started = Instant::now();
        match self
            .with_timeout(
                capability,
                fallback_summary(&self.client, self.config.model(capability), ctx),
            )
            .await
        {
            Ok(payload) => {
                let score = score_summary(&payload.text_en);
                self.record(
                    ctx,
                    capability,
                    "fallback",
                    "success",
                    fallback_started,
                    Some(score),
                    Some(&payload.text_en),
                )
                .await;
                Ok((payload, score))
            }
            Err(fallback_error) => {
                self.record(
                    ctx,
                    capability,
                    "fallback",
                    Self::failure_status(&fallback_error),
                    fallback_started,
                    None,
                    None,
                )
                .await;
                Err(agent_error.unwrap_or(fallback_error))
            }
        }
    }

    async fn agent_summary_loop(
        &self,
        ctx: &ClusterContext,
    ) -> Result<(SummaryPayload, f32), AgentError> {
        let capability = Capability::Summary;
        let mut best: Option<(SummaryPayload, f32)> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let payload = self
                .with_timeout(
                    capability,
                    agent_summary(&self.client, self.config.model(capability), ctx, attempt),
                )
                .await?;

            let score = score_summary(&payload.text_en);
            if best.as_ref().map_or(true, |(_, b)| score > *b) {
                best = Some((payload, score));
            }
            if score >= QUALITY_THRESHOLD {
                break;
            }
            info!(
                cluster_id = ctx.cluster_id,
                attempt, score, "summary below quality bar, regenerating"
            );
        }

        best.ok_or_else(|| {
            AgentError::MalformedOutput("summary loop produced no candidate".to_string())
        })
    }

    /// Fill missing translations. Translation requests always count as
    /// complex, so the agent path runs whenever agents are enabled.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::summary`] for the propagation rule.
    pub async fn translation(
        &self,
        ctx: &ClusterContext,
        request: TranslationRequest,
    ) -> Result<TranslationPayload, AgentError> {
        let capability = Capability::Translation;
        if request.is_empty() {
            return Ok(TranslationPayload::default());
        }
        let started = Instant::now();
        let model = self.config.model(capability);

        let agent_error = if self.use_agent(capability, ctx.source_count) {
            match self
                .with_timeout(capability, agent_translation(&self.client, model, ctx, request))
                .await
            {
                Ok(payload) => {
                    self.record(ctx, capability, "agent", "success", started, None, None)
                        .await;
                    return Ok(payload);
                }
                Err(e) => {
                    warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                        "translation agent failed, falling back");
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        Self::failure_status(&e),
                        started,
                        None,
                        None,
                    )
                    .await;
                    Some(e)
                }
            }
        } else {
            None
        };

        let fallback_started = Instant::now();
        match self
            .with_timeout(
                capability,
                fallback_translation(&self.client, model, ctx, request),
            )
            .await
        {
            Ok(payload) => {
                self.record(
                    ctx,
                    capability,
                    "fallback",
                    "success",
                    fallback_started,
                    None,
                    None,
                )
                .await;
                Ok(payload)
            }
            Err(fallback_error) => {
                self.record(
                    ctx,
                    capability,
                    "fallback",
                    Self::failure_status(&fallback_error),
                    fallback_started,
                    None,
                    None,
                )
                .await;
                Err(agent_error.unwrap_or(fallback_error))
            }
        }
    }

    /// Generate SEO metadata. The fallback makes one direct model call and
    /// degrades to locally derived metadata, so this never errors.
    pub async fn seo(&self, ctx: &ClusterContext) -> SeoPayload {
        let capability = Capability::Seo;
        let started = Instant::now();

        if self.use_agent(capability, ctx.source_count) {
            match self
                .with_timeout(
                    capability,
                    agent_seo(&self.client, self.config.model(capability), ctx),
                )
                .await
            {
                Ok(payload) => {
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        "success",
                        started,
                        None,
                        Some(&payload.title),
                    )
                    .await;
                    return payload;
                }
                Err(e) => {
                    warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                        "seo agent failed, falling back");
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        Self::failure_status(&e),
                        started,
                        None,
                        None,
                    )
                    .await;
                }
            }
        }

        let fallback_started = Instant::now();
        let payload = match self
            .with_timeout(
                capability,
                fallback_seo(&self.client, self.config.model(capability), ctx),
            )
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                    "seo fallback call failed, deriving metadata locally");
                deterministic_seo(ctx)
            }
        };
        self.record(
            ctx,
            capability,
            "fallback",
            "success",
            fallback_started,
            None,
            Some(&payload.title),
        )
        .await;
        payload
    }

    /// Select a lead image. The fallback makes one direct model call over
    /// the candidate list and degrades to the first well-formed candidate,
    /// so this never errors.
    pub async fn image(&self, ctx: &ClusterContext) -> ImagePayload {
        let capability = Capability::Image;
        let started = Instant::now();

        if self.use_agent(capability, ctx.source_count) {
            match self
                .with_timeout(
                    capability,
                    agent_image(&self.client, self.config.model(capability), ctx),
                )
                .await
            {
                Ok(payload) => {
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        "success",
                        started,
                        None,
                        payload.url.as_deref(),
                    )
                    .await;
                    return payload;
                }
                Err(e) => {
                    warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                        "image agent failed, falling back");
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        Self::failure_status(&e),
                        started,
                        None,
                        None,
                    )
                    .await;
                }
            }
        }

        let fallback_started = Instant::now();
        let payload = match self
            .with_timeout(
                capability,
                fallback_image(&self.client, self.config.model(capability), ctx),
            )
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                    "image fallback call failed, choosing candidate locally");
                deterministic_image(ctx)
            }
        };
        self.record(
            ctx,
            capability,
            "fallback",
            "success",
            fallback_started,
            None,
            payload.url.as_deref(),
        )
        .await;
        payload
    }

    /// Categorize the cluster. The fallback makes one direct model call
    /// and degrades to keyword heuristics, so this never errors.
    pub async fn category(&self, ctx: &ClusterContext) -> String {
        let capability = Capability::Category;
        let started = Instant::now();

        if self.use_agent(capability, ctx.source_count) {
            match self
                .with_timeout(
                    capability,
                    agent_category(&self.client, self.config.model(capability), ctx),
                )
                .await
            {
                Ok(category) => {
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        "success",
                        started,
                        None,
                        Some(&category),
                    )
                    .await;
                    return category;
                }
                Err(e) => {
                    warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                        "category agent failed, falling back");
                    self.record(
                        ctx,
                        capability,
                        "agent",
                        Self::failure_status(&e),
                        started,
                        None,
                        None,
                    )
                    .await;
                }
            }
        }

        let fallback_started = Instant::now();
        let category = match self
            .with_timeout(
                capability,
                fallback_category(&self.client, self.config.model(capability), ctx),
            )
            .await
        {
            Ok(category) => category,
            Err(e) => {
                warn!(cluster_id = ctx.cluster_id, error = %e, kind = e.kind(),
                    "category fallback call failed, using keyword rules");
                keyword_category(ctx)
            }
        };
        self.record(
            ctx,
            capability,
            "fallback",
            "success",
            fallback_started,
            None,
            Some(&category),
        )
        .await;
        category
    }
}
