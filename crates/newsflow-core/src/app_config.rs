use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Immutable application configuration, built once at startup and passed
/// down explicitly. Decision logic (agent rollout, thresholds) reads from
/// this value, never from ambient env state.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
    pub embeddings_url: String,
    pub similarity_threshold: f32,
    pub cluster_lookback_hours: i64,
    pub generation_url: String,
    pub generation_api_key: Option<String>,
    pub agents_enabled: bool,
    pub agent_rollout_percent: u8,
    pub model_summary: String,
    pub model_translation: String,
    pub model_seo: String,
    pub model_image: String,
    pub model_category: String,
    pub timeout_summary_secs: u64,
    pub timeout_translation_secs: u64,
    pub timeout_seo_secs: u64,
    pub timeout_image_secs: u64,
    pub timeout_category_secs: u64,
    pub lock_ttl_minutes: i64,
    pub enrich_concurrency: usize,
    pub pipeline_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("fetch_backoff_base_ms", &self.fetch_backoff_base_ms)
            .field("embeddings_url", &self.embeddings_url)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("cluster_lookback_hours", &self.cluster_lookback_hours)
            .field("generation_url", &self.generation_url)
            .field(
                "generation_api_key",
                &self.generation_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("agents_enabled", &self.agents_enabled)
            .field("agent_rollout_percent", &self.agent_rollout_percent)
            .field("model_summary", &self.model_summary)
            .field("model_translation", &self.model_translation)
            .field("model_seo", &self.model_seo)
            .field("model_image", &self.model_image)
            .field("model_category", &self.model_category)
            .field("timeout_summary_secs", &self.timeout_summary_secs)
            .field("timeout_translation_secs", &self.timeout_translation_secs)
            .field("timeout_seo_secs", &self.timeout_seo_secs)
            .field("timeout_image_secs", &self.timeout_image_secs)
            .field("timeout_category_secs", &self.timeout_category_secs)
            .field("lock_ttl_minutes", &self.lock_ttl_minutes)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field("pipeline_cron", &self.pipeline_cron)
            .finish()
    }
}
