use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod language;
pub mod retry;
pub mod sources;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use language::Language;
pub use retry::retry_with_backoff;
pub use sources::{load_sources, SourceConfig, SourcesFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),
    #[error("sources validation failed: {0}")]
    Validation(String),
}
