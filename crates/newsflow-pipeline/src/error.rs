use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Db(#[from] newsflow_db::DbError),

    #[error(transparent)]
    Cluster(#[from] newsflow_cluster::ClusterError),

    #[error(transparent)]
    Agent(#[from] newsflow_agents::AgentError),

    #[error(transparent)]
    Config(#[from] newsflow_core::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
