use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API returned status {status}: {message}")]
    Generation { status: u16, message: String },

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("{capability} agent timed out after {secs}s")]
    Timeout { capability: String, secs: u64 },
}

impl AgentError {
    /// Short machine-readable kind for audit rows and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Http(_) => "http",
            AgentError::Generation { .. } => "generation",
            AgentError::MalformedOutput(_) => "malformed_output",
            AgentError::Timeout { .. } => "timeout",
        }
    }
}
