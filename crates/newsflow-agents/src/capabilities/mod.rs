//! The five enrichment capabilities.
//!
//! Each capability module exposes an `agent_*` function (model-backed, with
//! a strict output contract) and a `fallback_*` function returning the same
//! payload type. The orchestrator chooses between them; nothing in here
//! decides paths or applies timeouts.

use serde::de::DeserializeOwned;

use crate::error::AgentError;

pub mod category;
pub mod image;
pub mod seo;
pub mod summary;
pub mod translation;

/// Capability identity, used for decisions, timeouts and audit rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Summary,
    Translation,
    Seo,
    Image,
    Category,
}

impl Capability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Summary => "summary",
            Capability::Translation => "translation",
            Capability::Seo => "seo",
            Capability::Image => "image",
            Capability::Category => "category",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a JSON payload out of raw model text.
///
/// Models wrap JSON in markdown fences or preamble text often enough that
/// the parser scans for the outermost object instead of trusting the whole
/// message.
pub(crate) fn parse_json_payload<T: DeserializeOwned>(raw: &str) -> Result<T, AgentError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => {
            return Err(AgentError::MalformedOutput(
                "no JSON object found in model output".to_string(),
            ))
        }
    };

    serde_json::from_str(json)
        .map_err(|e| AgentError::MalformedOutput(format!("invalid JSON payload: {e}")))
}
