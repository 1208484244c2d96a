//! Translation of headlines and summary text into missing languages.

use serde::Deserialize;

use crate::capabilities::parse_json_payload;
use crate::client::GenerationClient;
use crate::context::ClusterContext;
use crate::error::AgentError;

/// Translations for whichever slots were missing. `None` means the model
/// had nothing to add for that slot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslationPayload {
    #[serde(default)]
    pub title_si: Option<String>,
    #[serde(default)]
    pub title_ta: Option<String>,
    #[serde(default)]
    pub text_si: Option<String>,
    #[serde(default)]
    pub text_ta: Option<String>,
}

impl TranslationPayload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title_si.is_none()
            && self.title_ta.is_none()
            && self.text_si.is_none()
            && self.text_ta.is_none()
    }
}

const SYSTEM_PROMPT: &str = "You are a professional news translator for English, Sinhala and \
    Tamil. Translate only the requested fields. Respond with a single JSON object using keys \
    title_si, title_ta, text_si, text_ta; use null for fields you were not asked to fill. \
    Preserve names, numbers and places exactly.";

/// Which slots the caller wants filled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationRequest {
    pub title_si: bool,
    pub title_ta: bool,
    pub text_si: bool,
    pub text_ta: bool,
}

impl TranslationRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.title_si || self.title_ta || self.text_si || self.text_ta)
    }

    fn describe(&self) -> String {
        let mut wanted = Vec::new();
        if self.title_si {
            wanted.push("title_si (Sinhala headline)");
        }
        if self.title_ta {
            wanted.push("title_ta (Tamil headline)");
        }
        if self.text_si {
            wanted.push("text_si (Sinhala summary)");
        }
        if self.text_ta {
            wanted.push("text_ta (Tamil summary)");
        }
        wanted.join(", ")
    }
}

fn build_user_prompt(ctx: &ClusterContext, request: TranslationRequest) -> String {
    format!(
        "Fields to fill: {}\nEnglish headline: {}\nEnglish summary: {}",
        request.describe(),
        ctx.headline(),
        ctx.summary_en.as_deref().unwrap_or("(none)"),
    )
}

/// Agent-path translation with a JSON output contract.
///
/// # Errors
///
/// Propagates client errors and [`AgentError::MalformedOutput`] when the
/// response is not the contracted JSON shape.
pub async fn agent_translation(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
    request: TranslationRequest,
) -> Result<TranslationPayload, AgentError> {
    let user = build_user_prompt(ctx, request);
    let raw = client.complete(model, SYSTEM_PROMPT, &user).await?;
    parse_json_payload(&raw)
}

/// Fallback: same primitive, one direct call, no contract retries.
///
/// # Errors
///
/// Propagates client errors and [`AgentError::MalformedOutput`] when the
/// response is not valid JSON.
pub async fn fallback_translation(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
    request: TranslationRequest,
) -> Result<TranslationPayload, AgentError> {
    let user = format!(
        "{}\nRespond with only the JSON object.",
        build_user_prompt(ctx, request)
    );
    let raw = client
        .complete(
            model,
            "Translate news text to Sinhala and Tamil. JSON output only.",
            &user,
        )
        .await?;
    parse_json_payload(&raw)
}
