//! Cluster summary generation.

use serde::Deserialize;

use crate::capabilities::parse_json_payload;
use crate::client::GenerationClient;
use crate::context::ClusterContext;
use crate::error::AgentError;

/// Generated summary texts, English always present.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryPayload {
    pub text_en: String,
    #[serde(default)]
    pub text_si: Option<String>,
    #[serde(default)]
    pub text_ta: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are a news desk editor. Summarize the story described by the \
    provided articles in 3-5 factual sentences. Respond with a single JSON object: \
    {\"text_en\": \"...\", \"text_si\": null, \"text_ta\": null}. Fill text_si and text_ta only \
    when source material in that language is available. No markdown, no commentary.";

/// Agent-path summary with an instruction contract and JSON output.
///
/// `attempt` > 0 tightens the instructions; the quality loop uses it to
/// steer regeneration away from whatever scored poorly.
///
/// # Errors
///
/// Propagates client errors and [`AgentError::MalformedOutput`] when the
/// response is not the contracted JSON shape.
pub async fn agent_summary(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
    attempt: u32,
) -> Result<SummaryPayload, AgentError> {
    let retry_note = if attempt == 0 {
        String::new()
    } else {
        format!(
            "\nAttempt {}: the previous summary failed quality checks. \
             Write complete sentences, 40-200 words, no lists, no meta commentary.",
            attempt + 1
        )
    };

    let user = format!(
        "Story headline: {}\nArticles:\n{}{retry_note}",
        ctx.headline(),
        ctx.article_digest(12),
    );

    let raw = client.complete(model, SYSTEM_PROMPT, &user).await?;
    let payload: SummaryPayload = parse_json_payload(&raw)?;

    if payload.text_en.trim().is_empty() {
        return Err(AgentError::MalformedOutput(
            "summary payload has empty text_en".to_string(),
        ));
    }

    Ok(payload)
}

/// Fallback: one direct completion, plain text, no quality retries.
///
/// # Errors
///
/// Propagates client errors.
pub async fn fallback_summary(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
) -> Result<SummaryPayload, AgentError> {
    let user = format!(
        "Summarize this news story in 3 plain English sentences:\n{}\n{}",
        ctx.headline(),
        ctx.article_digest(6),
    );

    let text = client
        .complete(model, "You summarize news stories concisely.", &user)
        .await?;

    Ok(SummaryPayload {
        text_en: text.trim().to_string(),
        text_si: None,
        text_ta: None,
    })
}
