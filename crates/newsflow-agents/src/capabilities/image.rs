//! Image selection from member-article candidates.

use serde::Deserialize;

use crate::capabilities::parse_json_payload;
use crate::client::GenerationClient;
use crate::context::ClusterContext;
use crate::error::AgentError;

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub url: Option<String>,
}

const SYSTEM_PROMPT: &str = "You pick the single best lead image for a news story from a \
    candidate list. Prefer editorial photos over logos or icons. Respond with a single JSON \
    object: {\"url\": \"...\"} choosing one of the provided URLs, or {\"url\": null} if none \
    is suitable. Never invent a URL.";

/// Agent-path image selection, constrained to the candidate list. A model
/// answer outside the list is treated as malformed output.
///
/// # Errors
///
/// Propagates client errors and [`AgentError::MalformedOutput`] when the
/// response is shapeless or names a URL that was never offered.
pub async fn agent_image(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
) -> Result<ImagePayload, AgentError> {
    select_from_candidates(client, model, ctx, SYSTEM_PROMPT).await
}

const FALLBACK_SYSTEM_PROMPT: &str = "Pick the best lead image URL for a news story from the \
    candidate list. Respond with a single JSON object: {\"url\": \"...\"} naming one of the \
    listed URLs, or {\"url\": null} if none fits. Never invent a URL.";

/// Fallback: one direct model call over the same candidate list, no
/// retries. Empty candidate lists short-circuit to `None` without a call.
///
/// # Errors
///
/// Propagates client errors and [`AgentError::MalformedOutput`]; the
/// orchestrator degrades to [`deterministic_image`] on failure.
pub async fn fallback_image(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
) -> Result<ImagePayload, AgentError> {
    select_from_candidates(client, model, ctx, FALLBACK_SYSTEM_PROMPT).await
}

async fn select_from_candidates(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
    system: &str,
) -> Result<ImagePayload, AgentError> {
    let candidates = ctx.image_candidates();
    if candidates.is_empty() {
        return Ok(ImagePayload { url: None });
    }

    let user = format!(
        "Story: {}\nCandidates:\n{}",
        ctx.headline(),
        candidates
            .iter()
            .map(|url| format!("- {url}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );

    let raw = client.complete(model, system, &user).await?;
    let payload: ImagePayload = parse_json_payload(&raw)?;

    if let Some(url) = &payload.url {
        if !candidates.contains(&url.as_str()) {
            return Err(AgentError::MalformedOutput(format!(
                "model chose a URL outside the candidate list: {url}"
            )));
        }
    }

    Ok(payload)
}

/// Last resort: first well-formed candidate, or `None` when there are none.
#[must_use]
pub fn deterministic_image(ctx: &ClusterContext) -> ImagePayload {
    let url = ctx
        .image_candidates()
        .into_iter()
        .find(|url| is_well_formed(url))
        .map(str::to_string);

    ImagePayload { url }
}

fn is_well_formed(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && !url.contains(char::is_whitespace)
}
