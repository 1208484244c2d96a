//! SEO metadata generation.

use serde::Deserialize;

use crate::capabilities::parse_json_payload;
use crate::client::GenerationClient;
use crate::context::ClusterContext;
use crate::error::AgentError;

pub const MAX_TITLE_CHARS: usize = 60;
pub const MAX_DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Clone, Deserialize)]
pub struct SeoPayload {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

const SYSTEM_PROMPT: &str = "You write SEO metadata for news stories. Respond with a single \
    JSON object: {\"title\": \"...\", \"description\": \"...\", \"keywords\": \"a, b, c\"}. \
    The title must be at most 60 characters, the description at most 160 characters, and \
    keywords a comma-separated list of 5-8 terms.";

/// Agent-path SEO generation. Over-length fields are clamped rather than
/// rejected; the contract is advisory for the model, binding for us.
///
/// # Errors
///
/// Propagates client errors and [`AgentError::MalformedOutput`] when the
/// response is not the contracted JSON shape.
pub async fn agent_seo(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
) -> Result<SeoPayload, AgentError> {
    let user = format!(
        "Headline: {}\nSummary: {}\nArticles:\n{}",
        ctx.headline(),
        ctx.summary_en.as_deref().unwrap_or("(none)"),
        ctx.article_digest(5),
    );

    let raw = client.complete(model, SYSTEM_PROMPT, &user).await?;
    let payload: SeoPayload = parse_json_payload(&raw)?;
    Ok(clamp(payload))
}

const FALLBACK_SYSTEM_PROMPT: &str = "Write SEO metadata for a news story. Respond with a \
    single JSON object: {\"title\": \"...\", \"description\": \"...\", \"keywords\": \"a, b, c\"}. \
    Title at most 60 characters, description at most 160 characters.";

/// Fallback: one direct model call with the same metadata contract, no
/// retries.
///
/// # Errors
///
/// Propagates client errors and [`AgentError::MalformedOutput`]; the
/// orchestrator degrades to [`deterministic_seo`] on failure.
pub async fn fallback_seo(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
) -> Result<SeoPayload, AgentError> {
    let user = format!(
        "Headline: {}\nSummary: {}",
        ctx.headline(),
        ctx.summary_en.as_deref().unwrap_or("(none)"),
    );

    let raw = client.complete(model, FALLBACK_SYSTEM_PROMPT, &user).await?;
    let payload: SeoPayload = parse_json_payload(&raw)?;
    Ok(clamp(payload))
}

/// Last resort: metadata derived from the headline and excerpts.
#[must_use]
pub fn deterministic_seo(ctx: &ClusterContext) -> SeoPayload {
    let headline = ctx.headline();
    let description_source = ctx
        .summary_en
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            ctx.articles
                .iter()
                .find_map(|a| a.excerpt.as_deref().filter(|e| !e.is_empty()))
        })
        .unwrap_or(headline);

    let keywords = headline
        .split_whitespace()
        .filter(|word| word.chars().count() > 4)
        .take(8)
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    clamp(SeoPayload {
        title: headline.to_string(),
        description: description_source.to_string(),
        keywords,
    })
}

fn clamp(payload: SeoPayload) -> SeoPayload {
    SeoPayload {
        title: clamp_chars(&payload.title, MAX_TITLE_CHARS),
        description: clamp_chars(&payload.description, MAX_DESCRIPTION_CHARS),
        keywords: payload.keywords,
    }
}

fn clamp_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.trim().to_string();
    }
    let mut clamped: String = text.chars().take(max.saturating_sub(1)).collect();
    clamped = clamped.trim_end().to_string();
    clamped.push('…');
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ArticleBrief;

    fn context() -> ClusterContext {
        ClusterContext {
            cluster_id: 1,
            title_en: Some("Central bank holds policy rates steady amid inflation fears".into()),
            title_si: None,
            title_ta: None,
            category: None,
            source_count: 2,
            summary_en: None,
            articles: vec![ArticleBrief {
                title: "Rates held".into(),
                excerpt: Some("The monetary board kept both rates unchanged.".into()),
                language: "en".into(),
                image_url: None,
            }],
        }
    }

    #[test]
    fn deterministic_metadata_derives_all_fields() {
        let payload = deterministic_seo(&context());
        assert!(payload.title.chars().count() <= MAX_TITLE_CHARS);
        assert_eq!(
            payload.description,
            "The monetary board kept both rates unchanged."
        );
        assert!(payload.keywords.contains("central"));
        assert!(payload.keywords.contains("inflation"));
        // Short connective words are not keywords.
        assert!(!payload.keywords.split(", ").any(|k| k == "amid"));
    }

    #[test]
    fn clamp_truncates_with_ellipsis() {
        let long = "x".repeat(200);
        let clamped = clamp_chars(&long, MAX_TITLE_CHARS);
        assert!(clamped.chars().count() <= MAX_TITLE_CHARS);
        assert!(clamped.ends_with('…'));
    }

    #[test]
    fn deterministic_metadata_without_excerpts_reuses_headline() {
        let mut ctx = context();
        ctx.articles.clear();
        let payload = deterministic_seo(&ctx);
        assert_eq!(payload.description, ctx.headline());
    }
}
