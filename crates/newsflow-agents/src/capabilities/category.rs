//! Closed-vocabulary categorization.

use crate::client::GenerationClient;
use crate::context::ClusterContext;
use crate::error::AgentError;

/// The closed category vocabulary. Anything outside it normalizes to
/// `general`.
pub const CATEGORIES: &[&str] = &[
    "politics",
    "business",
    "sports",
    "technology",
    "health",
    "entertainment",
    "world",
    "general",
];

pub const DEFAULT_CATEGORY: &str = "general";

const SYSTEM_PROMPT: &str = "Classify the news story into exactly one category: politics, \
    business, sports, technology, health, entertainment, world, general. Respond with only \
    the category word, lowercase. If uncertain, respond with general.";

/// Agent-path categorization. Output is normalized against the vocabulary,
/// so a chatty model answer still lands on a valid category.
///
/// # Errors
///
/// Propagates client errors.
pub async fn agent_category(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
) -> Result<String, AgentError> {
    let user = format!(
        "Headline: {}\nArticles:\n{}",
        ctx.headline(),
        ctx.article_digest(5),
    );

    let raw = client.complete(model, SYSTEM_PROMPT, &user).await?;
    Ok(normalize(&raw))
}

const FALLBACK_SYSTEM_PROMPT: &str = "Name the single best category for this news story: \
    politics, business, sports, technology, health, entertainment, world or general. Respond \
    with only the category word, lowercase.";

/// Fallback: one direct model call, answer collapsed onto the vocabulary.
///
/// # Errors
///
/// Propagates client errors; the orchestrator degrades to
/// [`keyword_category`] on failure.
pub async fn fallback_category(
    client: &GenerationClient,
    model: &str,
    ctx: &ClusterContext,
) -> Result<String, AgentError> {
    let user = format!("Headline: {}", ctx.headline());
    let raw = client.complete(model, FALLBACK_SYSTEM_PROMPT, &user).await?;
    Ok(normalize(&raw))
}

/// Last resort: keyword heuristics over headline and excerpts.
#[must_use]
pub fn keyword_category(ctx: &ClusterContext) -> String {
    let mut haystack = ctx.headline().to_lowercase();
    for article in &ctx.articles {
        haystack.push(' ');
        haystack.push_str(&article.title.to_lowercase());
        if let Some(excerpt) = &article.excerpt {
            haystack.push(' ');
            haystack.push_str(&excerpt.to_lowercase());
        }
    }

    let rules: &[(&str, &[&str])] = &[
        ("politics", &["parliament", "minister", "election", "cabinet", "president", "policy"]),
        ("business", &["economy", "market", "bank", "inflation", "trade", "rupee", "export"]),
        ("sports", &["cricket", "match", "tournament", "football", "athlete", "medal"]),
        ("technology", &["tech", "software", "startup", "digital", "internet", "ai "]),
        ("health", &["hospital", "health", "vaccine", "dengue", "doctor", "disease"]),
        ("entertainment", &["film", "music", "actor", "festival", "concert", "cinema"]),
        ("world", &["united nations", "foreign", "global", "international", "border"]),
    ];

    for (category, keywords) in rules {
        if keywords.iter().any(|k| haystack.contains(k)) {
            return (*category).to_string();
        }
    }

    DEFAULT_CATEGORY.to_string()
}

/// Collapse model output onto the closed vocabulary.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    let first_word = cleaned
        .split(|c: char| !c.is_alphabetic())
        .find(|w| !w.is_empty())
        .unwrap_or("");

    if CATEGORIES.contains(&first_word) {
        first_word.to_string()
    } else {
        DEFAULT_CATEGORY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ArticleBrief;

    fn context(title: &str, excerpt: &str) -> ClusterContext {
        ClusterContext {
            cluster_id: 1,
            title_en: Some(title.to_string()),
            title_si: None,
            title_ta: None,
            category: None,
            source_count: 1,
            summary_en: None,
            articles: vec![ArticleBrief {
                title: title.to_string(),
                excerpt: Some(excerpt.to_string()),
                language: "en".into(),
                image_url: None,
            }],
        }
    }

    #[test]
    fn normalize_accepts_exact_and_chatty_answers() {
        assert_eq!(normalize("sports"), "sports");
        assert_eq!(normalize("  Politics.\n"), "politics");
        assert_eq!(normalize("business, probably"), "business");
    }

    #[test]
    fn normalize_defaults_unknown_to_general() {
        assert_eq!(normalize("astrology"), "general");
        assert_eq!(normalize(""), "general");
        assert_eq!(normalize("I think this is about many things"), "general");
    }

    #[test]
    fn keyword_rules_match_the_vocabulary() {
        let ctx = context(
            "Sri Lanka seal series win",
            "The cricket side chased down the target.",
        );
        assert_eq!(keyword_category(&ctx), "sports");
    }

    #[test]
    fn keyword_rules_default_to_general() {
        let ctx = context("Village fair draws crowds", "Stalls lined the main street.");
        assert_eq!(keyword_category(&ctx), DEFAULT_CATEGORY);
    }
}
