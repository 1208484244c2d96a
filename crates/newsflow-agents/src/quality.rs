//! Summary quality scoring.
//!
//! The score is a deterministic 0-1 signal built from length bounds,
//! sentence structure, and forbidden-pattern checks. It gates the
//! regeneration loop and is persisted alongside the summary.

use std::sync::LazyLock;

use regex::Regex;

/// Threshold below which a summary is regenerated.
pub const QUALITY_THRESHOLD: f32 = 0.7;

/// Maximum generation attempts before accepting the best-scoring text.
pub const MAX_ATTEMPTS: u32 = 3;

const MIN_WORDS: usize = 20;
const MAX_WORDS: usize = 250;

static FORBIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)as an ai|language model|i cannot|i can't|here is a summary|here's a summary|lorem ipsum|\[insert|```",
    )
    .expect("valid regex")
});

/// Score a summary text on a 0-1 scale.
///
/// Penalties stack: out-of-bounds length, too few sentences, list
/// formatting, and forbidden meta phrases each cost a fixed share. An
/// empty text scores 0.
#[must_use]
pub fn score_summary(text: &str) -> f32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let mut score = 1.0f32;

    let words = trimmed.split_whitespace().count();
    if words < MIN_WORDS || words > MAX_WORDS {
        score -= 0.4;
    }

    let sentences = trimmed
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    if sentences < 2 {
        score -= 0.3;
    }

    // Summaries are prose; bullet lists mean the output contract leaked.
    if trimmed.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with('-') || line.starts_with('*') || line.starts_with('#')
    }) {
        score -= 0.2;
    }

    if FORBIDDEN_RE.is_match(trimmed) {
        score -= 0.5;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good_summary() -> String {
        "The government announced a new fuel pricing formula on Monday. Officials said \
         the change takes effect next month and applies to all grades. Opposition \
         lawmakers criticised the timing of the announcement. Analysts expect a modest \
         price reduction at the pump."
            .to_string()
    }

    #[test]
    fn well_formed_summary_clears_threshold() {
        let score = score_summary(&good_summary());
        assert!(score >= QUALITY_THRESHOLD, "got {score}");
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(score_summary(""), 0.0);
        assert_eq!(score_summary("   \n"), 0.0);
    }

    #[test]
    fn too_short_text_is_penalized() {
        let score = score_summary("Fuel prices changed. Good news.");
        assert!(score < QUALITY_THRESHOLD, "got {score}");
    }

    #[test]
    fn meta_phrases_are_penalized() {
        let text = format!("Here is a summary: {}", good_summary());
        let score = score_summary(&text);
        assert!(score < QUALITY_THRESHOLD, "got {score}");
    }

    #[test]
    fn list_formatting_is_penalized() {
        let listy = good_summary().replace(". ", ".\n- ");
        assert!(score_summary(&listy) < score_summary(&good_summary()));
    }
}
