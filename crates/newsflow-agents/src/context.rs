//! Input snapshot handed to the capability layer.

use newsflow_db::{ArticleRow, ClusterRow};

/// A trimmed view of one member article.
#[derive(Debug, Clone)]
pub struct ArticleBrief {
    pub title: String,
    pub excerpt: Option<String>,
    pub language: String,
    pub image_url: Option<String>,
}

/// Everything a capability needs to know about one cluster, decoupled from
/// the database rows so capabilities stay storage-agnostic.
#[derive(Debug, Clone)]
pub struct ClusterContext {
    pub cluster_id: i64,
    pub title_en: Option<String>,
    pub title_si: Option<String>,
    pub title_ta: Option<String>,
    pub category: Option<String>,
    pub source_count: i32,
    pub summary_en: Option<String>,
    pub articles: Vec<ArticleBrief>,
}

impl ClusterContext {
    #[must_use]
    pub fn from_rows(cluster: &ClusterRow, articles: &[ArticleRow]) -> Self {
        Self {
            cluster_id: cluster.id,
            title_en: cluster.title_en.clone(),
            title_si: cluster.title_si.clone(),
            title_ta: cluster.title_ta.clone(),
            category: cluster.category.clone(),
            source_count: cluster.source_count,
            summary_en: None,
            articles: articles
                .iter()
                .map(|a| ArticleBrief {
                    title: a.title.clone(),
                    excerpt: a.excerpt.clone(),
                    language: a.language.clone(),
                    image_url: a.image_url.clone(),
                })
                .collect(),
        }
    }

    /// The best available headline, any language, English preferred.
    #[must_use]
    pub fn headline(&self) -> &str {
        self.title_en
            .as_deref()
            .or(self.title_si.as_deref())
            .or(self.title_ta.as_deref())
            .unwrap_or("")
    }

    /// Compact digest of member articles for prompt construction.
    #[must_use]
    pub fn article_digest(&self, max_articles: usize) -> String {
        self.articles
            .iter()
            .take(max_articles)
            .map(|a| match &a.excerpt {
                Some(excerpt) if !excerpt.is_empty() => {
                    format!("- [{}] {}: {}", a.language, a.title, excerpt)
                }
                _ => format!("- [{}] {}", a.language, a.title),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Image URLs offered by member articles, first-seen order, no dupes.
    #[must_use]
    pub fn image_candidates(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for article in &self.articles {
            if let Some(url) = article.image_url.as_deref() {
                if !url.is_empty() && !seen.contains(&url) {
                    seen.push(url);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_articles(articles: Vec<ArticleBrief>) -> ClusterContext {
        ClusterContext {
            cluster_id: 1,
            title_en: Some("Headline".into()),
            title_si: None,
            title_ta: None,
            category: None,
            source_count: 1,
            summary_en: None,
            articles,
        }
    }

    #[test]
    fn headline_prefers_english() {
        let mut ctx = context_with_articles(vec![]);
        assert_eq!(ctx.headline(), "Headline");

        ctx.title_en = None;
        ctx.title_si = Some("සිරස්තලය".into());
        assert_eq!(ctx.headline(), "සිරස්තලය");

        ctx.title_si = None;
        assert_eq!(ctx.headline(), "");
    }

    #[test]
    fn image_candidates_dedupe_and_skip_empty() {
        let ctx = context_with_articles(vec![
            ArticleBrief {
                title: "a".into(),
                excerpt: None,
                language: "en".into(),
                image_url: Some("https://x.example/1.jpg".into()),
            },
            ArticleBrief {
                title: "b".into(),
                excerpt: None,
                language: "en".into(),
                image_url: Some("https://x.example/1.jpg".into()),
            },
            ArticleBrief {
                title: "c".into(),
                excerpt: None,
                language: "si".into(),
                image_url: Some(String::new()),
            },
            ArticleBrief {
                title: "d".into(),
                excerpt: None,
                language: "ta".into(),
                image_url: Some("https://x.example/2.jpg".into()),
            },
        ]);

        assert_eq!(
            ctx.image_candidates(),
            vec!["https://x.example/1.jpg", "https://x.example/2.jpg"]
        );
    }
}
