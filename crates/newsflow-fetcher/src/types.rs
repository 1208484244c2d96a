use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use newsflow_core::Language;

/// One normalized item parsed out of a feed.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub guid: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl FeedItem {
    /// De-duplication key: the feed's guid when present, otherwise a stable
    /// hash of the link. The same item re-fetched later always produces the
    /// same key.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        match &self.guid {
            Some(guid) if !guid.trim().is_empty() => guid.trim().to_string(),
            _ => {
                let hash = Sha256::digest(self.link.as_bytes());
                let mut key = String::with_capacity(32);
                for byte in &hash[..16] {
                    key.push_str(&format!("{byte:02x}"));
                }
                key
            }
        }
    }
}

/// A source scheduled for fetching. Decoupled from the database row so the
/// fetch layer stays storage-agnostic.
#[derive(Debug, Clone)]
pub struct FetchSource {
    pub id: i64,
    pub slug: String,
    pub feed_url: String,
    pub language: Language,
    /// Lower priority is attempted first within the language partition.
    pub priority: i32,
}

/// The outcome for one source: items, or a captured error message.
/// A failed source never raises past the pool.
#[derive(Debug, Clone)]
pub struct SourceFetchResult {
    pub source_id: i64,
    pub slug: String,
    pub language: Language,
    pub success: bool,
    pub items: Vec<FeedItem>,
    pub error: Option<String>,
}

/// Aggregate counters for one language partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageFetchStats {
    pub language: Language,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: usize,
}

/// Full report for one fetch pass across all partitions.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub results: Vec<SourceFetchResult>,
    pub stats: Vec<LanguageFetchStats>,
}

impl FetchReport {
    /// Build per-language stats from raw results.
    #[must_use]
    pub fn from_results(results: Vec<SourceFetchResult>) -> Self {
        let stats = Language::ALL
            .iter()
            .filter_map(|&language| {
                let partition: Vec<&SourceFetchResult> =
                    results.iter().filter(|r| r.language == language).collect();
                if partition.is_empty() {
                    return None;
                }
                let succeeded = partition.iter().filter(|r| r.success).count();
                Some(LanguageFetchStats {
                    language,
                    total: partition.len(),
                    succeeded,
                    failed: partition.len() - succeeded,
                    items: partition.iter().map(|r| r.items.len()).sum(),
                })
            })
            .collect();

        Self { results, stats }
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.stats.iter().map(|s| s.items).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_prefers_guid() {
        let item = FeedItem {
            guid: Some("guid-42".to_string()),
            link: "https://example.com/a".to_string(),
            ..FeedItem::default()
        };
        assert_eq!(item.dedup_key(), "guid-42");
    }

    #[test]
    fn dedup_key_falls_back_to_stable_link_hash() {
        let item = FeedItem {
            guid: None,
            link: "https://example.com/a".to_string(),
            ..FeedItem::default()
        };
        let blank_guid = FeedItem {
            guid: Some("  ".to_string()),
            ..item.clone()
        };
        assert_eq!(item.dedup_key(), item.dedup_key(), "key must be stable");
        assert_eq!(item.dedup_key(), blank_guid.dedup_key());
        assert_eq!(item.dedup_key().len(), 32);

        let other = FeedItem {
            link: "https://example.com/b".to_string(),
            ..item.clone()
        };
        assert_ne!(item.dedup_key(), other.dedup_key());
    }

    #[test]
    fn report_aggregates_per_language() {
        let results = vec![
            SourceFetchResult {
                source_id: 1,
                slug: "a".into(),
                language: Language::En,
                success: true,
                items: vec![FeedItem::default(), FeedItem::default()],
                error: None,
            },
            SourceFetchResult {
                source_id: 2,
                slug: "b".into(),
                language: Language::En,
                success: false,
                items: vec![],
                error: Some("boom".into()),
            },
            SourceFetchResult {
                source_id: 3,
                slug: "c".into(),
                language: Language::Si,
                success: true,
                items: vec![FeedItem::default()],
                error: None,
            },
        ];

        let report = FetchReport::from_results(results);
        assert_eq!(report.total_items(), 3);

        let en = report
            .stats
            .iter()
            .find(|s| s.language == Language::En)
            .unwrap();
        assert_eq!(en.total, 2);
        assert_eq!(en.succeeded, 1);
        assert_eq!(en.failed, 1);
        assert_eq!(en.items, 2);

        assert!(
            !report.stats.iter().any(|s| s.language == Language::Ta),
            "languages with no sources get no stats entry"
        );
    }
}
