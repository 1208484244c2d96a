use serde::{Deserialize, Serialize};

/// Publication language of a source or article.
///
/// The pipeline runs one fetch pool per language, so every source carries
/// exactly one of these tags. Feeds whose language cannot be determined are
/// tagged `Unknown` and still fetched, in their own partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Si,
    Ta,
    Unknown,
}

impl Language {
    /// All partitions the fetch layer iterates over, in a stable order.
    pub const ALL: [Language; 4] = [Language::En, Language::Si, Language::Ta, Language::Unknown];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Si => "si",
            Language::Ta => "ta",
            Language::Unknown => "unknown",
        }
    }

    /// Parse a language tag. Unrecognized values map to `Unknown`.
    #[must_use]
    pub fn parse(s: &str) -> Language {
        match s {
            "en" => Language::En,
            "si" => Language::Si,
            "ta" => Language::Ta,
            _ => Language::Unknown,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
