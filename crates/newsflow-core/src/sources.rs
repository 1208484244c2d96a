use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::ConfigError;

fn default_enabled() -> bool {
    true
}

fn default_priority() -> i32 {
    100
}

/// One feed endpoint from `config/sources.yaml`.
///
/// Sources are seeded into the database from this file; retiring a source
/// means setting `enabled: false` here, never deleting the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub feed_url: String,
    pub language: Language,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower priority is fetched first within its language partition.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

impl SourceConfig {
    /// Generate a URL-safe slug from the source name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

/// Load and validate the source catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile = serde_yaml::from_str(&content)?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();
    let mut seen_urls = HashSet::new();

    for source in &sources_file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }

        if !source.feed_url.starts_with("http://") && !source.feed_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "source '{}' has a non-HTTP feed_url: {}",
                source.name, source.feed_url
            )));
        }

        let slug = source.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source slug: '{}' (from source '{}')",
                slug, source.name
            )));
        }

        if !seen_urls.insert(source.feed_url.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate feed_url: '{}'",
                source.feed_url
            )));
        }
    }

    Ok(())
}
