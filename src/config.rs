//! Configuration file parser for `sheetpress.toml`.
//!
//! The file names the seven feed URLs and where the artifact goes. Unlike
//! run settings, which have defaults, the feed table and output path are
//! mandatory: a config that is missing any of them is rejected before a
//! single request is made.
use crate::feed::{FeedKind, FeedSource, FetchLimits};
use crate::util::{validate_source_url, ImageLinks, UrlValidationError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("No URL configured for feed '{0}'")]
    MissingFeed(FeedKind),

    #[error("URL for feed '{0}' is empty")]
    EmptyUrl(FeedKind),

    #[error("URL for feed '{feed}' is invalid: {source}")]
    InvalidUrl {
        feed: FeedKind,
        #[source]
        source: UrlValidationError,
    },

    #[error("No output path configured (set `output` or pass --output)")]
    MissingOutput,

    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Source URL per feed. Each key also accepts the `<name>_csv_url` spelling.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedUrls {
    #[serde(alias = "general_csv_url")]
    pub general: Option<String>,
    #[serde(alias = "hero_csv_url")]
    pub hero: Option<String>,
    #[serde(alias = "about_csv_url")]
    pub about: Option<String>,
    #[serde(alias = "values_csv_url")]
    pub values: Option<String>,
    #[serde(alias = "services_csv_url")]
    pub services: Option<String>,
    #[serde(alias = "service_details_csv_url")]
    pub service_details: Option<String>,
    #[serde(alias = "contact_csv_url")]
    pub contact: Option<String>,
}

impl FeedUrls {
    fn get(&self, kind: FeedKind) -> Option<&str> {
        let url = match kind {
            FeedKind::General => &self.general,
            FeedKind::Hero => &self.hero,
            FeedKind::About => &self.about,
            FeedKind::Values => &self.values,
            FeedKind::Services => &self.services,
            FeedKind::ServiceDetails => &self.service_details,
            FeedKind::Contact => &self.contact,
        };
        url.as_deref()
    }
}

/// Top-level configuration.
///
/// All fields use `#[serde(default)]`; [`Config::load`] then enforces the
/// ones a run cannot do without.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Artifact destination.
    pub output: Option<PathBuf>,

    /// Per-feed fetch timeout in seconds.
    pub timeout_secs: u64,

    /// Per-feed response body cap in bytes.
    pub max_feed_bytes: usize,

    /// Transform applied to image links in the artifact.
    pub image_links: ImageLinks,

    pub feeds: FeedUrls,
}

impl Default for Config {
    fn default() -> Self {
        let limits = FetchLimits::default();
        Self {
            output: None,
            timeout_secs: limits.timeout.as_secs(),
            max_feed_bytes: limits.max_bytes,
            image_links: ImageLinks::default(),
            feeds: FeedUrls::default(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "output",
        "timeout_secs",
        "max_feed_bytes",
        "image_links",
        "feeds",
    ];

    /// Load and validate configuration from a TOML file.
    ///
    /// `output_override` replaces the file's `output` (from `--output` or
    /// `SHEETPRESS_OUTPUT`).
    ///
    /// - Missing file → `Err(ConfigError::NotFound)`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Any feed URL missing or malformed → `Err`
    pub fn load(path: &Path, output_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if output_override.is_some() {
            config.output = output_override;
        }
        config.validate()?;

        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses TOML without validating it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
            if let Some(feeds) = raw.get("feeds").and_then(toml::Value::as_table) {
                for key in feeds.keys() {
                    let base = key.strip_suffix("_csv_url").unwrap_or(key);
                    if !FeedKind::ALL.iter().any(|k| k.name() == base) {
                        tracing::warn!(key = %key, "Unknown feed in config file, ignoring");
                    }
                }
            }
        }

        Ok(toml::from_str(content)?)
    }

    /// Checks everything a run needs: all seven feed URLs, an output path,
    /// and a non-zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sources()?;
        if self.output.is_none() {
            return Err(ConfigError::MissingOutput);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Feed sources in [`FeedKind::ALL`] order.
    pub fn sources(&self) -> Result<Vec<FeedSource>, ConfigError> {
        FeedKind::ALL
            .iter()
            .map(|&kind| {
                let url = self.feeds.get(kind).ok_or(ConfigError::MissingFeed(kind))?;
                if url.trim().is_empty() {
                    return Err(ConfigError::EmptyUrl(kind));
                }
                let url = validate_source_url(url)
                    .map_err(|source| ConfigError::InvalidUrl { feed: kind, source })?;
                Ok(FeedSource {
                    kind,
                    url: url.into(),
                })
            })
            .collect()
    }

    pub fn output_path(&self) -> Result<&Path, ConfigError> {
        self.output.as_deref().ok_or(ConfigError::MissingOutput)
    }

    pub fn limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            max_bytes: self.max_feed_bytes,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
