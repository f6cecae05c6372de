//! Scraper configuration.
//!
//! Defaults point at the `microsoft/vscode-docs` release notes. Every value can be
//! overridden from the environment:
//!
//! - `CONTRIBUTORS_LISTING_URL` - contents API URL for the release-notes directory
//! - `CONTRIBUTORS_DOCUMENT_BASE_URL` - raw document base URL
//! - `CONTRIBUTORS_REFRESH_SECS` - background refresh interval
//! - `CONTRIBUTORS_TIMEOUT_SECS` - per-request timeout
//! - `CONTRIBUTORS_PREFETCH` - number of recent releases to pre-fetch
//! - `GITHUB_TOKEN` / `GH_TOKEN` - optional API token

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Listing endpoint for the release-notes directory.
pub const DEFAULT_LISTING_URL: &str =
    "https://api.github.com/repos/microsoft/vscode-docs/contents/release-notes";

/// Base URL that raw documents are served from.
pub const DEFAULT_DOCUMENT_BASE_URL: &str =
    "https://raw.githubusercontent.com/microsoft/vscode-docs/main/release-notes";

/// Used only when discovery fails before any catalog exists.
pub const SEED_VERSIONS: &[&str] = &["v1_109", "v1_108", "v1_107", "v1_106", "v1_105"];

/// Runtime configuration for the source, cache and refresher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub listing_url: String,
    pub document_base_url: String,
    /// Extension appended to a version id to form the document filename
    pub document_extension: String,
    pub request_timeout: Duration,
    pub refresh_interval: Duration,
    /// How many of the newest versions each refresh pre-fetches
    pub prefetch_count: usize,
    pub seed_versions: Vec<String>,
    pub user_agent: String,
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            document_base_url: DEFAULT_DOCUMENT_BASE_URL.to_string(),
            document_extension: "md".to_string(),
            request_timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(60 * 60),
            prefetch_count: 5,
            seed_versions: SEED_VERSIONS.iter().map(|s| s.to_string()).collect(),
            user_agent: "contributors-lib".to_string(),
            github_token: None,
        }
    }
}

impl ScraperConfig {
    /// Defaults with overrides from the process environment.
    ///
    /// ## Errors
    ///
    /// Returns `ConfigError` when an override is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// ## Examples
    ///
    /// ```
    /// use contributors_lib::ScraperConfig;
    /// use std::time::Duration;
    ///
    /// let config = ScraperConfig::from_lookup(|key| match key {
    ///     "CONTRIBUTORS_REFRESH_SECS" => Some("120".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.refresh_interval, Duration::from_secs(120));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("CONTRIBUTORS_LISTING_URL") {
            config.listing_url = parse_url("CONTRIBUTORS_LISTING_URL", &url)?;
        }
        if let Some(url) = get("CONTRIBUTORS_DOCUMENT_BASE_URL") {
            config.document_base_url = parse_url("CONTRIBUTORS_DOCUMENT_BASE_URL", &url)?;
        }
        if let Some(secs) = get("CONTRIBUTORS_REFRESH_SECS") {
            config.refresh_interval =
                Duration::from_secs(parse_positive("CONTRIBUTORS_REFRESH_SECS", &secs)?);
        }
        if let Some(secs) = get("CONTRIBUTORS_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_positive("CONTRIBUTORS_TIMEOUT_SECS", &secs)?);
        }
        if let Some(count) = get("CONTRIBUTORS_PREFETCH") {
            config.prefetch_count = parse_positive("CONTRIBUTORS_PREFETCH", &count)? as usize;
        }
        config.github_token = get("GITHUB_TOKEN").or_else(|| get("GH_TOKEN"));

        Ok(config)
    }

    /// Full URL of the raw document for a version id.
    pub fn document_url(&self, version_id: &str) -> String {
        format!(
            "{}/{}.{}",
            self.document_base_url.trim_end_matches('/'),
            version_id,
            self.document_extension
        )
    }
}

fn parse_positive(var: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_url(var: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::InvalidUrl {
            var: var.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.prefetch_count, 5);
        assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.seed_versions.len(), 5);
        assert_eq!(config.seed_versions[0], "v1_109");
    }

    #[test]
    fn test_document_url() {
        let config = ScraperConfig::default();
        assert_eq!(
            config.document_url("v1_109"),
            "https://raw.githubusercontent.com/microsoft/vscode-docs/main/release-notes/v1_109.md"
        );
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ScraperConfig::from_lookup(lookup(&[
            ("CONTRIBUTORS_LISTING_URL", "http://localhost:8080/list/"),
            ("CONTRIBUTORS_TIMEOUT_SECS", "5"),
            ("CONTRIBUTORS_PREFETCH", "3"),
            ("GH_TOKEN", "abc"),
        ]))
        .unwrap();

        assert_eq!(config.listing_url, "http://localhost:8080/list");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.prefetch_count, 3);
        assert_eq!(config.github_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_github_token_takes_precedence() {
        let config =
            ScraperConfig::from_lookup(lookup(&[("GITHUB_TOKEN", "one"), ("GH_TOKEN", "two")]))
                .unwrap();
        assert_eq!(config.github_token.as_deref(), Some("one"));
    }

    #[test]
    fn test_empty_values_ignored() {
        let config = ScraperConfig::from_lookup(lookup(&[("CONTRIBUTORS_PREFETCH", "  ")])).unwrap();
        assert_eq!(config, ScraperConfig::default());
    }

    #[test]
    fn test_invalid_number() {
        let err = ScraperConfig::from_lookup(lookup(&[("CONTRIBUTORS_REFRESH_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = ScraperConfig::from_lookup(lookup(&[("CONTRIBUTORS_PREFETCH", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn test_invalid_url() {
        let err = ScraperConfig::from_lookup(lookup(&[("CONTRIBUTORS_DOCUMENT_BASE_URL", "ftp://x")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidUrl {
                var: "CONTRIBUTORS_DOCUMENT_BASE_URL".to_string(),
                value: "ftp://x".to_string(),
            }
        );
    }
}
