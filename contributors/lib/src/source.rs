//! Outbound access to the release-notes repository.
//!
//! [`DocumentSource`] is the seam the cache is built on: production code uses
//! [`GitHubSource`], tests inject an in-memory fake.

use crate::config::ScraperConfig;
use crate::error::{DiscoveryError, FetchError};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// One entry of the release-notes directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingEntry {
    pub name: String,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// GitHub API error response.
#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

/// Capability to list and fetch release-notes documents.
///
/// Uses native async functions in traits; implementations must be `Send + Sync`
/// so a single source can serve the refresher and request handlers at once.
pub trait DocumentSource: Send + Sync {
    /// List the files in the release-notes directory.
    ///
    /// ## Errors
    ///
    /// Returns `DiscoveryError` on transport failure, non-success status or an
    /// undecodable body.
    fn list_entries(&self) -> impl Future<Output = Result<Vec<ListingEntry>, DiscoveryError>> + Send;

    /// Fetch the raw text of one version's document.
    ///
    /// ## Errors
    ///
    /// Returns `FetchError` on transport failure (including timeout) or a
    /// non-success status.
    fn fetch_document(
        &self,
        version_id: &str,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// [`DocumentSource`] backed by the GitHub contents API and raw file host.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    config: ScraperConfig,
}

impl GitHubSource {
    /// Creates a source with its own HTTP client.
    ///
    /// ## Errors
    ///
    /// Returns `reqwest::Error` if the client cannot be constructed (TLS backend
    /// initialization failure).
    pub fn new(config: ScraperConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a source sharing an existing client.
    pub fn with_client(client: Client, config: ScraperConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        self.config.request_timeout
    }
}

fn quota_exhausted(headers: &reqwest::header::HeaderMap) -> bool {
    headers
        .get("X-RateLimit-Remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok())
        == Some(0)
}

impl DocumentSource for GitHubSource {
    async fn list_entries(&self) -> Result<Vec<ListingEntry>, DiscoveryError> {
        let mut request = self
            .client
            .get(&self.config.listing_url)
            .header("Accept", "application/vnd.github+json")
            .timeout(self.timeout());

        if let Some(token) = &self.config.github_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;

        // GitHub signals an exhausted quota as 429, or as 403 with no remaining calls
        let status = response.status().as_u16();
        if status == 429 || (status == 403 && quota_exhausted(response.headers())) {
            return Err(DiscoveryError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let error_text = response.text().await?;
            let message = serde_json::from_str::<GitHubError>(&error_text)
                .map(|e| e.message)
                .unwrap_or(error_text);
            return Err(DiscoveryError::Status { status, message });
        }

        let body = response.text().await?;
        let entries: Vec<ListingEntry> = serde_json::from_str(&body)?;
        debug!(entries = entries.len(), "Fetched release-notes listing");

        Ok(entries)
    }

    async fn fetch_document(&self, version_id: &str) -> Result<String, FetchError> {
        let url = self.config.document_url(version_id);

        let response = self.client.get(&url).timeout(self.timeout()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        debug!(version = %version_id, bytes = body.len(), "Fetched release notes");

        Ok(body)
    }
}
