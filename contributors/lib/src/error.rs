//! Error types for the contributors library.
//!
//! Neither [`DiscoveryError`] nor [`FetchError`] escapes the cache: both are
//! logged at the boundary and turned into a fallback catalog or a "not found".

use thiserror::Error;

/// Failure listing the available release-notes files.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub API rate limit exceeded
    #[error("GitHub API rate limit exceeded")]
    RateLimitExceeded,

    /// Listing endpoint returned a non-success status
    #[error("listing endpoint returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Listing body was not the expected JSON array
    #[error("failed to decode listing: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure retrieving one release-notes document.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (includes timeouts)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Document endpoint returned a non-success status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

/// Invalid configuration override.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: String, value: String },

    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: String, value: String },
}
