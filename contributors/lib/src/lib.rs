//! Contributors library for VS Code release notes.
//!
//! Scrapes the "Pull Requests" section of each VS Code release-notes document
//! into structured contributor records, caches them in memory, and answers
//! aggregate questions across releases.
//!
//! ## Core Types
//!
//! - [`Release`] - One version's parsed contributors
//! - [`Contributor`] - An external contributor and their pull requests
//! - [`VersionDescriptor`] - A catalog entry (`v1_109` / `1.109`)
//!
//! ## Fetching and Caching
//!
//! - [`DocumentSource`] - Seam over the release-notes repository
//! - [`GitHubSource`] - GitHub contents API and raw file host implementation
//! - [`ReleaseCache`] - Concurrency-safe catalog and release store
//! - [`Refresher`] - Periodic background refresh of a cache
//!
//! ## Aggregation
//!
//! Search, per-contributor history, first-time detection, leaderboards and
//! milestones live in [`aggregate`] and are also exposed as methods on
//! [`ReleaseCache`].
//!
//! ## Configuration
//!
//! - [`ScraperConfig`] - Endpoints, timeouts and refresh cadence, loadable
//!   from `CONTRIBUTORS_*` environment variables

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod parser;
pub mod refresher;
pub mod source;
pub mod types;

pub use aggregate::{
    AggregatedContributor, ContributorHistory, DEFAULT_LEADERBOARD_LIMIT, LeaderboardEntry,
    LeaderboardTab, MILESTONES, MilestoneStatus,
};
pub use cache::{CacheStats, ReleaseCache};
pub use config::ScraperConfig;
pub use error::{ConfigError, DiscoveryError, FetchError};
pub use parser::{extract_pull_requests, parse_release};
pub use refresher::{Refresher, RefresherHandle};
pub use source::{DocumentSource, GitHubSource, ListingEntry};
pub use types::{Contributor, PullRequest, Release, VersionDescriptor, VersionKey};
