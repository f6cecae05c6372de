//! Concurrency-safe release cache.
//!
//! The cache owns two independently locked pieces of state: the version
//! catalog and the map of parsed releases. Network I/O always happens with
//! neither lock held; locks are only taken for the short map lookup, insert or
//! pointer swap around it.
//!
//! ## Consistency
//!
//! - The catalog is replaced wholesale, so readers see either the old or the
//!   new list, never a mix.
//! - A release is stored only after a successful fetch and parse. Failures are
//!   logged and reported as `None`, so the next request retries.
//! - Concurrent misses for the same version are not deduplicated; each caller
//!   fetches and the last insert wins.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use contributors_lib::{GitHubSource, ReleaseCache, ScraperConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScraperConfig::default();
//! let cache = ReleaseCache::new(GitHubSource::new(config.clone())?, config);
//!
//! cache.refresh().await;
//! if let Some(release) = cache.get_release("v1_109").await {
//!     println!("{} contributors in {}", release.contributors.len(), release.display_name);
//! }
//! # Ok(())
//! # }
//! ```

use crate::aggregate::{
    self, AggregatedContributor, ContributorHistory, LeaderboardEntry, LeaderboardTab,
    MilestoneStatus,
};
use crate::catalog;
use crate::config::ScraperConfig;
use crate::error::FetchError;
use crate::parser::parse_release;
use crate::source::DocumentSource;
use crate::types::{Release, VersionDescriptor};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Point-in-time counters describing the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Versions in the current catalog
    pub catalog_len: usize,
    /// Releases held in the map, including ones outside the catalog
    pub cached_len: usize,
    /// End of the last completed refresh
    pub last_refreshed: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct CatalogState {
    versions: Arc<Vec<VersionDescriptor>>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Release cache over an injected [`DocumentSource`].
pub struct ReleaseCache<S> {
    source: S,
    config: ScraperConfig,
    catalog: RwLock<CatalogState>,
    releases: RwLock<HashMap<String, Arc<Release>>>,
}

// Cached data is immutable once inserted, so a panic while a guard was held
// cannot leave it half-written; recover the guard instead of propagating.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl<S: DocumentSource> ReleaseCache<S> {
    /// Creates an empty cache. Nothing is fetched until [`refresh`](Self::refresh)
    /// or [`get_release`](Self::get_release) is called.
    pub fn new(source: S, config: ScraperConfig) -> Self {
        Self {
            source,
            config,
            catalog: RwLock::new(CatalogState::default()),
            releases: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current catalog, newest first. Never performs I/O.
    pub fn versions(&self) -> Vec<VersionDescriptor> {
        self.catalog_snapshot().as_ref().clone()
    }

    fn catalog_snapshot(&self) -> Arc<Vec<VersionDescriptor>> {
        Arc::clone(&read(&self.catalog).versions)
    }

    fn cached(&self, version: &str) -> Option<Arc<Release>> {
        read(&self.releases).get(version).cloned()
    }

    fn store(&self, release: Release) -> Arc<Release> {
        let release = Arc::new(release);
        write(&self.releases).insert(release.version.clone(), Arc::clone(&release));
        release
    }

    async fn fetch_and_parse(&self, version: &str) -> Result<Release, FetchError> {
        let text = self.source.fetch_document(version).await?;
        Ok(parse_release(version, &text))
    }

    /// Returns a release, fetching and caching it on a miss.
    ///
    /// `None` means the fetch failed; callers should treat that the same as
    /// "no data yet". Failed fetches are never cached.
    pub async fn get_release(&self, version: &str) -> Option<Arc<Release>> {
        if let Some(release) = self.cached(version) {
            return Some(release);
        }

        debug!(version = %version, "Release not cached, fetching on demand");
        match self.fetch_and_parse(version).await {
            Ok(release) => Some(self.store(release)),
            Err(e) => {
                warn!(version = %version, error = %e, "Failed to fetch release notes");
                None
            }
        }
    }

    /// Cached, non-empty releases for the current catalog, in catalog order.
    pub fn cached_releases(&self) -> Vec<Arc<Release>> {
        let versions = self.catalog_snapshot();
        let releases = read(&self.releases);

        versions
            .iter()
            .filter_map(|v| releases.get(&v.id))
            .filter(|r| !r.contributors.is_empty())
            .cloned()
            .collect()
    }

    /// Re-discover the catalog and pre-fetch the newest releases.
    ///
    /// Discovery failure keeps the previous catalog, or installs the seed list
    /// when there is none. Individual fetch failures are logged and skipped.
    /// Returns [`cached_releases`](Self::cached_releases) afterwards.
    pub async fn refresh(&self) -> Vec<Arc<Release>> {
        let versions = match catalog::discover(&self.source).await {
            Ok(versions) => {
                let versions = Arc::new(versions);
                write(&self.catalog).versions = Arc::clone(&versions);
                versions
            }
            Err(e) => {
                let current = self.catalog_snapshot();
                if current.is_empty() {
                    warn!(error = %e, "Version discovery failed, using seed versions");
                    let seeded = Arc::new(catalog::seed_catalog(&self.config.seed_versions));
                    write(&self.catalog).versions = Arc::clone(&seeded);
                    seeded
                } else {
                    warn!(
                        error = %e,
                        versions = current.len(),
                        "Version discovery failed, keeping previous catalog"
                    );
                    current
                }
            }
        };

        let targets: Vec<&VersionDescriptor> =
            versions.iter().take(self.config.prefetch_count).collect();
        let results = join_all(targets.iter().map(|v| self.fetch_and_parse(&v.id))).await;

        let mut prefetched = 0;
        let mut failed = 0;
        for (version, result) in targets.iter().map(|v| &v.id).zip(results) {
            match result {
                Ok(release) => {
                    self.store(release);
                    prefetched += 1;
                }
                Err(e) => {
                    warn!(version = %version, error = %e, "Failed to fetch release notes");
                    failed += 1;
                }
            }
        }

        write(&self.catalog).refreshed_at = Some(Utc::now());
        info!(
            versions = versions.len(),
            prefetched, failed, "Refreshed release catalog"
        );

        self.cached_releases()
    }

    /// Newest catalog release that has contributors, fetching on demand.
    ///
    /// Falls back to the newest catalog entry when none has contributors.
    pub async fn default_release(&self) -> Option<Arc<Release>> {
        let versions = self.catalog_snapshot();

        for version in versions.iter() {
            if let Some(release) = self.get_release(&version.id).await
                && !release.contributors.is_empty()
            {
                return Some(release);
            }
        }

        let newest = versions.first()?;
        self.get_release(&newest.id).await
    }

    pub fn stats(&self) -> CacheStats {
        let (catalog_len, last_refreshed) = {
            let catalog = read(&self.catalog);
            (catalog.versions.len(), catalog.refreshed_at)
        };
        CacheStats {
            catalog_len,
            cached_len: read(&self.releases).len(),
            last_refreshed,
        }
    }

    /// Run `query` over a consistent snapshot of every cached release.
    ///
    /// Releases are passed in catalog order, then any cached releases outside
    /// the catalog newest first. The release-map read lock is held for the
    /// whole query.
    fn with_snapshot<T>(&self, query: impl FnOnce(Vec<&Release>) -> T) -> T {
        let versions = self.catalog_snapshot();
        let releases = read(&self.releases);

        let mut ordered: Vec<&Release> = Vec::with_capacity(releases.len());
        let mut seen = HashSet::new();
        for v in versions.iter() {
            if let Some(release) = releases.get(&v.id)
                && seen.insert(v.id.as_str())
            {
                ordered.push(release.as_ref());
            }
        }

        let mut extra: Vec<&Release> = releases
            .values()
            .map(Arc::as_ref)
            .filter(|r| !seen.contains(r.version.as_str()))
            .collect();
        extra.sort_by(|a, b| b.key().cmp(&a.key()).then_with(|| b.version.cmp(&a.version)));
        ordered.extend(extra);

        query(ordered)
    }

    /// See [`aggregate::search_contributors`].
    pub fn search_contributors(&self, query: &str) -> Vec<AggregatedContributor> {
        self.with_snapshot(|releases| aggregate::search_contributors(releases, query))
    }

    /// See [`aggregate::contributor_history`].
    pub fn contributor_history(&self, handle: &str) -> Option<ContributorHistory> {
        self.with_snapshot(|releases| aggregate::contributor_history(releases, handle))
    }

    /// See [`aggregate::is_first_time_contributor`].
    pub fn is_first_time_contributor(&self, handle: &str, version: &str) -> bool {
        self.with_snapshot(|releases| {
            aggregate::is_first_time_contributor(releases, handle, version)
        })
    }

    /// See [`aggregate::leaderboard`].
    pub fn leaderboard(&self, tab: LeaderboardTab, limit: usize) -> Vec<LeaderboardEntry> {
        self.with_snapshot(|releases| aggregate::leaderboard(releases, tab, limit))
    }

    /// See [`aggregate::pr_totals`].
    pub fn pr_totals(&self) -> HashMap<String, usize> {
        self.with_snapshot(|releases| aggregate::pr_totals(releases))
    }

    /// See [`aggregate::milestone_status`].
    pub fn contributor_milestone(&self, handle: &str) -> MilestoneStatus {
        self.with_snapshot(|releases| aggregate::milestone_status(releases, handle))
    }
}
