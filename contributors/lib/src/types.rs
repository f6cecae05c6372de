//! Core data types for release contributor tracking.
//!
//! A [`Release`] is parsed from one version's release-notes document and holds
//! the contributors credited in it, each with their pull requests. Releases are
//! immutable once built; a re-fetch replaces the whole value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single pull request credited to a contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Description text preceding the PR link (may be empty)
    pub title: String,
    /// Full pull request URL
    pub url: String,
    /// Short repository name taken from the PR URL (e.g. "vscode")
    pub repo: String,
    /// PR number, kept in its string form
    pub number: String,
}

/// A contributor entry within one release.
///
/// The same handle can appear in many releases as independent values; merging
/// across releases only happens in [`crate::aggregate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Display name from the link text, or the handle when none is given
    pub name: String,
    /// GitHub handle, case preserved
    pub handle: String,
    /// Avatar image URL derived from the handle
    pub avatar_url: String,
    /// Pull requests in document order
    pub pull_requests: Vec<PullRequest>,
}

impl Contributor {
    /// Creates a contributor with no pull requests and a derived avatar URL.
    pub fn new(handle: impl Into<String>, name: impl Into<String>) -> Self {
        let handle = handle.into();
        Self {
            name: name.into(),
            avatar_url: avatar_url(&handle),
            handle,
            pull_requests: vec![],
        }
    }

    /// Case-insensitive handle comparison, using the same folding as [`handle_key`].
    pub fn matches(&self, handle: &str) -> bool {
        handle_key(&self.handle) == handle_key(handle)
    }
}

/// One release and its contributors, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Machine identifier, e.g. `v1_109`
    pub version: String,
    /// Human form, e.g. `1.109`
    pub display_name: String,
    pub contributors: Vec<Contributor>,
}

impl Release {
    /// Creates an empty release for the given version identifier.
    pub fn new(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            display_name: display_name(&version),
            version,
            contributors: vec![],
        }
    }

    /// Ordering key of this release's version.
    pub fn key(&self) -> VersionKey {
        VersionKey::parse_or_default(&self.version)
    }

    /// Total number of pull requests across all contributors.
    pub fn pr_count(&self) -> usize {
        self.contributors
            .iter()
            .map(|c| c.pull_requests.len())
            .sum()
    }
}

/// A known release, independent of whether its body has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionDescriptor {
    /// e.g. `v1_109`
    pub id: String,
    /// e.g. `1.109`
    pub display_name: String,
}

impl VersionDescriptor {
    /// Builds a descriptor from an identifier, deriving its display name.
    ///
    /// ## Examples
    ///
    /// ```
    /// use contributors_lib::VersionDescriptor;
    ///
    /// let v = VersionDescriptor::from_id("v1_109");
    /// assert_eq!(v.display_name, "1.109");
    /// ```
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: display_name(&id),
            id,
        }
    }

    pub fn key(&self) -> VersionKey {
        VersionKey::parse_or_default(&self.id)
    }
}

/// Numeric ordering key parsed from a version identifier.
///
/// Compares `(major, minor)` numerically, so `v1_9` sorts before `v1_10`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionKey {
    pub major: u32,
    pub minor: u32,
}

impl VersionKey {
    /// Parses `v<major>_<minor>`. The leading `v` is optional.
    ///
    /// ## Examples
    ///
    /// ```
    /// use contributors_lib::VersionKey;
    ///
    /// let key = VersionKey::parse("v1_109").unwrap();
    /// assert_eq!((key.major, key.minor), (1, 109));
    /// assert!(VersionKey::parse("v1_9").unwrap() < key);
    /// assert!(VersionKey::parse("release").is_none());
    /// ```
    pub fn parse(id: &str) -> Option<Self> {
        let rest = id.strip_prefix('v').unwrap_or(id);
        let (major, minor) = rest.split_once('_')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// Like [`VersionKey::parse`], but unparseable identifiers order as `(0, 0)`.
    pub fn parse_or_default(id: &str) -> Self {
        Self::parse(id).unwrap_or_default()
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Derives a display name: drops the leading `v` and turns the first `_` into `.`.
pub fn display_name(id: &str) -> String {
    id.strip_prefix('v').unwrap_or(id).replacen('_', ".", 1)
}

/// Key that identifies a handle across releases.
///
/// Every cross-release comparison goes through this, so `Émile` and `émile`
/// are the same contributor everywhere.
pub fn handle_key(handle: &str) -> String {
    handle.to_lowercase()
}

/// Avatar URL for a GitHub handle.
pub fn avatar_url(handle: &str) -> String {
    format!("https://github.com/{handle}.png?size=80")
}
