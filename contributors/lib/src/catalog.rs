//! Version catalog discovery.
//!
//! The catalog is the newest-first list of releases the source knows about,
//! derived from release-notes filenames such as `v1_109.md`.

use crate::error::DiscoveryError;
use crate::source::{DocumentSource, ListingEntry};
use crate::types::VersionDescriptor;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `v<major>_<minor>.<ext>`, capturing the identifier.
///
/// Components with leading zeros are rejected so each `(major, minor)` has
/// exactly one spelling.
static VERSION_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(v(?:0|[1-9]\d*)_(?:0|[1-9]\d*))\.[A-Za-z0-9]+$").expect("valid regex")
});

/// Discover the catalog from the source's directory listing.
///
/// ## Errors
///
/// Propagates the source's `DiscoveryError`; fallback policy belongs to the caller.
pub async fn discover<S: DocumentSource>(
    source: &S,
) -> Result<Vec<VersionDescriptor>, DiscoveryError> {
    let entries = source.list_entries().await?;
    Ok(versions_from_listing(&entries))
}

/// Filter listing entries down to version files and sort newest first.
///
/// Entries that do not match the filename pattern are skipped, and the same
/// identifier under two extensions yields one descriptor.
///
/// ## Examples
///
/// ```
/// use contributors_lib::catalog::versions_from_listing;
/// use contributors_lib::source::ListingEntry;
///
/// let entries = vec![
///     ListingEntry::new("v1_9.md"),
///     ListingEntry::new("images"),
///     ListingEntry::new("v1_10.md"),
/// ];
/// let versions = versions_from_listing(&entries);
/// assert_eq!(versions[0].id, "v1_10");
/// assert_eq!(versions[1].display_name, "1.9");
/// ```
pub fn versions_from_listing(entries: &[ListingEntry]) -> Vec<VersionDescriptor> {
    let mut seen = HashSet::new();
    let mut versions: Vec<VersionDescriptor> = entries
        .iter()
        .filter_map(|entry| VERSION_FILE_RE.captures(&entry.name))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|id| seen.insert(id.clone()))
        .map(VersionDescriptor::from_id)
        .collect();

    sort_newest_first(&mut versions);
    versions
}

/// Catalog built from a static list of identifiers.
pub fn seed_catalog<I, T>(ids: I) -> Vec<VersionDescriptor>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut versions: Vec<VersionDescriptor> =
        ids.into_iter().map(VersionDescriptor::from_id).collect();
    sort_newest_first(&mut versions);
    versions
}

/// Sort by `(major, minor)` descending.
pub fn sort_newest_first(versions: &mut [VersionDescriptor]) {
    versions.sort_by(|a, b| b.key().cmp(&a.key()));
}
