//! Cross-release aggregation queries.
//!
//! These are pure functions over a snapshot of releases. [`crate::ReleaseCache`]
//! calls them while holding its release-map read lock, passing releases in
//! catalog order (newest first) followed by any other cached releases.
//!
//! Handles are merged by their lower-cased form everywhere, which also folds
//! together a contributor listed twice in the same release.

use crate::types::{PullRequest, Release, VersionKey, handle_key};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// PR counts that count as a celebration milestone.
pub const MILESTONES: &[usize] = &[5, 10, 25, 50, 100, 250, 500, 1000];

/// Default number of leaderboard rows.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

/// One search hit, aggregated across releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedContributor {
    pub handle: String,
    pub name: String,
    pub avatar_url: String,
    pub total_prs: usize,
    pub release_count: usize,
}

/// Everything a contributor has done across the cached releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorHistory {
    pub handle: String,
    pub name: String,
    pub avatar_url: String,
    pub total_prs: usize,
    pub release_count: usize,
    /// Oldest release the contributor appears in
    pub first_release: String,
    /// Newest release the contributor appears in
    pub latest_release: String,
    /// Version id -> PRs in that release (releases without PRs are omitted)
    pub prs_by_release: BTreeMap<String, Vec<PullRequest>>,
}

/// Which ranking the leaderboard uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardTab {
    /// Rank by total PRs, then release count
    #[default]
    #[serde(rename = "prs")]
    PullRequests,
    /// Rank by release count, then total PRs
    Releases,
}

impl LeaderboardTab {
    /// Maps a query value to a tab; anything but `"releases"` is the PR view.
    pub fn from_query(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("releases") {
            Self::Releases
        } else {
            Self::PullRequests
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullRequests => "prs",
            Self::Releases => "releases",
        }
    }
}

impl FromStr for LeaderboardTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prs" | "pull-requests" => Ok(Self::PullRequests),
            "releases" => Ok(Self::Releases),
            other => Err(format!("unknown leaderboard tab: {other} (expected prs or releases)")),
        }
    }
}

/// One leaderboard row. Ranks start at 1 with no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub handle: String,
    pub avatar_url: String,
    pub pr_count: usize,
    pub release_count: usize,
}

/// Progress towards the PR-count milestones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneStatus {
    pub handle: String,
    pub name: String,
    pub pr_count: usize,
    /// Largest milestone reached, 0 if none
    pub milestone: usize,
    /// True when `pr_count` is exactly a milestone
    pub is_milestone: bool,
}

/// Running per-handle totals shared by search and the leaderboard.
struct Tally<'a> {
    handle: &'a str,
    name: &'a str,
    avatar_url: &'a str,
    pr_count: usize,
    releases: HashSet<&'a str>,
}

impl<'a> Tally<'a> {
    fn new(handle: &'a str, name: &'a str, avatar_url: &'a str) -> Self {
        Self {
            handle,
            name,
            avatar_url,
            pr_count: 0,
            releases: HashSet::new(),
        }
    }
}

/// Case-insensitive substring search over contributor handles.
///
/// An empty query matches nothing. Results are sorted by total PRs descending,
/// then by handle.
pub fn search_contributors<'a, I>(releases: I, query: &str) -> Vec<AggregatedContributor>
where
    I: IntoIterator<Item = &'a Release>,
{
    let query = handle_key(query);
    if query.is_empty() {
        return vec![];
    }

    let mut by_handle: HashMap<String, Tally<'a>> = HashMap::new();
    for release in releases {
        for contributor in &release.contributors {
            let key = handle_key(&contributor.handle);
            if !key.contains(&query) {
                continue;
            }
            let tally = by_handle.entry(key).or_insert_with(|| {
                Tally::new(&contributor.handle, &contributor.name, &contributor.avatar_url)
            });
            tally.pr_count += contributor.pull_requests.len();
            tally.releases.insert(&release.version);
        }
    }

    let mut results: Vec<(String, AggregatedContributor)> = by_handle
        .into_iter()
        .map(|(key, tally)| {
            let entry = AggregatedContributor {
                handle: tally.handle.to_string(),
                name: tally.name.to_string(),
                avatar_url: tally.avatar_url.to_string(),
                total_prs: tally.pr_count,
                release_count: tally.releases.len(),
            };
            (key, entry)
        })
        .collect();

    results.sort_by(|(ka, a), (kb, b)| b.total_prs.cmp(&a.total_prs).then_with(|| ka.cmp(kb)));
    results.into_iter().map(|(_, entry)| entry).collect()
}

/// Full history for one handle, or `None` if it appears in no release.
///
/// The result does not depend on the order releases are supplied in: the
/// representative name and avatar come from the newest matching release.
pub fn contributor_history<'a, I>(releases: I, handle: &str) -> Option<ContributorHistory>
where
    I: IntoIterator<Item = &'a Release>,
{
    let mut total_prs = 0;
    let mut release_count = 0;
    let mut prs_by_release: BTreeMap<String, Vec<PullRequest>> = BTreeMap::new();
    let mut first: Option<&'a Release> = None;
    let mut latest: Option<&'a Release> = None;

    for release in releases {
        let mut matched = false;
        for contributor in release.contributors.iter().filter(|c| c.matches(handle)) {
            matched = true;
            if !contributor.pull_requests.is_empty() {
                total_prs += contributor.pull_requests.len();
                prs_by_release
                    .entry(release.version.clone())
                    .or_default()
                    .extend(contributor.pull_requests.iter().cloned());
            }
        }
        if !matched {
            continue;
        }

        release_count += 1;
        if first.is_none_or(|f| compare_releases(release, f) == Ordering::Less) {
            first = Some(release);
        }
        if latest.is_none_or(|l| compare_releases(release, l) == Ordering::Greater) {
            latest = Some(release);
        }
    }

    let (first, latest) = (first?, latest?);
    let identity = latest.contributors.iter().find(|c| c.matches(handle))?;

    Some(ContributorHistory {
        handle: identity.handle.clone(),
        name: identity.name.clone(),
        avatar_url: identity.avatar_url.clone(),
        total_prs,
        release_count,
        first_release: first.version.clone(),
        latest_release: latest.version.clone(),
        prs_by_release,
    })
}

/// True when no supplied release older than `version` lists `handle`.
///
/// Only as complete as the snapshot: releases that were never fetched cannot
/// disqualify anyone.
pub fn is_first_time_contributor<'a, I>(releases: I, handle: &str, version: &str) -> bool
where
    I: IntoIterator<Item = &'a Release>,
{
    let target = VersionKey::parse_or_default(version);
    !releases
        .into_iter()
        .filter(|release| release.key() < target)
        .any(|release| release.contributors.iter().any(|c| c.matches(handle)))
}

/// Ranked contributors, truncated to `limit`.
///
/// The handle, name and avatar kept for a contributor are the last non-empty values seen
/// while iterating `releases`, so callers pass a fixed (catalog) order.
pub fn leaderboard<'a, I>(releases: I, tab: LeaderboardTab, limit: usize) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Release>,
{
    let mut stats: HashMap<String, Tally<'a>> = HashMap::new();
    for release in releases {
        for contributor in &release.contributors {
            let tally = stats
                .entry(handle_key(&contributor.handle))
                .or_insert_with(|| {
                    Tally::new(&contributor.handle, &contributor.name, &contributor.avatar_url)
                });
            tally.pr_count += contributor.pull_requests.len();
            tally.releases.insert(&release.version);
            if !contributor.name.is_empty() {
                tally.name = contributor.name.as_str();
            }
            if !contributor.avatar_url.is_empty() {
                // The avatar is derived from the handle, so keep them in step
                tally.handle = contributor.handle.as_str();
                tally.avatar_url = contributor.avatar_url.as_str();
            }
        }
    }

    let mut rows: Vec<(String, LeaderboardEntry)> = stats
        .into_iter()
        .map(|(key, tally)| {
            let entry = LeaderboardEntry {
                rank: 0,
                name: tally.name.to_string(),
                handle: tally.handle.to_string(),
                avatar_url: tally.avatar_url.to_string(),
                pr_count: tally.pr_count,
                release_count: tally.releases.len(),
            };
            (key, entry)
        })
        .collect();

    rows.sort_by(|(ka, a), (kb, b)| {
        let primary = match tab {
            LeaderboardTab::PullRequests => b
                .pr_count
                .cmp(&a.pr_count)
                .then_with(|| b.release_count.cmp(&a.release_count)),
            LeaderboardTab::Releases => b
                .release_count
                .cmp(&a.release_count)
                .then_with(|| b.pr_count.cmp(&a.pr_count)),
        };
        primary.then_with(|| ka.cmp(kb))
    });
    rows.truncate(limit);

    rows.into_iter()
        .enumerate()
        .map(|(i, (_, mut entry))| {
            entry.rank = i + 1;
            entry
        })
        .collect()
}

/// Total PRs per lower-cased handle.
pub fn pr_totals<'a, I>(releases: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a Release>,
{
    let mut totals = HashMap::new();
    for release in releases {
        for contributor in &release.contributors {
            *totals.entry(handle_key(&contributor.handle)).or_insert(0) +=
                contributor.pull_requests.len();
        }
    }
    totals
}

/// Milestone progress for one handle.
pub fn milestone_status<'a, I>(releases: I, handle: &str) -> MilestoneStatus
where
    I: IntoIterator<Item = &'a Release>,
{
    let mut pr_count = 0;
    let mut name = handle;
    for release in releases {
        for contributor in release.contributors.iter().filter(|c| c.matches(handle)) {
            pr_count += contributor.pull_requests.len();
            if !contributor.name.is_empty() {
                name = contributor.name.as_str();
            }
        }
    }

    MilestoneStatus {
        handle: handle.to_string(),
        name: name.to_string(),
        pr_count,
        milestone: milestone_reached(pr_count),
        is_milestone: MILESTONES.contains(&pr_count),
    }
}

/// Largest milestone not above `pr_count`, or 0.
pub fn milestone_reached(pr_count: usize) -> usize {
    MILESTONES
        .iter()
        .rev()
        .find(|m| pr_count >= **m)
        .copied()
        .unwrap_or(0)
}

fn compare_releases(a: &Release, b: &Release) -> Ordering {
    a.key().cmp(&b.key()).then_with(|| a.version.cmp(&b.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contributor;

    fn pr(n: u32) -> PullRequest {
        PullRequest {
            title: format!("change {n}"),
            url: format!("https://github.com/microsoft/vscode/pull/{n}"),
            repo: "vscode".to_string(),
            number: n.to_string(),
        }
    }

    fn contributor(handle: &str, name: &str, prs: u32) -> Contributor {
        let mut c = Contributor::new(handle, name);
        c.pull_requests = (1..=prs).map(pr).collect();
        c
    }

    fn release(version: &str, contributors: Vec<Contributor>) -> Release {
        let mut r = Release::new(version);
        r.contributors = contributors;
        r
    }

    #[test]
    fn test_search_is_case_insensitive_and_keeps_handles_distinct() {
        let releases = vec![release(
            "v1_100",
            vec![
                contributor("alice", "Alice", 3),
                contributor("ALICE99", "Other", 2),
                contributor("bob", "Bob", 9),
            ],
        )];

        let results = search_contributors(&releases, "ali");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].handle, "alice");
        assert_eq!(results[0].total_prs, 3);
        assert_eq!(results[0].release_count, 1);
        assert_eq!(results[1].handle, "ALICE99");
        assert_eq!(results[1].total_prs, 2);
    }

    #[test]
    fn test_search_aggregates_across_releases() {
        let releases = vec![
            release("v1_101", vec![contributor("Alice", "Alice New", 1)]),
            release("v1_100", vec![contributor("alice", "Alice Old", 2)]),
        ];

        let results = search_contributors(&releases, "ALICE");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_prs, 3);
        assert_eq!(results[0].release_count, 2);
        assert_eq!(results[0].name, "Alice New");
    }

    #[test]
    fn test_search_empty_query_returns_nothing() {
        let releases = vec![release("v1_100", vec![contributor("alice", "Alice", 1)])];
        assert!(search_contributors(&releases, "").is_empty());
        assert!(search_contributors(&releases, "   ").is_empty());
    }

    #[test]
    fn test_search_query_is_not_trimmed() {
        let releases = vec![release("v1_100", vec![contributor("alice", "Alice", 1)])];
        assert!(search_contributors(&releases, " alice").is_empty());
        assert_eq!(search_contributors(&releases, "lic").len(), 1);
    }

    #[test]
    fn test_search_tie_break_by_handle() {
        let releases = vec![release(
            "v1_100",
            vec![contributor("zed", "Z", 1), contributor("abe", "A", 1)],
        )];
        let results = search_contributors(&releases, "e");
        let handles: Vec<&str> = results.iter().map(|r| r.handle.as_str()).collect();
        assert_eq!(handles, vec!["abe", "zed"]);
    }

    #[test]
    fn test_duplicate_within_release_counts_release_once() {
        let releases = vec![release(
            "v1_100",
            vec![contributor("alice", "Alice", 1), contributor("Alice", "Alice", 2)],
        )];

        let results = search_contributors(&releases, "alice");
        assert_eq!(results[0].total_prs, 3);
        assert_eq!(results[0].release_count, 1);

        let history = contributor_history(&releases, "alice").unwrap();
        assert_eq!(history.total_prs, 3);
        assert_eq!(history.release_count, 1);
        assert_eq!(history.prs_by_release["v1_100"].len(), 3);
    }

    #[test]
    fn test_history_first_and_latest_are_numeric() {
        let releases = vec![
            release("v1_10", vec![contributor("alice", "Alice Latest", 2)]),
            release("v1_9", vec![contributor("ALICE", "Alice Early", 1)]),
            release("v1_100", vec![contributor("bob", "Bob", 1)]),
        ];

        let history = contributor_history(&releases, "Alice").unwrap();

        assert_eq!(history.first_release, "v1_9");
        assert_eq!(history.latest_release, "v1_10");
        assert_eq!(history.total_prs, 3);
        assert_eq!(history.release_count, 2);
        assert_eq!(history.name, "Alice Latest");
        assert_eq!(history.handle, "alice");
    }

    #[test]
    fn test_history_is_order_independent() {
        let mut releases = vec![
            release("v1_10", vec![contributor("alice", "A", 2)]),
            release("v1_9", vec![contributor("alice", "B", 1)]),
            release("v1_11", vec![contributor("alice", "C", 0)]),
        ];
        let forward = contributor_history(&releases, "alice");
        releases.reverse();
        let backward = contributor_history(&releases, "alice");

        assert_eq!(forward, backward);
        let history = forward.unwrap();
        assert_eq!(history.latest_release, "v1_11");
        assert_eq!(history.release_count, 3);
        // Releases without PRs are not keyed
        assert!(!history.prs_by_release.contains_key("v1_11"));
    }

    #[test]
    fn test_history_not_found() {
        let releases = vec![release("v1_100", vec![contributor("bob", "Bob", 1)])];
        assert!(contributor_history(&releases, "alice").is_none());
        assert!(contributor_history(std::iter::empty(), "alice").is_none());
    }

    #[test]
    fn test_first_time_contributor() {
        let newer = release("v1_101", vec![contributor("alice", "Alice", 1)]);
        let older_without = release("v1_100", vec![contributor("bob", "Bob", 1)]);
        let older_with = release("v1_100", vec![contributor("Alice", "Alice", 1)]);

        // Only the newer release is known
        let only_newer = vec![newer.clone()];
        assert!(is_first_time_contributor(&only_newer, "alice", "v1_100"));
        assert!(is_first_time_contributor(&only_newer, "alice", "v1_101"));

        let both = vec![newer.clone(), older_without];
        assert!(is_first_time_contributor(&both, "alice", "v1_101"));

        let both = vec![newer, older_with];
        assert!(!is_first_time_contributor(&both, "alice", "v1_101"));
        assert!(is_first_time_contributor(&both, "alice", "v1_100"));
    }

    #[test]
    fn test_leaderboard_prs_tab() {
        let releases = vec![
            release(
                "v1_101",
                vec![contributor("alice", "Alice", 2), contributor("bob", "Bob", 3)],
            ),
            release(
                "v1_100",
                vec![contributor("alice", "Alice", 1), contributor("carol", "Carol", 1)],
            ),
        ];

        let board = leaderboard(&releases, LeaderboardTab::PullRequests, 50);

        let handles: Vec<&str> = board.iter().map(|e| e.handle.as_str()).collect();
        // alice and bob tie on 3 PRs; alice wins on releases
        assert_eq!(handles, vec!["alice", "bob", "carol"]);
        let ranks: Vec<usize> = board.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(board[0].release_count, 2);
    }

    #[test]
    fn test_leaderboard_releases_tab() {
        let releases = vec![
            release(
                "v1_101",
                vec![contributor("alice", "Alice", 1), contributor("bob", "Bob", 10)],
            ),
            release("v1_100", vec![contributor("alice", "Alice", 1)]),
        ];

        let board = leaderboard(&releases, LeaderboardTab::Releases, 50);
        assert_eq!(board[0].handle, "alice");
        assert_eq!(board[1].handle, "bob");
    }

    #[test]
    fn test_leaderboard_limit_and_dense_ranks() {
        let contributors: Vec<Contributor> = (0..60)
            .map(|i| contributor(&format!("user{i:02}"), "", (i % 7) as u32))
            .collect();
        let releases = vec![release("v1_100", contributors)];

        let board = leaderboard(&releases, LeaderboardTab::PullRequests, DEFAULT_LEADERBOARD_LIMIT);

        assert_eq!(board.len(), 50);
        for (i, entry) in board.iter().enumerate() {
            assert_eq!(entry.rank, i + 1);
        }
        for pair in board.windows(2) {
            assert!(pair[0].pr_count >= pair[1].pr_count);
        }

        assert!(leaderboard(&releases, LeaderboardTab::PullRequests, 0).is_empty());
    }

    #[test]
    fn test_leaderboard_merges_case_and_keeps_last_name() {
        let releases = vec![
            release("v1_101", vec![contributor("Alice", "Alice New", 1)]),
            release("v1_100", vec![contributor("alice", "Alice Old", 1)]),
            release("v1_99", vec![contributor("alice", "", 1)]),
        ];

        let board = leaderboard(&releases, LeaderboardTab::PullRequests, 10);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].pr_count, 3);
        assert_eq!(board[0].release_count, 3);
        assert_eq!(board[0].name, "Alice Old");
        assert_eq!(board[0].handle, "alice");
        assert_eq!(board[0].avatar_url, crate::types::avatar_url(&board[0].handle));
    }

    #[test]
    fn test_non_ascii_handles_match_everywhere() {
        let releases = vec![
            release("v1_101", vec![contributor("Émile", "Émile Z.", 2)]),
            release("v1_100", vec![contributor("ÉMILE", "", 1)]),
        ];

        let hits = search_contributors(&releases, "émile");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].total_prs, 3);

        let board = leaderboard(&releases, LeaderboardTab::PullRequests, 10);
        assert_eq!(board.len(), 1);

        let history = contributor_history(&releases, "émile").unwrap();
        assert_eq!(history.release_count, 2);
        assert_eq!(history.first_release, "v1_100");
        assert_eq!(history.handle, "Émile");

        assert!(!is_first_time_contributor(&releases, "émile", "v1_101"));
        assert!(is_first_time_contributor(&releases, "émile", "v1_100"));

        let status = milestone_status(&releases, "émile");
        assert_eq!(status.pr_count, 3);
        assert_eq!(pr_totals(&releases)["émile"], 3);
    }

    #[test]
    fn test_leaderboard_tab_parsing() {
        assert_eq!(LeaderboardTab::from_query("releases"), LeaderboardTab::Releases);
        assert_eq!(LeaderboardTab::from_query("prs"), LeaderboardTab::PullRequests);
        assert_eq!(LeaderboardTab::from_query("bogus"), LeaderboardTab::PullRequests);
        assert_eq!("RELEASES".parse::<LeaderboardTab>(), Ok(LeaderboardTab::Releases));
        assert!("bogus".parse::<LeaderboardTab>().is_err());
        assert_eq!(LeaderboardTab::Releases.as_str(), "releases");
    }

    #[test]
    fn test_pr_totals() {
        let releases = vec![
            release("v1_101", vec![contributor("Alice", "A", 2)]),
            release("v1_100", vec![contributor("alice", "A", 1), contributor("bob", "B", 0)]),
        ];
        let totals = pr_totals(&releases);
        assert_eq!(totals["alice"], 3);
        assert_eq!(totals["bob"], 0);
    }

    #[test]
    fn test_milestones() {
        assert_eq!(milestone_reached(0), 0);
        assert_eq!(milestone_reached(4), 0);
        assert_eq!(milestone_reached(5), 5);
        assert_eq!(milestone_reached(24), 10);
        assert_eq!(milestone_reached(5000), 1000);

        let releases = vec![
            release("v1_101", vec![contributor("alice", "Alice", 3)]),
            release("v1_100", vec![contributor("ALICE", "", 2)]),
        ];
        let status = milestone_status(&releases, "alice");
        assert_eq!(status.pr_count, 5);
        assert_eq!(status.milestone, 5);
        assert!(status.is_milestone);
        assert_eq!(status.name, "Alice");

        let unknown = milestone_status(&releases, "nobody");
        assert_eq!(unknown.pr_count, 0);
        assert_eq!(unknown.name, "nobody");
        assert!(!unknown.is_milestone);
    }
}
