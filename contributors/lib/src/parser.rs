//! Release-notes parsing.
//!
//! Extracts contributors and their pull requests from the "Pull Requests"
//! section of a release-notes markdown document. The format is not a contract,
//! so parsing never fails: anything unrecognized is skipped and the result is
//! simply smaller.
//!
//! ## Recognized lines
//!
//! ```text
//! ### Pull Requests
//!
//! Contributions to `vscode`:
//!
//! * [@alice (Alice A.)](https://github.com/alice): Fix tabs [PR #42](https://github.com/microsoft/vscode/pull/42)
//! * [@bob](https://github.com/bob)
//!   * Improve search [PR #7](https://github.com/microsoft/vscode/pull/7)
//!
//! ## Next top-level heading ends the section
//! ```

use crate::types::{Contributor, PullRequest, Release};
use regex::Regex;
use std::sync::LazyLock;

/// Heading that opens the section of interest.
const SECTION_START: &str = "### Pull Requests";

/// A higher-level heading closes it.
const SECTION_END: &str = "## ";

/// `* [@handle (Display Name)](profile url)rest`
static CONTRIBUTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\* \[@([^\]]+)\]\(([^)]+)\)(.*)$").expect("valid regex")
});

/// Indented sub-item belonging to the current contributor.
static SUB_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+[*-] (.+)$").expect("valid regex"));

/// `[PR #123](https://github.com/org/repo/pull/123)`
static PR_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[PR #(\d+)\]\((https?://github\.com/[^/)\s]+/([^/)\s]+)/pull/\d+[^)\s]*)\)")
        .expect("valid regex")
});

/// ``Contributions to `repo`:`` - organizational only.
static REPO_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Contributions to `([^`]+)`:?$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    OutsideSection,
    InsideSection,
}

/// Parse one release's document into a [`Release`].
///
/// Contributors keep their order of first appearance; a contributor listed
/// twice produces two entries.
///
/// ## Examples
///
/// ```
/// use contributors_lib::parser::parse_release;
///
/// let doc = "### Pull Requests\n\
///            * [@alice (Alice A.)](https://github.com/alice): fixed bug [PR #42](https://github.com/org/repo/pull/42)\n";
/// let release = parse_release("v1_109", doc);
///
/// let alice = &release.contributors[0];
/// assert_eq!(alice.handle, "alice");
/// assert_eq!(alice.name, "Alice A.");
/// assert_eq!(alice.pull_requests[0].title, "fixed bug");
/// assert_eq!(alice.pull_requests[0].repo, "repo");
/// ```
pub fn parse_release(version: &str, text: &str) -> Release {
    let mut release = Release::new(version);
    let mut state = State::OutsideSection;
    // Index into release.contributors of the entry sub-items attach to
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');

        match state {
            State::OutsideSection => {
                if line.starts_with(SECTION_START) {
                    state = State::InsideSection;
                }
            }
            State::InsideSection => {
                if line.starts_with(SECTION_END) {
                    break;
                }

                if REPO_SECTION_RE.is_match(line) {
                    current = None;
                } else if let Some(contributor) = parse_contributor_line(line) {
                    release.contributors.push(contributor);
                    current = Some(release.contributors.len() - 1);
                } else if let Some(idx) = current
                    && let Some(caps) = SUB_ITEM_RE.captures(line)
                    && let Some(content) = caps.get(1)
                {
                    let prs = extract_pull_requests(content.as_str());
                    release.contributors[idx].pull_requests.extend(prs);
                }
            }
        }
    }

    release
}

/// Parse a top-level contributor entry, including PR links on the same line.
fn parse_contributor_line(line: &str) -> Option<Contributor> {
    let caps = CONTRIBUTOR_RE.captures(line)?;
    let link_text = caps.get(1)?.as_str();
    let profile_url = caps.get(2)?.as_str();
    let rest = caps.get(3).map_or("", |m| m.as_str());

    let (handle, name) = match link_text.split_once(" (") {
        Some((handle, name)) => (handle.trim(), name.trim().trim_end_matches(')').trim()),
        None => (link_text.trim(), ""),
    };
    let handle = if handle.is_empty() {
        handle_from_profile_url(profile_url)?
    } else {
        handle
    };
    let name = if name.is_empty() { handle } else { name };

    let mut contributor = Contributor::new(handle, name);
    contributor.pull_requests = extract_pull_requests(rest);
    Some(contributor)
}

fn handle_from_profile_url(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
}

/// Extract every PR link in `text`.
///
/// Each link's title is the text between the previous link (or the start of
/// `text`) and this one, minus a leading `:` or `,` separator.
pub fn extract_pull_requests(text: &str) -> Vec<PullRequest> {
    let mut prs = Vec::new();
    let mut last_end = 0;

    for caps in PR_LINK_RE.captures_iter(text) {
        let (Some(whole), Some(number), Some(url), Some(repo)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };

        prs.push(PullRequest {
            title: clean_title(&text[last_end..whole.start()]),
            url: url.as_str().to_string(),
            repo: repo.as_str().to_string(),
            number: number.as_str().to_string(),
        });
        last_end = whole.end();
    }

    prs
}

fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(':')
        .or_else(|| trimmed.strip_prefix(','))
        .unwrap_or(trimmed);
    trimmed.trim().to_string()
}
