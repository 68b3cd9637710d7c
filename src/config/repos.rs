//! Repository list parsing (`repos.conf`).
//!
//! One repository per line; blank lines and `#` comments are ignored:
//!
//! ```text
//! github <owner> <repo> [mirror]
//! gitlab <host> <owner> <repo> [mirror]
//! gitlab <owner> <repo> [mirror]
//! <owner> <repo> [mirror]
//! ```
//!
//! A `gitlab` line with four or more fields always names a host.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use super::ConfigError;
use crate::orchestrator::RepoSpec;
use crate::resolver::ProviderKind;

/// A line that could not be turned into a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-indexed line number.
    pub line: usize,
    /// The trimmed line text.
    pub text: String,
    /// Why it was skipped.
    pub reason: &'static str,
}

/// Result of parsing a repository list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoList {
    /// Repositories in file order.
    pub repos: Vec<RepoSpec>,
    /// Malformed lines.
    pub skipped: Vec<SkippedLine>,
}

impl RepoList {
    /// Returns true if no repository was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Returns the number of repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repos.len()
    }
}

impl fmt::Display for RepoList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parsed {} repositories ({} skipped)",
            self.repos.len(),
            self.skipped.len()
        )
    }
}

/// Parses the text of a repository list.
///
/// Malformed lines are logged with their line number and collected in
/// [`RepoList::skipped`]; they never fail the parse.
#[must_use]
pub fn parse_repos(text: &str) -> RepoList {
    let mut list = RepoList::default();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match parse_fields(&fields) {
            Ok(spec) => {
                debug!(line = index + 1, repository = %spec, provider = %spec.provider, "parsed repository");
                list.repos.push(spec);
            }
            Err(reason) => {
                warn!(line = index + 1, text = line, reason, "skipping malformed repository line");
                list.skipped.push(SkippedLine {
                    line: index + 1,
                    text: line.to_string(),
                    reason,
                });
            }
        }
    }

    list
}

fn parse_fields(fields: &[&str]) -> Result<RepoSpec, &'static str> {
    let (provider, rest) = match fields {
        ["github", rest @ ..] => {
            if rest.len() < 2 {
                return Err("github line needs <owner> <repo>");
            }
            (ProviderKind::GitHub, rest)
        }
        ["gitlab", host, rest @ ..] if rest.len() >= 2 => (
            ProviderKind::GitLab {
                host: (*host).to_string(),
            },
            rest,
        ),
        ["gitlab", rest @ ..] => {
            if rest.len() < 2 {
                return Err("gitlab line needs <owner> <repo>");
            }
            (ProviderKind::default_gitlab(), rest)
        }
        [_, _, ..] => (ProviderKind::GitHub, fields),
        _ => return Err("expected at least <owner> <repo>"),
    };

    let spec = RepoSpec {
        provider,
        owner: rest[0].to_string(),
        repo: rest[1].to_string(),
        forced_mirror: None,
    };
    Ok(match rest.get(2) {
        Some(mirror) => spec.with_forced_mirror(*mirror),
        None => spec,
    })
}

/// Reads and parses a repository list file.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] if the file does not exist, or
/// [`ConfigError::Read`] if it cannot be read.
pub fn load_repos(path: &Path) -> Result<RepoList, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::from_io(path, e))?;
    let list = parse_repos(&text);
    info!(path = %path.display(), repositories = list.len(), skipped = list.skipped.len(), "loaded repository list");
    Ok(list)
}
