//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use release_mirror_core::download::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use release_mirror_core::orchestrator::{DEFAULT_CONCURRENCY, RepoSpec};
use release_mirror_core::resolver::{ProviderKind, ReleaseSelection};

/// Keyword selecting every release instead of the latest one.
const ALL_KEYWORD: &str = "all";

/// Mirror GitHub and GitLab release assets to a local directory.
///
/// Without positional arguments every repository of the repository list is
/// processed. With `<owner> <repo> [all]`, `gitlab <owner> <repo> [all]` or
/// `gitlab <host> <owner> <repo> [all]` a single repository is processed.
#[derive(Parser, Debug)]
#[command(name = "release-mirror")]
#[command(author, version, about)]
pub struct Args {
    /// Single repository to process instead of the repository list
    #[arg(value_name = "REPOSITORY", num_args = 0..=5)]
    pub target: Vec<String>,

    /// Download root directory [default: <exe dir>/downloads]
    #[arg(long, value_name = "DIR")]
    pub top: Option<PathBuf>,

    /// Repository list file [default: <exe dir>/conf/repos.conf]
    #[arg(long, value_name = "FILE")]
    pub conf: Option<PathBuf>,

    /// Mirror list file [default: <exe dir>/conf/proxies.txt]
    #[arg(long, value_name = "FILE")]
    pub proxies: Option<PathBuf>,

    /// Log directory [default: <exe dir>/logs]
    #[arg(long, value_name = "DIR")]
    pub log: Option<PathBuf>,

    /// Repositories processed at the same time (1-100)
    #[arg(short = 'j', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jobs: u8,

    /// Download attempts per mirror for each asset (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Delay between attempts on the same mirror in seconds (0-300)
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs(), value_parser = clap::value_parser!(u64).range(0..=300))]
    pub retry_delay: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable download progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Default log level derived from `-q` and `-v`.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Parses the positional arguments into a single repository.
    ///
    /// Returns `None` when no positional argument was given (batch mode).
    ///
    /// # Errors
    ///
    /// Fails when the positional arguments match no supported form.
    pub fn single_target(&self) -> Result<Option<(RepoSpec, ReleaseSelection)>> {
        if self.target.is_empty() {
            return Ok(None);
        }

        let mut words: Vec<&str> = self.target.iter().map(String::as_str).collect();
        let selection = if words.len() > 2 && words.last() == Some(&ALL_KEYWORD) {
            words.pop();
            ReleaseSelection::All
        } else {
            ReleaseSelection::Latest
        };

        let (provider, owner, repo) = match words.as_slice() {
            ["gitlab", host, owner, repo] => (
                ProviderKind::GitLab {
                    host: (*host).to_string(),
                },
                *owner,
                *repo,
            ),
            ["gitlab", owner, repo] => (ProviderKind::default_gitlab(), *owner, *repo),
            [owner, repo] if *owner != "gitlab" => (ProviderKind::GitHub, *owner, *repo),
            _ => bail!(
                "unrecognized repository arguments: {}\n  \
                 Expected <owner> <repo> [all], gitlab <owner> <repo> [all] \
                 or gitlab <host> <owner> <repo> [all]",
                self.target.join(" ")
            ),
        };

        Ok(Some((
            RepoSpec {
                provider,
                owner: owner.to_string(),
                repo: repo.to_string(),
                forced_mirror: None,
            },
            selection,
        )))
    }
}
