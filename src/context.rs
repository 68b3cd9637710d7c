//! Resolved run settings built once in `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::Args;
use release_mirror_core::config::{CONF_DIR, MIRRORS_FILE, REPOS_FILE};

/// Paths and limits for one process run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory holding the executable.
    pub exe_dir: PathBuf,
    /// Download root.
    pub top: PathBuf,
    /// Repository list file.
    pub repos_file: PathBuf,
    /// Mirror list file.
    pub mirrors_file: PathBuf,
    /// Log directory.
    pub log_dir: PathBuf,
    /// Repositories processed at once.
    pub jobs: usize,
    /// Attempts per mirror for each asset.
    pub max_attempts: u32,
    /// Delay between attempts on the same mirror.
    pub retry_delay: Duration,
    /// Whether progress bars are drawn.
    pub show_progress: bool,
}

impl RunContext {
    /// Builds the context for the current executable.
    pub fn from_env(args: &Args, stderr_is_terminal: bool) -> Result<Self> {
        let exe = std::env::current_exe().context("cannot locate the running executable")?;
        let exe_dir = exe
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self::new(args, exe_dir, stderr_is_terminal))
    }

    /// Builds the context with defaults relative to `exe_dir`.
    pub fn new(args: &Args, exe_dir: PathBuf, stderr_is_terminal: bool) -> Self {
        let conf_dir = exe_dir.join(CONF_DIR);
        Self {
            top: args.top.clone().unwrap_or_else(|| exe_dir.join("downloads")),
            repos_file: args.conf.clone().unwrap_or_else(|| conf_dir.join(REPOS_FILE)),
            mirrors_file: args
                .proxies
                .clone()
                .unwrap_or_else(|| conf_dir.join(MIRRORS_FILE)),
            log_dir: args.log.clone().unwrap_or_else(|| exe_dir.join("logs")),
            jobs: usize::from(args.jobs),
            max_attempts: u32::from(args.max_attempts),
            retry_delay: Duration::from_secs(args.retry_delay),
            show_progress: stderr_is_terminal && !args.no_progress && !args.quiet,
            exe_dir,
        }
    }

    /// Directory where example configuration files are generated.
    pub fn conf_dir(&self) -> PathBuf {
        self.exe_dir.join(CONF_DIR)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_run_context_defaults_relative_to_exe_dir() {
        let args = Args::try_parse_from(["release-mirror"]).unwrap();
        let ctx = RunContext::new(&args, PathBuf::from("/opt/mirror"), true);

        assert_eq!(ctx.top, PathBuf::from("/opt/mirror/downloads"));
        assert_eq!(ctx.repos_file, PathBuf::from("/opt/mirror/conf/repos.conf"));
        assert_eq!(ctx.mirrors_file, PathBuf::from("/opt/mirror/conf/proxies.txt"));
        assert_eq!(ctx.log_dir, PathBuf::from("/opt/mirror/logs"));
        assert_eq!(ctx.conf_dir(), PathBuf::from("/opt/mirror/conf"));
        assert_eq!(ctx.jobs, 1);
        assert_eq!(ctx.max_attempts, 3);
        assert_eq!(ctx.retry_delay, Duration::from_secs(5));
        assert!(ctx.show_progress);
    }

    #[test]
    fn test_run_context_overrides_and_progress_flags() {
        let args = Args::try_parse_from([
            "release-mirror",
            "--top",
            "/data",
            "-j",
            "4",
            "--no-progress",
        ])
        .unwrap();
        let ctx = RunContext::new(&args, PathBuf::from("/opt/mirror"), true);
        assert_eq!(ctx.top, PathBuf::from("/data"));
        assert_eq!(ctx.jobs, 4);
        assert!(!ctx.show_progress);

        let args = Args::try_parse_from(["release-mirror"]).unwrap();
        assert!(!RunContext::new(&args, PathBuf::from("/x"), false).show_progress);
    }
}
