//! Example configuration files written next to the executable on first run.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// File name of the example repository list.
pub const REPOS_EXAMPLE_FILE: &str = "repos.conf.example";

/// File name of the live mirror list.
pub const MIRRORS_FILE: &str = "proxies.txt";

/// File name of the reference mirror list.
pub const MIRRORS_EXAMPLE_FILE: &str = "proxies.txt.example";

const REPOS_EXAMPLE: &str = "\
# Repository list
# Formats:
#   github <owner> <repo> [mirror]         GitHub repository
#   gitlab <owner> <repo> [mirror]         GitLab repository on git.ryujinx.app
#   gitlab <host> <owner> <repo> [mirror]  GitLab repository on another instance
#   <owner> <repo> [mirror]                GitHub repository
# The mirror is optional; without it the global list in proxies.txt is used.
# Examples:
# junegunn fzf
# cli cli gh-proxy.com
# starship starship
#
# gitlab ryubing canary
# gitlab gitlab.com group project
";

const MIRRORS: &str = "\
# GitHub download mirrors, one host per line
# Tried in order until a download succeeds
gh-proxy.com
ghps.cc
hub.fastgit.xyz
cf.ghproxy.cc
";

const MIRRORS_EXAMPLE: &str = "\
# Reference list of GitHub download mirrors (not read by the program)
# Copy the ones you want into proxies.txt
# Public mirrors come and go; test them before relying on them

gh-proxy.com
ghps.cc
hub.fastgit.xyz
cf.ghproxy.cc
ghproxy.com
git.yzuu.com
";

/// Writes the example files into `conf_dir` when they are absent.
///
/// Existing files are never touched. Failures are logged as warnings.
/// Returns the paths that were created.
pub fn write_example_configs(conf_dir: &Path) -> Vec<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(conf_dir) {
        warn!(dir = %conf_dir.display(), error = %e, "cannot create configuration directory");
        return Vec::new();
    }

    [
        (REPOS_EXAMPLE_FILE, REPOS_EXAMPLE),
        (MIRRORS_FILE, MIRRORS),
        (MIRRORS_EXAMPLE_FILE, MIRRORS_EXAMPLE),
    ]
    .into_iter()
    .filter_map(|(name, content)| {
        let path = conf_dir.join(name);
        if path.exists() {
            return None;
        }
        match std::fs::write(&path, content) {
            Ok(()) => {
                info!(path = %path.display(), "generated example configuration");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot write example configuration");
                None
            }
        }
    })
    .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{parse_mirrors, parse_repos};
    use tempfile::TempDir;

    #[test]
    fn test_write_example_configs_creates_missing_files() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("conf");

        let created = write_example_configs(&conf);
        assert_eq!(created.len(), 3);
        assert!(conf.join(REPOS_EXAMPLE_FILE).is_file());
        assert!(conf.join(MIRRORS_FILE).is_file());
        assert!(conf.join(MIRRORS_EXAMPLE_FILE).is_file());
    }

    #[test]
    fn test_write_example_configs_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MIRRORS_FILE), "my.mirror\n").unwrap();

        let created = write_example_configs(dir.path());
        assert_eq!(created.len(), 2);
        let kept = std::fs::read_to_string(dir.path().join(MIRRORS_FILE)).unwrap();
        assert_eq!(kept, "my.mirror\n");
    }

    #[test]
    fn test_generated_files_parse_cleanly() {
        assert!(parse_repos(REPOS_EXAMPLE).is_empty());
        assert!(parse_repos(REPOS_EXAMPLE).skipped.is_empty());
        assert_eq!(parse_mirrors(MIRRORS).len(), 4);
        assert_eq!(parse_mirrors(MIRRORS_EXAMPLE).len(), 6);
    }
}
