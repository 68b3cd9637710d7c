//! Configuration files: the repository list and the mirror list.
//!
//! - [`load_repos`] - mandatory repository list; failure aborts a batch run
//! - [`load_mirrors`] - optional mirror list; falls back to the built-in default
//! - [`write_example_configs`] - first-run example files

mod error;
mod mirrors;
mod repos;
mod templates;

pub use error::ConfigError;
pub use mirrors::{load_mirrors, parse_mirrors};
pub use repos::{RepoList, SkippedLine, load_repos, parse_repos};
pub use templates::{
    MIRRORS_EXAMPLE_FILE, MIRRORS_FILE, REPOS_EXAMPLE_FILE, write_example_configs,
};

use std::path::{Path, PathBuf};

/// Default file name of the repository list.
pub const REPOS_FILE: &str = "repos.conf";

/// Name of the configuration directory next to the executable.
pub const CONF_DIR: &str = "conf";

/// Path of the example file generated for a repository list path.
fn example_path_for(path: &Path) -> PathBuf {
    path.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(REPOS_EXAMPLE_FILE)
}
