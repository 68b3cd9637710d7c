//! Mirror list parsing (`proxies.txt`).
//!
//! One mirror host per line; only the first whitespace-separated field is
//! used. Blank lines and `#` comments are ignored.

use std::path::Path;

use tracing::{info, warn};

use crate::download::{DEFAULT_MIRROR, MirrorList};

/// Extracts mirror hosts from the text of a mirror list.
#[must_use]
pub fn parse_mirrors(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Loads the mirror list, falling back to the built-in default.
///
/// A missing or unreadable file is logged as a warning, never an error.
pub fn load_mirrors(path: &Path) -> MirrorList {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let hosts = parse_mirrors(&text);
            if hosts.is_empty() {
                warn!(path = %path.display(), default = DEFAULT_MIRROR, "mirror list is empty; using built-in default");
            } else {
                info!(path = %path.display(), mirrors = hosts.len(), "loaded mirror list");
            }
            MirrorList::new(hosts)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), default = DEFAULT_MIRROR, "mirror list not found; using built-in default");
            MirrorList::default()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, default = DEFAULT_MIRROR, "cannot read mirror list; using built-in default");
            MirrorList::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_mirrors_first_field_only() {
        let text = "# mirrors\ngh-proxy.com\n\n  ghps.cc   trailing words\n# cf.ghproxy.cc\n";
        assert_eq!(parse_mirrors(text), vec!["gh-proxy.com", "ghps.cc"]);
    }

    #[test]
    fn test_load_mirrors_missing_file_uses_default() {
        let dir = TempDir::new().unwrap();
        let mirrors = load_mirrors(&dir.path().join("proxies.txt"));
        assert_eq!(mirrors.hosts(), [DEFAULT_MIRROR]);
    }

    #[test]
    fn test_load_mirrors_reads_file_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxies.txt");
        std::fs::write(&path, "m1.example\nm2.example\n").unwrap();
        let mirrors = load_mirrors(&path);
        assert_eq!(mirrors.hosts(), ["m1.example", "m2.example"]);
    }

    #[test]
    fn test_load_mirrors_comment_only_file_uses_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxies.txt");
        std::fs::write(&path, "# nothing enabled\n").unwrap();
        assert_eq!(load_mirrors(&path).hosts(), [DEFAULT_MIRROR]);
    }
}
