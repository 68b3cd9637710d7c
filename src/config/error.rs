//! Error types for configuration files.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the repository list.
///
/// Only the repository list is mandatory; the mirror list falls back to the
/// built-in default instead of failing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file does not exist.
    #[error(
        "configuration file {path} does not exist\n  Suggestion: copy {example} to {path} and list one repository per line"
    )]
    Missing {
        /// The configured path.
        path: PathBuf,
        /// The generated example next to it.
        example: PathBuf,
    },

    /// The file exists but cannot be read.
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        /// The configured path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Maps an IO error on `path`, distinguishing a missing file.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            let example = super::example_path_for(&path);
            Self::Missing { path, example }
        } else {
            Self::Read { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_suggests_example() {
        let error = ConfigError::from_io(
            "/opt/mirror/conf/repos.conf",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        let msg = error.to_string();
        assert!(matches!(error, ConfigError::Missing { .. }));
        assert!(msg.contains("repos.conf.example"), "Expected example path in: {msg}");
    }

    #[test]
    fn test_other_io_error_is_read_error() {
        let error = ConfigError::from_io(
            "/opt/mirror/conf/repos.conf",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
