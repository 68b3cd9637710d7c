//! Process logging: stdout plus one timestamped log file per run.
//!
//! Log files are named `download_<YYYYMMDD_HHMMSS>.log` and live in a
//! dedicated directory; [`clean_old_logs`] prunes the ones past retention.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Prefix of every log file name.
pub const LOG_FILE_PREFIX: &str = "download";

/// Age after which log files are deleted.
pub const LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory or file could not be created.
    #[error("cannot create log file {path}: {source}")]
    Create {
        /// The directory or file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed.
    #[error("failed to install log subscriber: {reason}")]
    Subscriber {
        /// Error text from the subscriber registry.
        reason: String,
    },
}

/// Handle describing the active log file.
#[derive(Debug, Clone)]
pub struct LogSession {
    dir: PathBuf,
    file: PathBuf,
}

impl LogSession {
    /// Returns the log directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the log file of this run.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// Returns the log file name for a run started now.
#[must_use]
pub fn log_file_name() -> String {
    format!(
        "{LOG_FILE_PREFIX}_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Installs the global subscriber writing to stdout and to a new log file.
///
/// `RUST_LOG` takes priority over `default_level`.
///
/// # Errors
///
/// Returns [`LoggingError::Create`] if the directory or file cannot be
/// created, or [`LoggingError::Subscriber`] if a subscriber is already set.
pub fn init(log_dir: &Path, default_level: &str) -> Result<LogSession, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::Create {
        path: log_dir.to_path_buf(),
        source,
    })?;
    let path = log_dir.join(log_file_name());
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::Create {
            path: path.clone(),
            source,
        })?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| LoggingError::Subscriber {
            reason: e.to_string(),
        })?;

    debug!(file = %path.display(), "logging initialized");
    Ok(LogSession {
        dir: log_dir.to_path_buf(),
        file: path,
    })
}

/// Deletes log files in `dir` last modified more than `max_age` ago.
///
/// Only regular files named like this program's log files are considered.
/// Returns the number of files removed; per-file failures are logged.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be listed.
pub fn clean_old_logs(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !is_log_file_name(&name) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        if let Ok(modified) = metadata.modified()
            && modified < cutoff
        {
            let path = entry.path();
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "deleted old log file");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "cannot delete old log file"),
            }
        }
    }

    Ok(removed)
}

fn is_log_file_name(name: &str) -> bool {
    name.starts_with(&format!("{LOG_FILE_PREFIX}_")) && name.ends_with(".log")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backdate(path: &Path, age: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_log_file_name_format() {
        let name = log_file_name();
        assert!(name.starts_with("download_"), "Expected prefix in: {name}");
        assert!(name.ends_with(".log"));
        // download_YYYYMMDD_HHMMSS.log
        assert_eq!(name.len(), "download_".len() + 15 + ".log".len());
    }

    #[test]
    fn test_clean_old_logs_removes_only_expired_log_files() {
        let dir = TempDir::new().unwrap();
        let old_log = dir.path().join("download_20200101_000000.log");
        let new_log = dir.path().join("download_20990101_000000.log");
        let old_other = dir.path().join("notes.txt");
        for path in [&old_log, &new_log, &old_other] {
            std::fs::write(path, "x").unwrap();
        }
        let eight_days = Duration::from_secs(8 * 24 * 60 * 60);
        backdate(&old_log, eight_days);
        backdate(&old_other, eight_days);

        let removed = clean_old_logs(dir.path(), LOG_RETENTION).unwrap();

        assert_eq!(removed, 1);
        assert!(!old_log.exists());
        assert!(new_log.exists());
        assert!(old_other.exists());
    }

    #[test]
    fn test_clean_old_logs_missing_dir_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(clean_old_logs(&dir.path().join("absent"), LOG_RETENTION).is_err());
    }
}
