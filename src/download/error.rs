//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so that a single log
//! line is enough to diagnose a failed attempt.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while acquiring one asset.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the temporary file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The transfer ended with a different byte count than the caller expected.
    #[error("size mismatch downloading {url}: expected {expected_bytes} bytes, wrote {actual_bytes}")]
    SizeMismatch {
        /// The URL being fetched.
        url: String,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Bytes actually written.
        actual_bytes: u64,
    },

    /// The finished file has a different on-disk size than the release declares.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    IntegrityMismatch {
        /// File that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// The finished file does not hash to the published SHA-256.
    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        /// File that failed verification.
        path: PathBuf,
        /// Published digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// Flushing the temporary file to storage failed.
    #[error("failed to flush {path} to storage: {source}")]
    Flush {
        /// The temporary file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Renaming the temporary file onto the final path failed.
    #[error("failed to publish {from} as {to}: {source}")]
    Publish {
        /// Temporary file.
        from: PathBuf,
        /// Final destination.
        to: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The attempt plan for the asset contained no source to try.
    #[error("no download source available for {url}")]
    NoSources {
        /// The asset's origin URL.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an error for an asset with no source to try.
    pub fn no_sources(url: impl Into<String>) -> Self {
        Self::NoSources { url: url.into() }
    }

    /// Creates a transfer size mismatch error.
    pub fn size_mismatch(url: impl Into<String>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::SizeMismatch {
            url: url.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates an on-disk size mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::IntegrityMismatch {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a hash mismatch error.
    pub fn hash_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::HashMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a flush error.
    pub fn flush(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Flush {
            path: path.into(),
            source,
        }
    }

    /// Creates a publish (rename) error.
    pub fn publish(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Publish {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Returns true for failures that abandon the current mirror without retrying it.
    #[must_use]
    pub fn is_publish_failure(&self) -> bool {
        matches!(self, Self::Publish { .. } | Self::Flush { .. })
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path, which the source errors don't carry.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::timeout("https://github.com/acme/widget/releases/download/v1/a");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("acme/widget"));
    }

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://gh-proxy.com/github.com/a/b", 502);
        let msg = error.to_string();
        assert!(msg.contains("502"), "Expected '502' in: {msg}");
        assert!(msg.contains("gh-proxy.com"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_download_error_size_mismatch_display() {
        let error = DownloadError::size_mismatch("https://example.com/widget.tar.gz", 1000, 999);
        let msg = error.to_string();
        assert!(msg.contains("expected 1000"), "Expected size in: {msg}");
        assert!(msg.contains("wrote 999"), "Expected written bytes in: {msg}");
    }

    #[test]
    fn test_download_error_hash_mismatch_display() {
        let error = DownloadError::hash_mismatch("/tmp/widget.tar.gz", "aa", "bb");
        let msg = error.to_string();
        assert!(msg.contains("/tmp/widget.tar.gz"), "Expected path in: {msg}");
        assert!(msg.contains("expected aa"), "Expected digest in: {msg}");
    }

    #[test]
    fn test_download_error_invalid_url_display() {
        let error = DownloadError::invalid_url("not-a-url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"), "Expected 'invalid URL' in: {msg}");
        assert!(msg.contains("not-a-url"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_download_error_no_sources_display() {
        let error = DownloadError::no_sources("https://github.com/acme/widget/releases/download/v1/a");
        let msg = error.to_string();
        assert!(msg.contains("no download source"), "Expected reason in: {msg}");
        assert!(msg.contains("acme/widget"), "Expected URL in: {msg}");
        assert!(!error.is_publish_failure());
    }

    #[test]
    fn test_publish_failures_are_classified() {
        let io = || std::io::Error::other("disk gone");
        assert!(DownloadError::publish("/a.tmp", "/a", io()).is_publish_failure());
        assert!(DownloadError::flush("/a.tmp", io()).is_publish_failure());
        assert!(!DownloadError::io("/a.tmp", io()).is_publish_failure());
        assert!(!DownloadError::integrity("/a", 10, 9).is_publish_failure());
    }
}
