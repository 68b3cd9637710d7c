//! Error types for integrity verification.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while hashing files or checking a release manifest.
///
/// Any of these returned from manifest verification fails the whole release.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A file could not be read, hashed or written.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A listed file hashes to a different digest than the manifest states.
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    DigestMismatch {
        /// File name relative to the release directory.
        file: String,
        /// Digest from the manifest.
        expected: String,
        /// Recomputed digest.
        actual: String,
    },

    /// A manifest line carries a digest that is neither SHA-256 nor SHA-512 hex.
    #[error("malformed entry in {manifest} at line {line}: {reason}")]
    MalformedEntry {
        /// Manifest path.
        manifest: PathBuf,
        /// 1-indexed line number.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },

    /// The blocking hash task panicked or was cancelled.
    #[error("hash task for {path} did not complete: {reason}")]
    TaskFailed {
        /// The file being hashed.
        path: PathBuf,
        /// Join error text.
        reason: String,
    },
}

impl VerifyError {
    /// Creates an IO error with the file path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a digest mismatch error.
    pub fn mismatch(
        file: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::DigestMismatch {
            file: file.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a malformed-entry error.
    pub fn malformed(manifest: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedEntry {
            manifest: manifest.into(),
            line,
            reason: reason.into(),
        }
    }
}
