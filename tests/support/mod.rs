//! Shared helpers for integration tests.

#[allow(dead_code)]
#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`.
#[allow(dead_code)]
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Names of leftover temporary files in `dir`.
#[allow(dead_code)]
#[must_use]
pub fn temp_files_in(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(".tmp"))
                .collect()
        })
        .unwrap_or_default()
}
