//! Canonical release model shared by the resolver, engine and verifier.
//!
//! Provider-specific JSON shapes are mapped into [`ReleaseRecord`] and
//! [`AssetRecord`] once, in the resolver. Everything downstream only sees
//! these types.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

/// Placeholder written to `release_notes.txt` when a release has no body.
pub const EMPTY_NOTES_PLACEHOLDER: &str = "No release notes provided";

/// File name of the release notes written next to the assets.
pub const RELEASE_NOTES_FILE: &str = "release_notes.txt";

#[allow(clippy::expect_used)]
static SHA256_DIGEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sha256:([a-fA-F0-9]{64})").expect("digest pattern is a valid regex")
});

/// One tagged publication with its notes and downloadable assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    /// Release tag, already safe to use as a directory name.
    pub tag: String,
    /// Free-text release notes (may be empty).
    pub notes: String,
    /// Assets in provider order.
    pub assets: Vec<AssetRecord>,
}

impl ReleaseRecord {
    /// Returns the notes text to persist, substituting a placeholder for empty notes.
    #[must_use]
    pub fn notes_or_placeholder(&self) -> &str {
        if self.notes.trim().is_empty() {
            EMPTY_NOTES_PLACEHOLDER
        } else {
            &self.notes
        }
    }

    /// Returns true when every asset carries an authoritative hash.
    #[must_use]
    pub fn all_assets_hashed(&self) -> bool {
        self.assets.iter().all(|asset| asset.expected_hash.is_some())
    }
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// File name, safe for filesystem use.
    pub name: String,
    /// Expected size in bytes; `0` means unknown.
    pub expected_size: u64,
    /// Absolute download URL at the provider.
    pub source_url: String,
    /// Lowercase hex SHA-256 when the provider publishes one.
    pub expected_hash: Option<String>,
}

impl AssetRecord {
    /// Returns the expected size when known.
    #[must_use]
    pub fn known_size(&self) -> Option<u64> {
        (self.expected_size > 0).then_some(self.expected_size)
    }
}

/// Extracts a lowercase SHA-256 hex digest from a provider digest field.
///
/// Only the `sha256:<64 hex chars>` form is recognized; anything else yields `None`.
#[must_use]
pub fn extract_sha256(digest: &str) -> Option<String> {
    SHA256_DIGEST
        .captures(digest)
        .and_then(|captures| captures.get(1))
        .map(|hex| hex.as_str().to_ascii_lowercase())
}

/// Validates an asset name for use as a file name inside a release directory.
///
/// Returns `None` for names that are empty, contain path separators, or
/// would escape the directory.
#[must_use]
pub fn safe_asset_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
        return None;
    }
    let mut components = Path::new(trimmed).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(trimmed.to_string()),
        _ => None,
    }
}

/// Converts a release tag into a directory name.
///
/// Path separators are replaced with `_`; tags that reduce to `.`/`..` or
/// nothing are rejected.
#[must_use]
pub fn safe_tag_dir(tag: &str) -> Option<String> {
    let replaced: String = tag
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    match replaced.as_str() {
        "" | "." | ".." => None,
        _ => Some(replaced),
    }
}
