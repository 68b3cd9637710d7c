//! Checksum manifest discovery, parsing, verification and generation.
//!
//! Manifests use the `sha256sum`/`sha512sum` text format: one
//! `<hex-digest> <filename>` entry per line, where the filename may carry a
//! leading `*` (binary mode marker).

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{DigestAlgorithm, VerifyError, digest_file, sha256_file};

/// Name of the manifest written when a release publishes none.
pub const GENERATED_MANIFEST_NAME: &str = "checksums.txt";

/// Conventional manifest names, in lookup order, before the tag-specific one.
const CONVENTIONAL_MANIFESTS: [&str; 5] = [
    "SHA256SUMS",
    "SHA512SUMS",
    "sha256sum.txt",
    "sha512sum.txt",
    GENERATED_MANIFEST_NAME,
];

/// One parsed manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// 1-indexed source line.
    pub line: usize,
    /// Expected hex digest as written in the manifest.
    pub digest: String,
    /// Algorithm implied by the digest length.
    pub algorithm: DigestAlgorithm,
    /// Bare file name (binary marker and directories stripped).
    pub file_name: String,
}

/// Returns the manifest names to look for, in order, for a given tag.
#[must_use]
pub fn manifest_candidates(tag: &str) -> Vec<String> {
    CONVENTIONAL_MANIFESTS
        .iter()
        .map(|name| (*name).to_string())
        .chain(std::iter::once(format!("{tag}_checksums.txt")))
        .collect()
}

/// Finds the first manifest present in `dir`.
#[must_use]
pub fn find_manifest(dir: &Path, tag: &str) -> Option<PathBuf> {
    manifest_candidates(tag)
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Parses manifest text into entries.
///
/// Blank lines and lines with fewer than two fields are ignored.
///
/// # Errors
///
/// Returns [`VerifyError::MalformedEntry`] when a digest is not hex or its
/// length matches neither SHA-256 nor SHA-512.
pub fn parse_manifest(manifest: &Path, text: &str) -> Result<Vec<ManifestEntry>, VerifyError> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let mut fields = raw.split_whitespace();
        let (Some(digest), Some(name)) = (fields.next(), fields.next()) else {
            continue;
        };

        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VerifyError::malformed(manifest, line, "digest is not hex"));
        }
        let Some(algorithm) = DigestAlgorithm::from_hex_len(digest.len()) else {
            return Err(VerifyError::malformed(
                manifest,
                line,
                format!("unsupported digest length {}", digest.len()),
            ));
        };

        let name = name.strip_prefix('*').unwrap_or(name);
        let Some(file_name) = Path::new(name).file_name().and_then(|n| n.to_str()) else {
            return Err(VerifyError::malformed(manifest, line, "missing file name"));
        };

        entries.push(ManifestEntry {
            line,
            digest: digest.to_string(),
            algorithm,
            file_name: file_name.to_string(),
        });
    }
    Ok(entries)
}

/// Verifies every entry of `manifest` against files in `dir`.
///
/// Returns the number of entries checked.
///
/// # Errors
///
/// Returns the first [`VerifyError`] encountered: unreadable manifest,
/// malformed entry, unreadable listed file, or digest mismatch.
pub fn verify_manifest(manifest: &Path, dir: &Path) -> Result<usize, VerifyError> {
    let text = fs::read_to_string(manifest).map_err(|e| VerifyError::io(manifest, e))?;
    let entries = parse_manifest(manifest, &text)?;

    for entry in &entries {
        let actual = digest_file(&dir.join(&entry.file_name), entry.algorithm)?;
        if !actual.eq_ignore_ascii_case(&entry.digest) {
            warn!(
                file = %entry.file_name,
                expected = %entry.digest,
                actual = %actual,
                "manifest digest mismatch"
            );
            return Err(VerifyError::mismatch(
                entry.file_name.clone(),
                entry.digest.clone(),
                actual,
            ));
        }
        debug!(file = %entry.file_name, "manifest entry verified");
    }

    Ok(entries.len())
}

/// Writes `checksums.txt` listing the SHA-256 of every regular file in `dir`.
///
/// The manifest itself is excluded; entries are sorted by file name so that
/// regenerating over unchanged files reproduces the same text. Returns the
/// manifest path and number of entries.
///
/// # Errors
///
/// Returns [`VerifyError::Io`] if the directory cannot be listed, a file
/// cannot be hashed, or the manifest cannot be written.
pub fn generate_manifest(dir: &Path) -> Result<(PathBuf, usize), VerifyError> {
    let manifest = dir.join(GENERATED_MANIFEST_NAME);

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| VerifyError::io(dir, e))? {
        let entry = entry.map_err(|e| VerifyError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| VerifyError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
            continue;
        };
        if name != GENERATED_MANIFEST_NAME {
            names.push(name);
        }
    }
    names.sort();

    let mut body = String::new();
    for name in &names {
        let digest = sha256_file(&dir.join(name))?;
        let _ = writeln!(body, "{digest}  {name}");
    }

    fs::write(&manifest, body).map_err(|e| VerifyError::io(&manifest, e))?;
    Ok((manifest, names.len()))
}
