//! Integrity verification for downloaded release assets.
//!
//! Two tiers are covered here:
//!
//! - per-file digest checks used by the acquisition engine when the provider
//!   publishes an authoritative SHA-256 for an asset
//! - bulk release verification against a checksum manifest found in the
//!   release directory, or generation of a local manifest when none exists
//!
//! Hashing is synchronous; async callers go through [`sha256_file_async`]
//! and [`hash_matches_async`], which move the work onto the blocking pool.

mod error;
mod manifest;

pub use error::VerifyError;
pub use manifest::{
    GENERATED_MANIFEST_NAME, ManifestEntry, find_manifest, generate_manifest,
    manifest_candidates, parse_manifest, verify_manifest,
};

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, info, instrument, warn};

use crate::release::ReleaseRecord;

/// Hash algorithms recognized in checksum manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256, 64 hex characters.
    Sha256,
    /// SHA-512, 128 hex characters.
    Sha512,
}

impl DigestAlgorithm {
    /// Picks the algorithm from the length of a hex digest.
    #[must_use]
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            64 => Some(Self::Sha256),
            128 => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// Computes the lowercase hex digest of a file.
///
/// # Errors
///
/// Returns [`VerifyError::Io`] if the file cannot be opened or read.
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String, VerifyError> {
    let mut file = File::open(path).map_err(|e| VerifyError::io(path, e))?;
    match algorithm {
        DigestAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            io::copy(&mut file, &mut hasher).map_err(|e| VerifyError::io(path, e))?;
            Ok(format!("{:x}", hasher.finalize()))
        }
        DigestAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            io::copy(&mut file, &mut hasher).map_err(|e| VerifyError::io(path, e))?;
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}

/// Computes the lowercase hex SHA-256 of a file.
///
/// # Errors
///
/// Returns [`VerifyError::Io`] if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, VerifyError> {
    digest_file(path, DigestAlgorithm::Sha256)
}

/// Returns true iff the file's SHA-256 equals `expected`, ignoring hex case.
///
/// # Errors
///
/// Returns [`VerifyError::Io`] if the file cannot be read.
pub fn hash_matches(path: &Path, expected: &str) -> Result<bool, VerifyError> {
    let actual = sha256_file(path)?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}

/// Computes a file's SHA-256 on the blocking thread pool.
///
/// # Errors
///
/// Returns [`VerifyError::Io`] if the file cannot be read, or
/// [`VerifyError::TaskFailed`] if the blocking task does not complete.
pub async fn sha256_file_async(path: PathBuf) -> Result<String, VerifyError> {
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || sha256_file(&task_path))
        .await
        .map_err(|e| VerifyError::TaskFailed {
            path,
            reason: e.to_string(),
        })?
}

/// Async counterpart of [`hash_matches`].
///
/// # Errors
///
/// Same as [`sha256_file_async`].
pub async fn hash_matches_async(path: PathBuf, expected: &str) -> Result<bool, VerifyError> {
    let actual = sha256_file_async(path).await?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}

/// What bulk verification did for one release directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationReport {
    /// Every asset had an authoritative hash checked during acquisition.
    AllAssetsHashed,
    /// An authoritative manifest was found and every listed file matched.
    ManifestVerified {
        /// The manifest that was checked.
        manifest: PathBuf,
        /// Number of entries checked.
        entries: usize,
    },
    /// No manifest existed; an advisory one was written.
    ManifestGenerated {
        /// The generated manifest.
        manifest: PathBuf,
        /// Number of files listed.
        entries: usize,
    },
}

/// Runs bulk verification for one release directory.
///
/// `hash_checked` holds the names of assets whose authoritative hash was
/// confirmed during acquisition. When it covers every asset of the release,
/// nothing else is done. Otherwise the first manifest found (see
/// [`manifest_candidates`]) is verified, or a manifest is generated.
///
/// # Errors
///
/// Returns a [`VerifyError`] when a manifest entry does not match, is
/// malformed, or refers to a file that cannot be read; also when the
/// generated manifest cannot be written.
#[instrument(skip(release, hash_checked), fields(tag = %release.tag, dir = %dir.display()))]
pub fn verify_release(
    dir: &Path,
    release: &ReleaseRecord,
    hash_checked: &HashSet<String>,
) -> Result<VerificationReport, VerifyError> {
    let covered = release
        .assets
        .iter()
        .all(|asset| asset.expected_hash.is_some() && hash_checked.contains(&asset.name));
    if covered {
        info!("all assets verified against published hashes; skipping manifest check");
        return Ok(VerificationReport::AllAssetsHashed);
    }

    debug!("looking for checksum manifest");
    if let Some(manifest) = find_manifest(dir, &release.tag) {
        info!(manifest = %manifest.display(), "found checksum manifest; verifying");
        let entries = verify_manifest(&manifest, dir)?;
        info!(entries, "all manifest entries verified");
        return Ok(VerificationReport::ManifestVerified { manifest, entries });
    }

    warn!("no checksum manifest published; generating a local one");
    let (manifest, entries) = generate_manifest(dir)?;
    info!(
        manifest = %manifest.display(),
        entries,
        "local checksum manifest written (check with `sha256sum -c`)"
    );
    Ok(VerificationReport::ManifestGenerated { manifest, entries })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::release::AssetRecord;
    use tempfile::TempDir;

    /// SHA-256 of the ASCII bytes `test`.
    const TEST_SHA256: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn asset(name: &str, hash: Option<&str>) -> AssetRecord {
        AssetRecord {
            name: name.to_string(),
            expected_size: 4,
            source_url: format!("https://github.com/acme/widget/releases/download/v1/{name}"),
            expected_hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn test_sha256_file_known_vector() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"test").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), TEST_SHA256);
    }

    #[test]
    fn test_hash_matches_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"test").unwrap();
        assert!(hash_matches(&path, TEST_SHA256).unwrap());
        assert!(hash_matches(&path, &TEST_SHA256.to_ascii_uppercase()).unwrap());
        assert!(!hash_matches(&path, &"0".repeat(64)).unwrap());
    }

    #[test]
    fn test_hash_matches_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = hash_matches(&dir.path().join("missing"), TEST_SHA256);
        assert!(matches!(result, Err(VerifyError::Io { .. })));
    }

    #[tokio::test]
    async fn test_hash_matches_async_agrees_with_sync() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"test").unwrap();
        assert!(hash_matches_async(path.clone(), TEST_SHA256).await.unwrap());
        assert_eq!(sha256_file_async(path).await.unwrap(), TEST_SHA256);
    }

    #[test]
    fn test_digest_algorithm_from_len() {
        assert_eq!(DigestAlgorithm::from_hex_len(64), Some(DigestAlgorithm::Sha256));
        assert_eq!(DigestAlgorithm::from_hex_len(128), Some(DigestAlgorithm::Sha512));
        assert_eq!(DigestAlgorithm::from_hex_len(40), None);
    }

    #[test]
    fn test_verify_release_skips_when_all_hashes_checked() {
        let dir = TempDir::new().unwrap();
        let release = ReleaseRecord {
            tag: "v1".to_string(),
            notes: String::new(),
            assets: vec![asset("a.bin", Some(TEST_SHA256))],
        };
        let checked: HashSet<String> = ["a.bin".to_string()].into_iter().collect();

        let report = verify_release(dir.path(), &release, &checked).unwrap();
        assert_eq!(report, VerificationReport::AllAssetsHashed);
        assert!(!dir.path().join(GENERATED_MANIFEST_NAME).exists());
    }

    #[test]
    fn test_verify_release_generates_manifest_when_hash_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"test").unwrap();
        let release = ReleaseRecord {
            tag: "v1".to_string(),
            notes: String::new(),
            assets: vec![asset("a.bin", None)],
        };

        let report = verify_release(dir.path(), &release, &HashSet::new()).unwrap();
        match report {
            VerificationReport::ManifestGenerated { manifest, entries } => {
                assert_eq!(entries, 1);
                let text = std::fs::read_to_string(manifest).unwrap();
                assert_eq!(text, format!("{TEST_SHA256}  a.bin\n"));
            }
            other => panic!("Expected ManifestGenerated, got: {other:?}"),
        }
    }

    #[test]
    fn test_verify_release_runs_manifest_when_hashed_asset_failed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"test").unwrap();
        let release = ReleaseRecord {
            tag: "v1".to_string(),
            notes: String::new(),
            assets: vec![asset("a.bin", Some(TEST_SHA256)), asset("b.bin", Some(TEST_SHA256))],
        };
        // b.bin never made it to disk, so its hash was never checked.
        let checked: HashSet<String> = ["a.bin".to_string()].into_iter().collect();

        let report = verify_release(dir.path(), &release, &checked).unwrap();
        assert!(matches!(report, VerificationReport::ManifestGenerated { .. }));
    }

    #[test]
    fn test_verify_release_fails_on_manifest_mismatch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"tampered").unwrap();
        std::fs::write(
            dir.path().join("SHA256SUMS"),
            format!("{TEST_SHA256}  a.bin\n"),
        )
        .unwrap();
        let release = ReleaseRecord {
            tag: "v1".to_string(),
            notes: String::new(),
            assets: vec![asset("a.bin", None)],
        };

        let result = verify_release(dir.path(), &release, &HashSet::new());
        assert!(matches!(result, Err(VerifyError::DigestMismatch { .. })));
        // Assets stay on disk for inspection.
        assert!(dir.path().join("a.bin").exists());
    }
}
