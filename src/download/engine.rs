//! Asset acquisition engine: existing-file short-circuit, mirror iteration,
//! per-source retry budget, post-transfer verification and atomic publish.
//!
//! # Overview
//!
//! For one asset and one destination path the engine:
//!
//! 1. Accepts an existing destination file when its size matches and, if
//!    the provider published a digest, its SHA-256 matches too. No network
//!    call is made in that case.
//! 2. Asks the [`MirrorRouter`] for the ordered download sources.
//! 3. Walks an [`AttemptPlan`] over those sources. Each attempt streams into
//!    `<dest>.tmp`, checks size and hash on the temporary file, then renames
//!    it onto the destination.
//! 4. Reports a [`DownloadOutcome`]; a failed asset never aborts its caller.
//!
//! # Example
//!
//! ```no_run
//! use release_mirror_core::download::{AcquisitionEngine, HttpClient, MirrorList, MirrorRouter, RetryPolicy};
//! use release_mirror_core::release::AssetRecord;
//! use std::path::Path;
//!
//! # async fn example() {
//! let engine = AcquisitionEngine::new(
//!     HttpClient::new(),
//!     MirrorRouter::new(MirrorList::default()),
//!     RetryPolicy::default(),
//! );
//! let asset = AssetRecord {
//!     name: "widget.tar.gz".to_string(),
//!     expected_size: 1000,
//!     source_url: "https://github.com/acme/widget/releases/download/v2.0/widget.tar.gz".to_string(),
//!     expected_hash: None,
//! };
//! let outcome = engine.acquire(&asset, Path::new("./widget/v2.0/widget.tar.gz"), None).await;
//! println!("{outcome:?}");
//! # }
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, instrument, warn};

use super::constants::TEMP_SUFFIX;
use super::mirror::MirrorRouter;
use super::retry::{AttemptPlan, RetryDecision, RetryPolicy, classify_error};
use super::{DownloadError, HttpClient};
use crate::release::AssetRecord;
use crate::verify::{self, VerifyError};

/// Result of acquiring one asset.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The destination already held a complete copy; nothing was fetched.
    SkippedAlreadyComplete {
        /// Whether completeness was confirmed by the published digest.
        hash_verified: bool,
    },
    /// Downloaded and matched the published SHA-256.
    DownloadedVerified,
    /// Downloaded without a published digest; size checked when known.
    DownloadedSizeOnly,
    /// Every source exhausted its budget.
    Failed {
        /// The most recent error observed.
        error: DownloadError,
        /// Number of attempts made across all sources.
        attempts: u32,
    },
}

impl DownloadOutcome {
    /// Returns true unless the asset failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Returns true when the file on disk was checked against the published digest.
    #[must_use]
    pub fn hash_verified(&self) -> bool {
        matches!(
            self,
            Self::DownloadedVerified
                | Self::SkippedAlreadyComplete {
                    hash_verified: true
                }
        )
    }
}

/// Counters for one run of the engine.
///
/// Uses atomic counters so that concurrent repository tasks can share a
/// single engine.
#[derive(Debug, Default)]
pub struct DownloadStats {
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of assets fetched successfully.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Returns the number of assets already complete on disk.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of assets that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of retried attempts.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Returns the number of assets processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded() + self.skipped() + self.failed()
    }

    fn record(&self, outcome: &DownloadOutcome) {
        let counter = match outcome {
            DownloadOutcome::SkippedAlreadyComplete { .. } => &self.skipped,
            DownloadOutcome::DownloadedVerified | DownloadOutcome::DownloadedSizeOnly => {
                &self.downloaded
            }
            DownloadOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns the temporary path used while writing `dest`.
#[must_use]
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Drives the acquisition of single assets.
///
/// Cheap to clone; clones share the HTTP connection pool and the stats.
#[derive(Debug, Clone)]
pub struct AcquisitionEngine {
    client: HttpClient,
    router: MirrorRouter,
    retry_policy: RetryPolicy,
    stats: Arc<DownloadStats>,
}

impl AcquisitionEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(client: HttpClient, router: MirrorRouter, retry_policy: RetryPolicy) -> Self {
        debug!(
            max_attempts = retry_policy.max_attempts(),
            delay_ms = retry_policy.delay().as_millis(),
            mirrors = router.mirrors().hosts().len(),
            "creating acquisition engine"
        );
        Self {
            client,
            router,
            retry_policy,
            stats: Arc::new(DownloadStats::new()),
        }
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the shared counters.
    #[must_use]
    pub fn stats(&self) -> &DownloadStats {
        &self.stats
    }

    /// Acquires one asset at `dest`.
    ///
    /// `forced_mirror`, when set, is the only mirror tried for primary-origin
    /// URLs. Never returns an error: failures are reported as
    /// [`DownloadOutcome::Failed`].
    #[instrument(skip(self, asset, dest), fields(asset = %asset.name))]
    pub async fn acquire(
        &self,
        asset: &AssetRecord,
        dest: &Path,
        forced_mirror: Option<&str>,
    ) -> DownloadOutcome {
        let outcome = self.acquire_inner(asset, dest, forced_mirror).await;
        self.stats.record(&outcome);
        outcome
    }

    async fn acquire_inner(
        &self,
        asset: &AssetRecord,
        dest: &Path,
        forced_mirror: Option<&str>,
    ) -> DownloadOutcome {
        if let Some(outcome) = check_existing(asset, dest).await {
            return outcome;
        }

        let temp_path = temp_path_for(dest);
        if tokio::fs::try_exists(&temp_path).await.unwrap_or(false) {
            debug!(path = %temp_path.display(), "removing stale temporary file");
            let _ = tokio::fs::remove_file(&temp_path).await;
        }

        let sources = self.router.sources(&asset.source_url, forced_mirror);
        let max_attempts = self.retry_policy.max_attempts();
        info!(
            size = asset.expected_size,
            sources = sources.len(),
            "starting download"
        );

        let mut plan = AttemptPlan::new(&sources, max_attempts);
        let mut last_error = None;
        let mut attempts = 0u32;

        while let Some(step) = plan.next() {
            attempts += 1;
            debug!(
                source = step.source,
                attempt = step.attempt,
                max_attempts,
                "attempting download"
            );

            let error = match self.attempt(asset, step.source, &temp_path, dest).await {
                Ok(outcome) => {
                    info!(source = step.source, attempt = step.attempt, "asset acquired");
                    return outcome;
                }
                Err(error) => error,
            };

            match self
                .retry_policy
                .should_retry(classify_error(&error), step.attempt)
            {
                RetryDecision::Retry { delay, attempt } => {
                    warn!(
                        source = step.source,
                        attempt = step.attempt,
                        max_attempts,
                        next_attempt = attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "download attempt failed; retrying"
                    );
                    self.stats.increment_retried();
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::NextSource { reason } => {
                    warn!(
                        source = step.source,
                        attempt = step.attempt,
                        %reason,
                        error = %error,
                        "giving up on source"
                    );
                    plan.skip_source();
                }
            }
            last_error = Some(error);
        }

        let error = last_error.unwrap_or_else(|| DownloadError::no_sources(&asset.source_url));
        warn!(attempts, error = %error, "all download sources exhausted");
        DownloadOutcome::Failed { error, attempts }
    }

    /// One transfer from `url`, checked on the temporary file, then published.
    async fn attempt(
        &self,
        asset: &AssetRecord,
        url: &str,
        temp_path: &Path,
        dest: &Path,
    ) -> Result<DownloadOutcome, DownloadError> {
        self.client
            .fetch_to_path(url, temp_path, asset.expected_size)
            .await?;

        if let Err(error) = check_transferred(asset, temp_path).await {
            let _ = tokio::fs::remove_file(temp_path).await;
            return Err(error);
        }

        if let Err(source) = tokio::fs::rename(temp_path, dest).await {
            let _ = tokio::fs::remove_file(temp_path).await;
            return Err(DownloadError::publish(temp_path, dest, source));
        }

        if asset.expected_hash.is_some() {
            info!("hash verified");
            Ok(DownloadOutcome::DownloadedVerified)
        } else {
            info!("size verified");
            Ok(DownloadOutcome::DownloadedSizeOnly)
        }
    }
}

/// Decides whether an existing destination file is already complete.
///
/// Returns `None` when a download is needed; any existing file that does not
/// qualify has been removed by then.
async fn check_existing(asset: &AssetRecord, dest: &Path) -> Option<DownloadOutcome> {
    let Ok(metadata) = tokio::fs::metadata(dest).await else {
        return None;
    };

    let size_matches = asset.known_size() == Some(metadata.len());
    if size_matches {
        match &asset.expected_hash {
            Some(expected) => match verify::hash_matches_async(dest.to_path_buf(), expected).await
            {
                Ok(true) => {
                    info!("file already present and hash matches");
                    return Some(DownloadOutcome::SkippedAlreadyComplete {
                        hash_verified: true,
                    });
                }
                Ok(false) => warn!("existing file hash mismatch; downloading again"),
                Err(error) => warn!(error = %error, "could not hash existing file; downloading again"),
            },
            None => {
                info!(size = metadata.len(), "file already present and size matches");
                return Some(DownloadOutcome::SkippedAlreadyComplete {
                    hash_verified: false,
                });
            }
        }
    } else {
        warn!(
            expected = asset.expected_size,
            actual = metadata.len(),
            "existing file size differs; downloading again"
        );
    }

    if let Err(error) = tokio::fs::remove_file(dest).await {
        warn!(error = %error, path = %dest.display(), "failed to remove existing file");
    }
    None
}

/// Size and digest checks on the finished temporary file.
async fn check_transferred(asset: &AssetRecord, temp_path: &Path) -> Result<(), DownloadError> {
    let actual_size = tokio::fs::metadata(temp_path)
        .await
        .map_err(|e| DownloadError::io(temp_path, e))?
        .len();
    if let Some(expected) = asset.known_size()
        && actual_size != expected
    {
        return Err(DownloadError::integrity(temp_path, expected, actual_size));
    }

    if let Some(expected) = &asset.expected_hash {
        let actual = verify::sha256_file_async(temp_path.to_path_buf())
            .await
            .map_err(|e| verify_to_download(temp_path, e))?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(DownloadError::hash_mismatch(temp_path, expected, actual));
        }
    }
    Ok(())
}

fn verify_to_download(temp_path: &Path, error: VerifyError) -> DownloadError {
    match error {
        VerifyError::Io { path, source } => DownloadError::io(path, source),
        other => DownloadError::io(temp_path, std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::download::MirrorList;
    use tempfile::TempDir;

    const TEST_SHA256: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    /// Engine whose sources all point at a closed port; any network call fails fast.
    fn offline_engine() -> AcquisitionEngine {
        AcquisitionEngine::new(
            HttpClient::new_with_timeouts(1, 2),
            MirrorRouter::new(MirrorList::new(vec!["http://127.0.0.1:9".to_string()])),
            RetryPolicy::new(1, Duration::ZERO),
        )
    }

    fn asset(size: u64, hash: Option<&str>) -> AssetRecord {
        AssetRecord {
            name: "a.bin".to_string(),
            expected_size: size,
            source_url: "https://github.com/acme/widget/releases/download/v1/a.bin".to_string(),
            expected_hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/d/v1/widget.tar.gz")),
            PathBuf::from("/d/v1/widget.tar.gz.tmp")
        );
    }

    #[test]
    fn test_outcome_hash_verified() {
        assert!(DownloadOutcome::DownloadedVerified.hash_verified());
        assert!(
            DownloadOutcome::SkippedAlreadyComplete {
                hash_verified: true
            }
            .hash_verified()
        );
        assert!(
            !DownloadOutcome::SkippedAlreadyComplete {
                hash_verified: false
            }
            .hash_verified()
        );
        assert!(!DownloadOutcome::DownloadedSizeOnly.hash_verified());
    }

    #[tokio::test]
    async fn test_existing_file_with_matching_hash_is_skipped() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.bin");
        std::fs::write(&dest, b"test").unwrap();

        let engine = offline_engine();
        let outcome = engine.acquire(&asset(4, Some(TEST_SHA256)), &dest, None).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::SkippedAlreadyComplete {
                hash_verified: true
            }
        ));
        assert_eq!(engine.stats().skipped(), 1);
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_existing_file_same_size_without_hash_is_skipped() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.bin");
        std::fs::write(&dest, b"junk").unwrap();

        let outcome = offline_engine().acquire(&asset(4, None), &dest, None).await;

        assert!(matches!(
            outcome,
            DownloadOutcome::SkippedAlreadyComplete {
                hash_verified: false
            }
        ));
    }

    #[tokio::test]
    async fn test_existing_file_with_wrong_hash_is_removed() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.bin");
        std::fs::write(&dest, b"tset").unwrap();

        let engine = offline_engine();
        let outcome = engine.acquire(&asset(4, Some(TEST_SHA256)), &dest, None).await;

        assert!(matches!(outcome, DownloadOutcome::Failed { attempts: 1, .. }));
        assert!(!dest.exists(), "corrupt file must not survive");
        assert!(!temp_path_for(&dest).exists());
        assert_eq!(engine.stats().failed(), 1);
    }

    #[tokio::test]
    async fn test_stale_temp_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.bin");
        std::fs::write(temp_path_for(&dest), b"partial").unwrap();

        let outcome = offline_engine().acquire(&asset(4, None), &dest, None).await;

        assert!(!outcome.is_success());
        assert!(!temp_path_for(&dest).exists());
    }
}
