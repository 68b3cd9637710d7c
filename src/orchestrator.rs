//! Repository orchestration: resolve releases, acquire their assets, verify.
//!
//! This module provides the [`Orchestrator`], which walks a batch of
//! repositories with a semaphore-bounded number of concurrent repository
//! tasks. Inside one repository, releases and assets are processed
//! sequentially.
//!
//! # Failure scope
//!
//! - A failed asset is logged; the next asset proceeds.
//! - A failed verification ends post-processing of that release only.
//! - A failed resolution ends that repository only.
//! - A release directory that cannot be created skips that release when all
//!   releases are selected, and ends the repository otherwise.
//! - The batch always waits for every repository task.
//!
//! # Example
//!
//! ```no_run
//! use release_mirror_core::download::{AcquisitionEngine, HttpClient, MirrorList, MirrorRouter, RetryPolicy};
//! use release_mirror_core::orchestrator::{Orchestrator, RepoSpec};
//! use release_mirror_core::resolver::{ReleaseResolver, ReleaseSelection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = AcquisitionEngine::new(
//!     HttpClient::new(),
//!     MirrorRouter::new(MirrorList::default()),
//!     RetryPolicy::default(),
//! );
//! let orchestrator = Orchestrator::new(ReleaseResolver::new()?, engine, "./downloads", 2)?;
//! let specs = vec![RepoSpec::github("acme", "widget")];
//! let stats = orchestrator.run_batch(specs, ReleaseSelection::Latest).await?;
//! println!("repositories: {}, failed: {}", stats.total(), stats.failed());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::download::AcquisitionEngine;
use crate::release::{RELEASE_NOTES_FILE, ReleaseRecord};
use crate::resolver::{ProviderKind, ReleaseResolver, ReleaseSelection, ResolveError};
use crate::verify::{self, VerificationReport, VerifyError};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default number of repositories processed at once.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Error type for orchestration.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Release metadata could not be fetched.
    #[error("failed to resolve releases of {repository}: {source}")]
    Resolve {
        /// `owner/repo`
        repository: String,
        /// The resolver error.
        #[source]
        source: ResolveError,
    },

    /// A release directory could not be created.
    #[error("cannot create release directory {path}: {source}")]
    CreateDir {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// One repository to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Hosting provider.
    pub provider: ProviderKind,
    /// Repository owner or group.
    pub owner: String,
    /// Repository name; also the top-level directory name on disk.
    pub repo: String,
    /// Mirror that replaces the global mirror list for this repository.
    pub forced_mirror: Option<String>,
}

impl RepoSpec {
    /// A GitHub repository using the global mirror list.
    #[must_use]
    pub fn github(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::GitHub,
            owner: owner.into(),
            repo: repo.into(),
            forced_mirror: None,
        }
    }

    /// Sets the forced mirror.
    #[must_use]
    pub fn with_forced_mirror(mut self, mirror: impl Into<String>) -> Self {
        let mirror = mirror.into();
        self.forced_mirror = (!mirror.trim().is_empty()).then_some(mirror);
        self
    }
}

impl fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// What happened to one release of a repository.
#[derive(Debug)]
pub struct ReleaseReport {
    /// Release tag.
    pub tag: String,
    /// `<root>/<repo>/<tag>`
    pub dir: PathBuf,
    /// Assets present and checked at the end of the run.
    pub succeeded: usize,
    /// Assets that exhausted every source.
    pub failed: usize,
    /// Bulk verification result.
    pub verification: Result<VerificationReport, VerifyError>,
}

impl ReleaseReport {
    /// Returns true when every asset succeeded and verification passed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.verification.is_ok()
    }
}

/// What happened to one repository.
#[derive(Debug)]
pub enum RepoReport {
    /// The repository publishes no usable release.
    NoReleases,
    /// Releases were processed; some may still contain failures.
    Processed(Vec<ReleaseReport>),
}

/// Final state of one repository in the completion log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoStatus {
    /// Every release processed cleanly.
    Completed {
        /// Number of releases.
        releases: usize,
    },
    /// No usable release was published.
    NoReleases,
    /// Processed, but with failed assets or failed verification.
    Partial {
        /// Number of releases.
        releases: usize,
        /// Number of failed assets across releases.
        failed_assets: usize,
        /// Number of releases whose verification failed.
        failed_verifications: usize,
    },
    /// Processing stopped early.
    Failed {
        /// Error text.
        reason: String,
    },
}

/// One entry of the completion log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCompletion {
    /// `owner/repo`
    pub repository: String,
    /// Final state.
    pub status: RepoStatus,
}

/// Statistics from a batch run.
///
/// Atomic counters plus an append-only completion log, updated from
/// concurrent repository tasks.
#[derive(Debug, Default)]
pub struct BatchStats {
    completed: AtomicUsize,
    partial: AtomicUsize,
    failed: AtomicUsize,
    empty: AtomicUsize,
    log: Mutex<Vec<RepoCompletion>>,
}

impl BatchStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of repositories processed cleanly.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of repositories with some failed asset or release.
    #[must_use]
    pub fn partial(&self) -> usize {
        self.partial.load(Ordering::SeqCst)
    }

    /// Returns the number of repositories that stopped early.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of repositories without releases.
    #[must_use]
    pub fn empty(&self) -> usize {
        self.empty.load(Ordering::SeqCst)
    }

    /// Returns the number of repositories recorded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed() + self.partial() + self.failed() + self.empty()
    }

    /// Returns a snapshot of the completion log, in completion order.
    #[must_use]
    pub fn completions(&self) -> Vec<RepoCompletion> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, repository: String, status: RepoStatus) {
        let counter = match status {
            RepoStatus::Completed { .. } => &self.completed,
            RepoStatus::NoReleases => &self.empty,
            RepoStatus::Partial { .. } => &self.partial,
            RepoStatus::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RepoCompletion { repository, status });
    }
}

fn status_of(result: &Result<RepoReport, OrchestratorError>) -> RepoStatus {
    match result {
        Ok(RepoReport::NoReleases) => RepoStatus::NoReleases,
        Ok(RepoReport::Processed(releases)) => {
            let failed_assets = releases.iter().map(|r| r.failed).sum();
            let failed_verifications = releases.iter().filter(|r| r.verification.is_err()).count();
            if failed_assets == 0 && failed_verifications == 0 {
                RepoStatus::Completed {
                    releases: releases.len(),
                }
            } else {
                RepoStatus::Partial {
                    releases: releases.len(),
                    failed_assets,
                    failed_verifications,
                }
            }
        }
        Err(e) => RepoStatus::Failed {
            reason: e.to_string(),
        },
    }
}

/// Drives resolution, acquisition and verification for repositories.
///
/// Cheap to clone; clones share the semaphore, the resolver client and the
/// engine.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    resolver: ReleaseResolver,
    engine: AcquisitionEngine,
    root: PathBuf,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl Orchestrator {
    /// Creates a new orchestrator writing below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConcurrency`] if `concurrency` is
    /// outside 1..=100.
    pub fn new(
        resolver: ReleaseResolver,
        engine: AcquisitionEngine,
        root: impl Into<PathBuf>,
        concurrency: usize,
    ) -> Result<Self, OrchestratorError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(OrchestratorError::InvalidConcurrency { value: concurrency });
        }
        let root = root.into();
        debug!(concurrency, root = %root.display(), "creating orchestrator");
        Ok(Self {
            resolver,
            engine,
            root,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the download root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the acquisition engine.
    #[must_use]
    pub fn engine(&self) -> &AcquisitionEngine {
        &self.engine
    }

    /// Processes every repository of `specs`, at most `concurrency` at once.
    ///
    /// Individual repository failures do NOT cause this method to error;
    /// they are recorded in the returned [`BatchStats`].
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::SemaphoreClosed`] if the semaphore is closed.
    #[instrument(skip(self, specs), fields(repositories = specs.len(), root = %self.root.display()))]
    pub async fn run_batch(
        &self,
        specs: Vec<RepoSpec>,
        selection: ReleaseSelection,
    ) -> Result<BatchStats, OrchestratorError> {
        let stats = Arc::new(BatchStats::new());
        let mut handles = Vec::with_capacity(specs.len());

        info!(concurrency = self.concurrency, "starting batch");

        for spec in specs {
            let repository = spec.to_string();
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| OrchestratorError::SemaphoreClosed)?;

            let orchestrator = self.clone();
            let stats = Arc::clone(&stats);

            let handle = tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                let result = orchestrator.process_repo(&spec, selection).await;
                if let Err(e) = &result {
                    error!(repository = %spec, error = %e, "repository processing failed");
                }
                stats.record(spec.to_string(), status_of(&result));
            });
            handles.push((repository, handle));
        }

        debug!(task_count = handles.len(), "waiting for repositories to complete");

        join_repository_tasks(handles, &stats).await;

        // All task clones are dropped once joined.
        let stats = Arc::try_unwrap(stats).unwrap_or_else(|shared| {
            let snapshot = BatchStats::new();
            for entry in shared.completions() {
                snapshot.record(entry.repository, entry.status);
            }
            snapshot
        });

        info!(
            completed = stats.completed(),
            partial = stats.partial(),
            failed = stats.failed(),
            no_releases = stats.empty(),
            downloaded = self.engine.stats().downloaded(),
            skipped = self.engine.stats().skipped(),
            failed_assets = self.engine.stats().failed(),
            "batch complete"
        );
        Ok(stats)
    }

    /// Processes one repository: resolve, then every selected release in order.
    ///
    /// A repository without releases is not an error.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::Resolve`] when release metadata cannot be fetched
    /// - [`OrchestratorError::CreateDir`] when the latest release's directory
    ///   cannot be created
    #[instrument(skip(self, spec), fields(repository = %spec, provider = %spec.provider))]
    pub async fn process_repo(
        &self,
        spec: &RepoSpec,
        selection: ReleaseSelection,
    ) -> Result<RepoReport, OrchestratorError> {
        info!(?selection, forced_mirror = ?spec.forced_mirror, "processing repository");

        let releases = match self
            .resolver
            .resolve(&spec.provider, &spec.owner, &spec.repo, selection)
            .await
        {
            Ok(releases) => releases,
            Err(e) if e.is_not_found() => {
                warn!("repository has no usable release");
                return Ok(RepoReport::NoReleases);
            }
            Err(source) => {
                return Err(OrchestratorError::Resolve {
                    repository: spec.to_string(),
                    source,
                });
            }
        };

        let mut reports = Vec::with_capacity(releases.len());
        for release in releases {
            let tag = release.tag.clone();
            let asset_count = release.assets.len();
            let report = match self.process_release(spec, release).await {
                Ok(report) => report,
                Err(OrchestratorError::CreateDir { path, source })
                    if selection == ReleaseSelection::All =>
                {
                    error!(
                        %tag,
                        dir = %path.display(),
                        error = %source,
                        "cannot create release directory; skipping release"
                    );
                    reports.push(ReleaseReport {
                        tag,
                        dir: path.clone(),
                        succeeded: 0,
                        failed: asset_count,
                        verification: Err(VerifyError::io(path, source)),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Err(e) = &report.verification {
                error!(tag = %report.tag, error = %e, "release verification failed");
            }
            reports.push(report);
        }

        info!(releases = reports.len(), "repository processed");
        Ok(RepoReport::Processed(reports))
    }

    #[instrument(skip(self, spec, release), fields(tag = %release.tag))]
    async fn process_release(
        &self,
        spec: &RepoSpec,
        release: ReleaseRecord,
    ) -> Result<ReleaseReport, OrchestratorError> {
        let dir = self.root.join(&spec.repo).join(&release.tag);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| OrchestratorError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        info!(dir = %dir.display(), assets = release.assets.len(), "processing release");

        write_notes(&dir, &release).await;

        let mut hash_checked = HashSet::new();
        let mut succeeded = 0;
        let mut failed = 0;
        for asset in &release.assets {
            match &asset.expected_hash {
                Some(hash) => debug!(asset = %asset.name, sha256 = %hash, "published digest"),
                None => debug!(asset = %asset.name, "no published digest"),
            }

            let dest = dir.join(&asset.name);
            let outcome = self
                .engine
                .acquire(asset, &dest, spec.forced_mirror.as_deref())
                .await;
            if outcome.is_success() {
                succeeded += 1;
                if outcome.hash_verified() {
                    hash_checked.insert(asset.name.clone());
                }
            } else {
                failed += 1;
                error!(asset = %asset.name, ?outcome, "asset acquisition failed");
            }
        }

        let tag = release.tag.clone();
        let verify_dir = dir.clone();
        let verification = tokio::task::spawn_blocking(move || {
            verify::verify_release(&verify_dir, &release, &hash_checked)
        })
        .await
        .unwrap_or_else(|e| {
            Err(VerifyError::TaskFailed {
                path: dir.clone(),
                reason: e.to_string(),
            })
        });

        Ok(ReleaseReport {
            tag,
            dir,
            succeeded,
            failed,
            verification,
        })
    }
}

/// Waits for every repository task. A task that panicked or was cancelled
/// never recorded its own status, so it is recorded as failed here.
async fn join_repository_tasks(handles: Vec<(String, JoinHandle<()>)>, stats: &BatchStats) {
    for (repository, handle) in handles {
        // Task panics are recorded but don't fail the batch
        if let Err(e) = handle.await {
            warn!(%repository, error = %e, "repository task panicked");
            stats.record(
                repository,
                RepoStatus::Failed {
                    reason: format!("repository task did not complete: {e}"),
                },
            );
        }
    }
}

/// Writes the release notes file; a failure is only logged.
async fn write_notes(dir: &Path, release: &ReleaseRecord) {
    let path = dir.join(RELEASE_NOTES_FILE);
    match tokio::fs::write(&path, release.notes_or_placeholder()).await {
        Ok(()) => debug!(path = %path.display(), "release notes saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "cannot write release notes"),
    }
}
