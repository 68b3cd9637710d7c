//! Release Mirror Core Library
//!
//! This library mirrors published release assets of GitHub and GitLab
//! repositories into a local directory tree, fetching through a prioritized
//! list of download mirrors and verifying every byte that lands on disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`release`] - Canonical release and asset records
//! - [`resolver`] - Hosting API calls and normalization into release records
//! - [`download`] - Mirror routing, streamed transfers, retry and atomic publish
//! - [`verify`] - SHA-256/512 hashing and checksum manifests
//! - [`orchestrator`] - Per-repository processing and bounded batch runs
//! - [`config`] - Repository list and mirror list files
//! - [`logging`] - Stdout plus per-run log file, and log retention

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod logging;
pub mod orchestrator;
pub mod release;
pub mod resolver;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;
pub mod verify;

// Re-export commonly used types
pub use config::{ConfigError, RepoList, load_mirrors, load_repos};
pub use download::{
    AcquisitionEngine, DownloadError, DownloadOutcome, DownloadStats, HttpClient, MirrorList,
    MirrorRouter, RetryPolicy,
};
pub use orchestrator::{BatchStats, Orchestrator, OrchestratorError, RepoReport, RepoSpec};
pub use release::{AssetRecord, ReleaseRecord};
pub use resolver::{ProviderKind, ReleaseResolver, ReleaseSelection, ResolveError};
pub use verify::{VerificationReport, VerifyError};
