//! Asset acquisition: streamed HTTP transfer, mirror fallback and retries.
//!
//! This module turns an [`AssetRecord`](crate::release::AssetRecord) into a
//! verified file on disk, trying each candidate mirror in order with a fixed
//! retry budget.
//!
//! # Features
//!
//! - Streaming downloads into `<dest>.tmp`, renamed only once verified
//! - Mirror URL rewriting for primary-origin assets, with per-repository override
//! - Constant-delay retries over a bounded `(source, attempt)` plan
//! - Size and SHA-256 checks before publish
//! - Configurable timeouts (30s connect, 5min request by default)

mod client;
mod constants;
mod engine;
mod error;
mod mirror;
mod retry;

pub use client::HttpClient;
pub use constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MIRROR, DEFAULT_RETRY_DELAY};
pub use engine::{AcquisitionEngine, DownloadOutcome, DownloadStats, temp_path_for};
pub use error::DownloadError;
pub use mirror::{MirrorList, MirrorRouter, is_primary_origin, rewrite_through_mirror};
pub use retry::{Attempt, AttemptPlan, FailureType, RetryDecision, RetryPolicy, classify_error};

// Module-local Result aliases are not used; signatures spell out
// `Result<T, DownloadError>`.
