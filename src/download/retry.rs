//! Retry budget, constant backoff and the bounded attempt plan.
//!
//! This module provides the [`RetryPolicy`], [`FailureType`] and
//! [`AttemptPlan`] types used by the acquisition engine.
//!
//! # Overview
//!
//! Every download source (a mirror-rewritten URL or the origin) gets the
//! same attempt budget. When an attempt fails, the error is classified:
//! - [`FailureType::Retryable`] - transport errors and integrity mismatches;
//!   the same source is tried again after a constant delay until its budget
//!   is spent
//! - [`FailureType::AbortSource`] - flush and publish failures; the current
//!   source is abandoned immediately
//!
//! [`AttemptPlan`] enumerates `(source, attempt)` pairs in order, so the
//! total number of attempts is bounded by `sources × max_attempts` no matter
//! how failures interleave.
//!
//! # Example
//!
//! ```
//! use release_mirror_core::download::{AttemptPlan, RetryPolicy};
//!
//! let sources = vec!["https://m1/x".to_string(), "https://m2/x".to_string()];
//! let policy = RetryPolicy::default();
//! let plan = AttemptPlan::new(&sources, policy.max_attempts());
//! assert_eq!(plan.count(), 6);
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// The same source may succeed on another attempt.
    ///
    /// Examples: network errors, timeouts, any HTTP error status, short
    /// transfers, size or hash mismatch after transfer.
    Retryable,

    /// The current source is abandoned without further attempts.
    ///
    /// Examples: flushing the temp file or renaming it onto the final path failed.
    AbortSource,
}

/// Decision after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the same source again after the delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Move on to the next source.
    NextSource {
        /// Human-readable reason why this source is done.
        reason: String,
    },
}

/// Per-source retry budget with a constant delay between attempts.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `delay`: 5 seconds
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per source (including the initial attempt).
    max_attempts: u32,

    /// Fixed pause between attempts against the same source.
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using the default delay.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns a copy of this policy with a different delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the maximum number of attempts per source.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Determines whether to retry the current source.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::AbortSource {
            return RetryDecision::NextSource {
                reason: "publish failure - abandoning source".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::NextSource {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = self.delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

/// Classifies a download error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Network, Timeout, HttpStatus (any) | Retryable |
/// | InvalidUrl, Io | Retryable |
/// | SizeMismatch, IntegrityMismatch, HashMismatch | Retryable |
/// | Flush, Publish | AbortSource |
#[instrument]
pub fn classify_error(error: &DownloadError) -> FailureType {
    if error.is_publish_failure() {
        FailureType::AbortSource
    } else {
        FailureType::Retryable
    }
}

/// One entry of an [`AttemptPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt<'a> {
    /// The URL to fetch.
    pub source: &'a str,
    /// Position of the source in the plan (0-indexed).
    pub source_index: usize,
    /// Attempt number against this source (1-indexed).
    pub attempt: u32,
}

/// Bounded iterator over `(source, attempt)` pairs.
///
/// Yields every attempt of the first source, then every attempt of the
/// second, and so on. [`skip_source`](Self::skip_source) drops the remaining
/// attempts of the current source.
#[derive(Debug, Clone)]
pub struct AttemptPlan<'a> {
    sources: &'a [String],
    max_attempts: u32,
    source_index: usize,
    next_attempt: u32,
}

impl<'a> AttemptPlan<'a> {
    /// Creates a plan of `max_attempts` (at least 1) attempts per source.
    #[must_use]
    pub fn new(sources: &'a [String], max_attempts: u32) -> Self {
        Self {
            sources,
            max_attempts: max_attempts.max(1),
            source_index: 0,
            next_attempt: 1,
        }
    }

    /// Upper bound on the number of attempts the plan yields.
    #[must_use]
    pub fn total_attempts(&self) -> usize {
        self.sources.len() * self.max_attempts as usize
    }

    /// Abandons the remaining attempts of the current source.
    pub fn skip_source(&mut self) {
        if self.next_attempt > 1 {
            self.source_index += 1;
            self.next_attempt = 1;
        }
    }
}

impl<'a> Iterator for AttemptPlan<'a> {
    type Item = Attempt<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_attempt > self.max_attempts {
            self.source_index += 1;
            self.next_attempt = 1;
        }
        let source = self.sources.get(self.source_index)?;
        let attempt = Attempt {
            source,
            source_index: self.source_index,
            attempt: self.next_attempt,
        };
        self.next_attempt += 1;
        Some(attempt)
    }
}
