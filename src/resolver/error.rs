//! Error types for release resolution.
//!
//! Each variant names the repository or API URL involved, and the
//! user-facing ones carry a suggestion line.

use thiserror::Error;

/// Errors that can occur while fetching release metadata.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The repository has no published releases.
    ///
    /// Callers treat this as a clean end of processing for the repository.
    #[error("no releases found for {repository}")]
    NotFound {
        /// `owner/repo`
        repository: String,
    },

    /// The hosting API answered with a non-success status.
    #[error("release API returned HTTP {status} for {url}\n  Suggestion: {suggestion}")]
    ApiStatus {
        /// The API URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// The response body did not match the expected release structure.
    #[error("unexpected release API response from {url}: {source}")]
    Decode {
        /// The API URL.
        url: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The API request failed before a response arrived.
    #[error("network error calling release API {url}: {source}")]
    Network {
        /// The API URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client for API calls could not be built.
    #[error("failed to build release API client: {source}")]
    Client {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ResolveError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(owner: &str, repo: &str) -> Self {
        Self::NotFound {
            repository: format!("{owner}/{repo}"),
        }
    }

    /// Creates an `ApiStatus` error with a suggestion derived from the status.
    #[must_use]
    pub fn api_status(url: impl Into<String>, status: u16) -> Self {
        let suggestion = match status {
            404 => "Check the owner/repository spelling and the provider host",
            403 | 429 => "The API rate limit may be exhausted; wait and run again",
            s if s >= 500 => "The hosting API is unavailable; try again later",
            _ => "Check the repository configuration and try again",
        };
        Self::ApiStatus {
            url: url.into(),
            status,
            suggestion,
        }
    }

    /// Creates a `Decode` error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates a `Network` error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Returns true for the non-fatal "no releases" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
