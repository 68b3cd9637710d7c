//! Shared HTTP client construction for release API calls.
//!
//! Centralizes timeout and User-Agent defaults so GitHub and GitLab requests
//! stay consistent.

use std::time::Duration;

use reqwest::Client;

use crate::user_agent;

use super::ResolveError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Builds the API client used by [`ReleaseResolver`](super::ReleaseResolver).
///
/// # Errors
///
/// Returns [`ResolveError::Client`] when client construction fails.
pub fn build_resolver_http_client() -> Result<Client, ResolveError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .user_agent(user_agent::default_user_agent())
        .build()
        .map_err(|source| ResolveError::Client { source })
}
