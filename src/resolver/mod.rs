//! Release metadata resolution for GitHub and GitLab repositories.
//!
//! The resolver calls the hosting API once per repository and normalizes the
//! provider-specific JSON into [`ReleaseRecord`]s, newest first.
//!
//! # Architecture
//!
//! - [`ProviderKind`] - which API shape a repository uses, decided once from configuration
//! - [`ReleaseSelection`] - latest release only, or every release
//! - [`ReleaseResolver`] - performs the API call and the per-provider mapping
//! - [`ApiEndpoints`] - API base URLs (overridable for tests)
//!
//! There is no retry at this layer; a failed API call ends processing of that
//! repository only.
//!
//! # Example
//!
//! ```no_run
//! use release_mirror_core::resolver::{ProviderKind, ReleaseResolver, ReleaseSelection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ReleaseResolver::new()?;
//! let releases = resolver
//!     .resolve(&ProviderKind::GitHub, "acme", "widget", ReleaseSelection::Latest)
//!     .await?;
//! println!("latest tag: {}", releases[0].tag);
//! # Ok(())
//! # }
//! ```

mod error;
mod github;
mod gitlab;
mod http_client;

pub use error::ResolveError;
pub use gitlab::DEFAULT_GITLAB_HOST;
pub use http_client::build_resolver_http_client;

use std::fmt;

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::release::ReleaseRecord;

/// Accept header recommended by the GitHub REST API.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Hosting provider of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    /// github.com: dedicated "latest" endpoint plus a "list all" endpoint.
    GitHub,
    /// A GitLab instance: one "list all" endpoint, newest first.
    GitLab {
        /// Instance host, optionally with an explicit scheme.
        host: String,
    },
}

impl ProviderKind {
    /// GitLab on the default self-hosted instance.
    #[must_use]
    pub fn default_gitlab() -> Self {
        Self::GitLab {
            host: DEFAULT_GITLAB_HOST.to_string(),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => f.write_str("github"),
            Self::GitLab { host } => write!(f, "gitlab({host})"),
        }
    }
}

/// Which releases to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseSelection {
    /// Only the newest release.
    #[default]
    Latest,
    /// Every release, newest first.
    All,
}

/// API base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// GitHub REST API base, without trailing slash.
    pub github_api: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            github_api: github::DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Fetches and normalizes release metadata.
#[derive(Debug, Clone)]
pub struct ReleaseResolver {
    client: Client,
    endpoints: ApiEndpoints,
}

impl ReleaseResolver {
    /// Creates a resolver against the public API endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Client`] if HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_endpoints(ApiEndpoints::default())
    }

    /// Creates a resolver with custom API base URLs (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Client`] if HTTP client construction fails.
    pub fn with_endpoints(endpoints: ApiEndpoints) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_resolver_http_client()?,
            endpoints,
        })
    }

    /// Resolves releases of `owner/repo`.
    ///
    /// [`ReleaseSelection::Latest`] yields exactly one record;
    /// [`ReleaseSelection::All`] yields every usable release in provider order.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotFound`] when the repository has no usable releases
    /// - [`ResolveError::ApiStatus`] on a non-success HTTP status
    /// - [`ResolveError::Decode`] when the body is not the expected JSON
    /// - [`ResolveError::Network`] when the request fails
    #[instrument(skip(self, provider), fields(provider = %provider))]
    pub async fn resolve(
        &self,
        provider: &ProviderKind,
        owner: &str,
        repo: &str,
        selection: ReleaseSelection,
    ) -> Result<Vec<ReleaseRecord>, ResolveError> {
        let records = match provider {
            ProviderKind::GitHub => self.resolve_github(owner, repo, selection).await?,
            ProviderKind::GitLab { host } => {
                self.resolve_gitlab(host, owner, repo, selection).await?
            }
        };

        if records.is_empty() {
            return Err(ResolveError::not_found(owner, repo));
        }
        info!(releases = records.len(), "resolved releases");
        Ok(records)
    }

    async fn resolve_github(
        &self,
        owner: &str,
        repo: &str,
        selection: ReleaseSelection,
    ) -> Result<Vec<ReleaseRecord>, ResolveError> {
        let base = &self.endpoints.github_api;
        match selection {
            ReleaseSelection::Latest => {
                let url = github::latest_url(base, owner, repo);
                let release: github::GitHubRelease = self.get_json(&url, Some(GITHUB_ACCEPT)).await?;
                Ok(github::into_record(release).into_iter().collect())
            }
            ReleaseSelection::All => {
                let url = github::all_url(base, owner, repo);
                let releases: Vec<github::GitHubRelease> =
                    self.get_json(&url, Some(GITHUB_ACCEPT)).await?;
                Ok(releases.into_iter().filter_map(github::into_record).collect())
            }
        }
    }

    async fn resolve_gitlab(
        &self,
        host: &str,
        owner: &str,
        repo: &str,
        selection: ReleaseSelection,
    ) -> Result<Vec<ReleaseRecord>, ResolveError> {
        let url = gitlab::releases_url(host, owner, repo);
        let releases: Vec<gitlab::GitLabRelease> = self.get_json(&url, None).await?;
        let records = releases.into_iter().filter_map(gitlab::into_record);
        Ok(match selection {
            ReleaseSelection::Latest => records.take(1).collect(),
            ReleaseSelection::All => records.collect(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        accept: Option<&str>,
    ) -> Result<T, ResolveError> {
        debug!(api_url = %url, "calling release API");

        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "release API error");
            return Err(ResolveError::api_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ResolveError::network(url, e))?;
        serde_json::from_slice(&body).map_err(|e| ResolveError::decode(url, e))
    }
}
