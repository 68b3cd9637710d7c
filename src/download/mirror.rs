//! Mirror list and download source routing.
//!
//! Primary-provider URLs (`https://github.com/...`) are fetched through
//! mirrors that proxy the origin under a path prefix:
//! `https://<mirror>/github.com/<rest>`. Every other URL, self-hosted
//! GitLab instances included, is fetched from its origin only.

use tracing::debug;

use super::constants::{DEFAULT_MIRROR, GITHUB_ORIGIN};

/// Ordered list of mirror hosts.
///
/// An empty configured list falls back to [`DEFAULT_MIRROR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorList {
    hosts: Vec<String>,
}

impl Default for MirrorList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MirrorList {
    /// Builds a mirror list, dropping blank entries.
    #[must_use]
    pub fn new(hosts: Vec<String>) -> Self {
        let mut hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| h.trim().trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if hosts.is_empty() {
            hosts.push(DEFAULT_MIRROR.to_string());
        }
        Self { hosts }
    }

    /// Returns the configured hosts in priority order (never empty).
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Returns the candidates for one repository.
    ///
    /// A non-empty forced mirror replaces the whole list.
    #[must_use]
    pub fn candidates<'a>(&'a self, forced: Option<&'a str>) -> Vec<&'a str> {
        match forced.map(str::trim).filter(|m| !m.is_empty()) {
            Some(mirror) => vec![mirror.trim_end_matches('/')],
            None => self.hosts.iter().map(String::as_str).collect(),
        }
    }
}

/// Returns true for URLs served by the primary provider's origin.
#[must_use]
pub fn is_primary_origin(url: &str) -> bool {
    url.strip_prefix(GITHUB_ORIGIN)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Rewrites a primary-origin URL to go through `mirror`.
///
/// `mirror` is a bare host (`gh-proxy.com`, HTTPS implied) or a base URL
/// with an explicit scheme. Returns `None` for URLs not on the primary origin.
#[must_use]
pub fn rewrite_through_mirror(url: &str, mirror: &str) -> Option<String> {
    if !is_primary_origin(url) {
        return None;
    }
    let rest = url.strip_prefix(GITHUB_ORIGIN)?;
    let canonical_host = GITHUB_ORIGIN.strip_prefix("https://")?;
    let base = if mirror.contains("://") {
        mirror.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", mirror.trim_end_matches('/'))
    };
    Some(format!("{base}/{canonical_host}{rest}"))
}

/// Produces the ordered download sources for one asset.
#[derive(Debug, Clone, Default)]
pub struct MirrorRouter {
    mirrors: MirrorList,
}

impl MirrorRouter {
    /// Creates a router over the global mirror list.
    #[must_use]
    pub fn new(mirrors: MirrorList) -> Self {
        Self { mirrors }
    }

    /// Returns the global mirror list.
    #[must_use]
    pub fn mirrors(&self) -> &MirrorList {
        &self.mirrors
    }

    /// Returns the URLs to try, in order.
    ///
    /// Primary-origin URLs yield one rewritten URL per candidate mirror
    /// (exactly one when `forced` is set). Any other URL yields itself.
    #[must_use]
    pub fn sources(&self, url: &str, forced: Option<&str>) -> Vec<String> {
        if !is_primary_origin(url) {
            debug!(url, "not a mirrored origin; fetching directly");
            return vec![url.to_string()];
        }
        self.mirrors
            .candidates(forced)
            .into_iter()
            .filter_map(|mirror| rewrite_through_mirror(url, mirror))
            .collect()
    }
}
