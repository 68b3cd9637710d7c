//! GitLab release API shapes and their mapping into [`ReleaseRecord`].
//!
//! GitLab lists releases newest first from a single endpoint and publishes
//! assets as links. Links carry no digest, and the size is often missing.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::release::{AssetRecord, ReleaseRecord, safe_asset_name, safe_tag_dir};

/// Self-hosted instance used when a repository line names no host.
pub const DEFAULT_GITLAB_HOST: &str = "git.ryujinx.app";

/// A release object from `/api/v4/projects/{id}/releases`.
#[derive(Debug, Deserialize)]
pub(crate) struct GitLabRelease {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assets: GitLabAssets,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GitLabAssets {
    #[serde(default)]
    pub links: Vec<GitLabLink>,
}

/// An asset link of a GitLab release.
#[derive(Debug, Deserialize)]
pub(crate) struct GitLabLink {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub direct_asset_url: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl GitLabLink {
    /// Preferred download URL, falling back to the plain link URL.
    fn download_location(&self) -> &str {
        [self.download_url.as_deref(), self.direct_asset_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

/// Base URL of a GitLab instance; a host with an explicit scheme is kept as is.
pub(crate) fn instance_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

pub(crate) fn releases_url(host: &str, owner: &str, repo: &str) -> String {
    format!(
        "{}/api/v4/projects/{owner}%2F{repo}/releases",
        instance_base(host)
    )
}

/// Maps one GitLab release, or `None` when its tag is unusable.
pub(crate) fn into_record(release: GitLabRelease) -> Option<ReleaseRecord> {
    let Some(tag) = safe_tag_dir(&release.tag_name) else {
        warn!(tag = %release.tag_name, "skipping release with unusable tag");
        return None;
    };

    let assets = release
        .assets
        .links
        .into_iter()
        .filter_map(|link| {
            let Some(name) = safe_asset_name(&link.name) else {
                warn!(asset = %link.name, "skipping asset with unsafe name");
                return None;
            };
            let source_url = link.download_location().to_string();
            if source_url.is_empty() {
                warn!(asset = %name, "skipping asset without a download URL");
                return None;
            }
            debug!(asset = %name, size = ?link.size, url = %source_url, "mapped GitLab asset");
            Some(AssetRecord {
                name,
                expected_size: link.size.unwrap_or(0),
                source_url,
                expected_hash: None,
            })
        })
        .collect();

    Some(ReleaseRecord {
        tag,
        notes: release.description.unwrap_or_default(),
        assets,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gitlab_release_maps_links() {
        let json = r#"{
            "tag_name": "1.2.3",
            "description": "notes",
            "assets": {"links": [
                {"name": "app.zip", "size": 42, "download_url": "https://git.ryujinx.app/dl/app.zip", "url": "https://git.ryujinx.app/other"},
                {"name": "app.tar.gz", "download_url": "", "url": "https://git.ryujinx.app/fallback.tar.gz"}
            ]}
        }"#;
        let release: GitLabRelease = serde_json::from_str(json).unwrap();
        let record = into_record(release).unwrap();

        assert_eq!(record.tag, "1.2.3");
        assert_eq!(record.notes, "notes");
        assert_eq!(record.assets[0].source_url, "https://git.ryujinx.app/dl/app.zip");
        assert_eq!(record.assets[0].expected_size, 42);
        assert_eq!(record.assets[1].source_url, "https://git.ryujinx.app/fallback.tar.gz");
        assert_eq!(record.assets[1].expected_size, 0);
        assert!(record.assets.iter().all(|a| a.expected_hash.is_none()));
    }

    #[test]
    fn test_gitlab_direct_asset_url_used_when_download_url_missing() {
        let json = r#"{"tag_name": "v1", "assets": {"links": [
            {"name": "a.bin", "direct_asset_url": "https://gitlab.com/-/a.bin", "url": "https://gitlab.com/x"}
        ]}}"#;
        let record = into_record(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(record.assets[0].source_url, "https://gitlab.com/-/a.bin");
    }

    #[test]
    fn test_gitlab_release_without_assets() {
        let record = into_record(serde_json::from_str(r#"{"tag_name": "v1"}"#).unwrap()).unwrap();
        assert!(record.assets.is_empty());
    }

    #[test]
    fn test_gitlab_releases_url_encodes_project_path() {
        assert_eq!(
            releases_url(DEFAULT_GITLAB_HOST, "ryubing", "ryujinx"),
            "https://git.ryujinx.app/api/v4/projects/ryubing%2Fryujinx/releases"
        );
        assert_eq!(
            releases_url("http://127.0.0.1:8080/", "a", "b"),
            "http://127.0.0.1:8080/api/v4/projects/a%2Fb/releases"
        );
    }
}
