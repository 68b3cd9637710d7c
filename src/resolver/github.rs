//! GitHub release API shapes and their mapping into [`ReleaseRecord`].

use serde::Deserialize;
use tracing::warn;

use crate::release::{AssetRecord, ReleaseRecord, extract_sha256, safe_asset_name, safe_tag_dir};

/// Default GitHub REST API base URL.
pub(crate) const DEFAULT_API_BASE: &str = "https://api.github.com";

/// A release object from `/repos/{owner}/{repo}/releases[/latest]`.
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubRelease {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// An asset entry of a GitHub release.
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubAsset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub browser_download_url: String,
    /// `sha256:<hex>` on newer API responses; absent on older releases.
    #[serde(default)]
    pub digest: Option<String>,
}

pub(crate) fn latest_url(base: &str, owner: &str, repo: &str) -> String {
    format!("{base}/repos/{owner}/{repo}/releases/latest")
}

pub(crate) fn all_url(base: &str, owner: &str, repo: &str) -> String {
    format!("{base}/repos/{owner}/{repo}/releases")
}

/// Maps one GitHub release, or `None` when its tag is unusable.
pub(crate) fn into_record(release: GitHubRelease) -> Option<ReleaseRecord> {
    let Some(tag) = safe_tag_dir(&release.tag_name) else {
        warn!(tag = %release.tag_name, "skipping release with unusable tag");
        return None;
    };

    let assets = release
        .assets
        .into_iter()
        .filter_map(|asset| {
            let Some(name) = safe_asset_name(&asset.name) else {
                warn!(asset = %asset.name, "skipping asset with unsafe name");
                return None;
            };
            Some(AssetRecord {
                name,
                expected_size: asset.size,
                source_url: asset.browser_download_url,
                expected_hash: asset.digest.as_deref().and_then(extract_sha256),
            })
        })
        .collect();

    Some(ReleaseRecord {
        tag,
        notes: release.body.unwrap_or_default(),
        assets,
    })
}
