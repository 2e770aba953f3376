//! GitHub releases client.

use serde::Deserialize;
use tracing::debug;

use super::{log_release, version_from_tag, AssetRef, Release, SourceError};

const API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    #[serde(default)]
    size: u64,
    browser_download_url: String,
}

pub async fn find_release(
    client: &reqwest::Client,
    owner: &str,
    repo: &str,
    version: &str,
    token: Option<&str>,
    include_pre_releases: bool,
) -> Result<Release, SourceError> {
    let release = if version == crate::VERSION_LATEST && !include_pre_releases {
        latest_release(client, owner, repo, token).await?
    } else {
        pick_from_listing(client, owner, repo, version, token, include_pre_releases).await?
    };

    let release = to_release(release);
    log_release(&release);
    Ok(release)
}

async fn latest_release(
    client: &reqwest::Client,
    owner: &str,
    repo: &str,
    token: Option<&str>,
) -> Result<GithubRelease, SourceError> {
    let url = format!("{API_BASE}/repos/{owner}/{repo}/releases/latest");
    let response = request(client, &url, token).send().await?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        // Repos without a published "latest" still list releases.
        debug!("no latest release, falling back to release listing");
        return pick_from_listing(client, owner, repo, crate::VERSION_LATEST, token, false).await;
    }

    Ok(response.error_for_status()?.json().await?)
}

async fn pick_from_listing(
    client: &reqwest::Client,
    owner: &str,
    repo: &str,
    version: &str,
    token: Option<&str>,
    include_pre_releases: bool,
) -> Result<GithubRelease, SourceError> {
    let url = format!("{API_BASE}/repos/{owner}/{repo}/releases?per_page=100");
    let releases: Vec<GithubRelease> = request(client, &url, token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let wanted = |r: &GithubRelease| {
        if version == crate::VERSION_LATEST {
            include_pre_releases || !r.prerelease
        } else {
            r.tag_name == version
                || r.tag_name == format!("v{version}")
                || r.name.as_deref() == Some(&format!("v{version}"))
        }
    };

    releases
        .into_iter()
        .find(wanted)
        .ok_or(SourceError::ReleaseNotFound)
}

fn request(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
) -> reqwest::RequestBuilder {
    let mut builder = client
        .get(url)
        .header("accept", "application/vnd.github+json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
}

fn to_release(release: GithubRelease) -> Release {
    Release {
        version: version_from_tag(&release.tag_name),
        tag: release.tag_name,
        pre_release: release.prerelease,
        assets: release
            .assets
            .into_iter()
            .map(|a| AssetRef {
                name: a.name,
                size: a.size,
                url: a.browser_download_url,
            })
            .collect(),
    }
}
