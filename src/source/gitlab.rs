//! GitLab releases client (v4 API).

use serde::Deserialize;

use super::{log_release, version_from_tag, AssetRef, Release, SourceError};

const API_BASE: &str = "https://gitlab.com/api/v4";

#[derive(Debug, Deserialize)]
struct GitlabRelease {
    tag_name: String,
    #[serde(default)]
    upcoming_release: bool,
    #[serde(default)]
    assets: GitlabAssets,
}

#[derive(Debug, Default, Deserialize)]
struct GitlabAssets {
    #[serde(default)]
    links: Vec<GitlabLink>,
}

#[derive(Debug, Deserialize)]
struct GitlabLink {
    name: String,
    #[serde(default)]
    direct_asset_url: Option<String>,
    url: String,
}

pub async fn find_release(
    client: &reqwest::Client,
    owner: &str,
    repo: &str,
    version: &str,
    token: Option<&str>,
) -> Result<Release, SourceError> {
    // Project paths are URL-encoded as a single id.
    let url = format!("{API_BASE}/projects/{owner}%2F{repo}/releases");
    let mut builder = client.get(&url);
    if let Some(token) = token {
        builder = builder.header("private-token", token);
    }

    let releases: Vec<GitlabRelease> = builder.send().await?.error_for_status()?.json().await?;

    let release = releases
        .into_iter()
        .find(|r| {
            if version == crate::VERSION_LATEST {
                !r.upcoming_release
            } else {
                r.tag_name == version || r.tag_name == format!("v{version}")
            }
        })
        .ok_or(SourceError::ReleaseNotFound)?;

    let release = Release {
        version: version_from_tag(&release.tag_name),
        tag: release.tag_name,
        pre_release: release.upcoming_release,
        assets: release
            .assets
            .links
            .into_iter()
            .map(|l| AssetRef {
                name: l.name,
                size: 0,
                url: l.direct_asset_url.unwrap_or(l.url),
            })
            .collect(),
    };
    log_release(&release);
    Ok(release)
}
