//! HashiCorp releases client (releases.hashicorp.com).

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{is_newer, log_release, AssetRef, Release, SourceError};

const RELEASES_BASE: &str = "https://releases.hashicorp.com";

#[derive(Debug, Deserialize)]
struct ProductIndex {
    versions: BTreeMap<String, VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
    #[serde(default)]
    shasums: Option<String>,
    #[serde(default)]
    shasums_signature: Option<String>,
    #[serde(default)]
    builds: Vec<Build>,
}

#[derive(Debug, Deserialize)]
struct Build {
    filename: String,
    url: String,
}

pub async fn find_release(
    client: &reqwest::Client,
    product: &str,
    version: &str,
    include_pre_releases: bool,
) -> Result<Release, SourceError> {
    let url = format!("{RELEASES_BASE}/{product}/index.json");
    let response = client.get(&url).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::ReleaseNotFound);
    }
    let index: ProductIndex = response.error_for_status()?.json().await?;

    let entry = if version == crate::VERSION_LATEST {
        index
            .versions
            .values()
            .filter(|v| include_pre_releases || !v.version.contains('-'))
            .fold(None::<&VersionEntry>, |best, v| match best {
                Some(b) if !is_newer(&b.version, &v.version) => Some(b),
                _ => Some(v),
            })
    } else {
        index.versions.get(version)
    }
    .ok_or(SourceError::ReleaseNotFound)?;

    let mut assets: Vec<AssetRef> = entry
        .builds
        .iter()
        .map(|b| AssetRef {
            name: b.filename.clone(),
            size: 0,
            url: b.url.clone(),
        })
        .collect();

    for extra in [&entry.shasums, &entry.shasums_signature].into_iter().flatten() {
        assets.push(AssetRef {
            name: extra.clone(),
            size: 0,
            url: format!("{RELEASES_BASE}/{product}/{}/{extra}", entry.version),
        });
    }

    let release = Release {
        tag: format!("v{}", entry.version),
        version: entry.version.clone(),
        pre_release: entry.version.contains('-'),
        assets,
    };
    log_release(&release);
    Ok(release)
}
