//! Homebrew formula client.
//!
//! Bottles are named by platform tag (`arm64_sonoma`, `x86_64_linux`), so
//! synthesizing `<formula>-<version>.<tag>.bottle.tar.gz` asset names gives
//! the scorer the OS and arch tokens it needs. Only the current stable
//! version is addressable through the formula API.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{log_release, AssetRef, Release, SourceError};

const API_BASE: &str = "https://formulae.brew.sh/api";

#[derive(Debug, Deserialize)]
struct Formula {
    versions: Versions,
    #[serde(default)]
    bottle: BTreeMap<String, Bottle>,
}

#[derive(Debug, Deserialize)]
struct Versions {
    stable: String,
}

#[derive(Debug, Deserialize)]
struct Bottle {
    files: BTreeMap<String, BottleFile>,
}

#[derive(Debug, Deserialize)]
struct BottleFile {
    url: String,
}

pub async fn find_release(
    client: &reqwest::Client,
    formula: &str,
    version: &str,
) -> Result<Release, SourceError> {
    let url = format!("{API_BASE}/formula/{formula}.json");
    let response = client.get(&url).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::ReleaseNotFound);
    }
    let f: Formula = response.error_for_status()?.json().await?;

    let stable = f.versions.stable.clone();
    if version != crate::VERSION_LATEST && version != stable {
        // The formula API only serves the current bottle set.
        return Err(SourceError::ReleaseNotFound);
    }

    let bottle = f
        .bottle
        .get("stable")
        .ok_or(SourceError::Api("homebrew", "formula has no stable bottle".into()))?;

    let release = Release {
        tag: stable.clone(),
        version: stable.clone(),
        pre_release: false,
        assets: bottle
            .files
            .iter()
            .map(|(tag, file)| AssetRef {
                name: format!("{formula}-{stable}.{tag}.bottle.tar.gz"),
                size: 0,
                url: file.url.clone(),
            })
            .collect(),
    };
    log_release(&release);
    Ok(release)
}
