//! Release sources: the forge clients and their shared release model.
//!
//! Every provider answers the same two questions (which release, which
//! assets) and hands back direct download URLs; a sum type over providers
//! keeps the asset model common rather than forcing a trait per forge.

pub mod github;
pub mod gitlab;
pub mod hashicorp;
pub mod homebrew;
pub mod kubernetes;

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::platform::Platform;
use crate::core::reference::{Provider, Reference};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("release not found")]
    ReleaseNotFound,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unexpected response from {0}: {1}")]
    Api(&'static str, String),
}

/// A tagged version of a project with its downloadable assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    pub version: String,
    pub pre_release: bool,
    pub assets: Vec<AssetRef>,
}

/// One downloadable file in a release: its published name, size when the
/// forge reports one, and a direct fetch URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRef {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
    pub include_pre_releases: bool,
}

/// Find the requested release on the reference's provider.
pub async fn find_release(
    client: &reqwest::Client,
    reference: &Reference,
    platform: &Platform,
    opts: &SourceOptions,
) -> Result<Release, SourceError> {
    match reference.provider {
        Provider::Github => {
            github::find_release(
                client,
                &reference.owner,
                &reference.repo,
                &reference.version,
                opts.github_token.as_deref(),
                opts.include_pre_releases,
            )
            .await
        }
        Provider::Gitlab => {
            gitlab::find_release(
                client,
                &reference.owner,
                &reference.repo,
                &reference.version,
                opts.gitlab_token.as_deref(),
            )
            .await
        }
        Provider::Homebrew => {
            homebrew::find_release(client, &reference.repo, &reference.version).await
        }
        Provider::Hashicorp => {
            hashicorp::find_release(
                client,
                &reference.repo,
                &reference.version,
                opts.include_pre_releases,
            )
            .await
        }
        Provider::Kubernetes => {
            kubernetes::find_release(client, &reference.repo, &reference.version, platform).await
        }
    }
}

/// Header needed to download this provider's assets, if any.
pub fn download_auth(
    provider: Provider,
    opts: &SourceOptions,
) -> Option<(&'static str, String)> {
    match provider {
        Provider::Github => opts
            .github_token
            .as_ref()
            .map(|t| ("authorization", format!("Bearer {t}"))),
        Provider::Gitlab => opts
            .gitlab_token
            .as_ref()
            .map(|t| ("private-token", t.clone())),
        // Homebrew bottles live on ghcr.io behind an anonymous bearer token.
        Provider::Homebrew => Some(("authorization", "Bearer QQ==".to_string())),
        _ => None,
    }
}

/// Release-metadata cache under `cache/metadata/`, keyed by source, app,
/// and platform. Fetch results are written through; a network failure
/// falls back to the last cached listing with a warning.
pub struct MetadataCache {
    dir: PathBuf,
}

impl MetadataCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("cache-{key}.json"))
    }

    pub fn cache_key(reference: &Reference, platform: &Platform) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            reference.provider, reference.owner, reference.repo, platform.os, platform.arch
        )
    }

    pub fn load(&self, key: &str) -> Option<Release> {
        let data = fs::read(self.path(key)).ok()?;
        serde_json::from_slice(&data).ok()
    }

    pub fn store(&self, key: &str, release: &Release) {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(%err, "unable to create metadata cache dir");
            return;
        }
        match serde_json::to_vec(release) {
            Ok(data) => {
                if let Err(err) = fs::write(self.path(key), data) {
                    warn!(%err, "unable to write metadata cache");
                }
            }
            Err(err) => warn!(%err, "unable to serialize release for cache"),
        }
    }
}

/// Fetch the release, preferring the network and falling back to the
/// metadata cache when the forge is unreachable.
pub async fn find_release_cached(
    client: &reqwest::Client,
    reference: &Reference,
    platform: &Platform,
    opts: &SourceOptions,
    cache: &MetadataCache,
) -> Result<Release, SourceError> {
    let key = MetadataCache::cache_key(reference, platform);
    match find_release(client, reference, platform, opts).await {
        Ok(release) => {
            cache.store(&key, &release);
            Ok(release)
        }
        Err(SourceError::Http(err)) => {
            if let Some(release) = cache.load(&key) {
                if release.tag == reference.version
                    || release.version == reference.version
                    || reference.is_latest()
                {
                    warn!(%err, "forge unreachable, using cached release listing");
                    return Ok(release);
                }
            }
            Err(SourceError::Http(err))
        }
        Err(err) => Err(err),
    }
}

/// Normalize a tag like `v1.2.3` to its bare version.
pub fn version_from_tag(tag: &str) -> String {
    tag.trim_start_matches('v').to_string()
}

/// Numeric dotted-version comparison; `true` when `candidate` is newer.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    let parse = |v: &str| -> Vec<u32> {
        v.split(['.', '-'])
            .map_while(|s| s.parse::<u32>().ok())
            .collect()
    };
    let c = parse(current);
    let n = parse(candidate);
    for i in 0..c.len().max(n.len()) {
        let cv = c.get(i).unwrap_or(&0);
        let nv = n.get(i).unwrap_or(&0);
        if nv > cv {
            return true;
        }
        if cv > nv {
            return false;
        }
    }
    false
}

pub(crate) fn log_release(release: &Release) {
    debug!(
        tag = %release.tag,
        assets = release.assets.len(),
        "resolved release"
    );
}
