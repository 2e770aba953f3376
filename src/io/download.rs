//! Cache-keyed asset downloads.
//!
//! Every fetch streams to `downloads/<provider>/<owner>/<repo>/<version>/`
//! while hashing, then writes a `.sha256` sidecar; the sidecar's existence
//! is the completed-download marker, so re-installs and concurrent
//! invocations reuse finished files without locking.

use std::fs;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::core::asset::Asset;
use crate::USER_AGENT;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("download cancelled")]
    Cancelled,

    #[error("asset {0} has no download location")]
    NoLocation(String),
}

/// Streams assets into the shared download cache.
pub struct Downloader {
    client: reqwest::Client,
    downloads_dir: PathBuf,
    cancel: CancellationToken,
    force: bool,
    /// Extra header for authenticated or registry-fronted sources.
    auth: Option<(&'static str, String)>,
}

impl Downloader {
    pub fn new(downloads_dir: PathBuf, cancel: CancellationToken) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            downloads_dir,
            cancel,
            force: false,
            auth: None,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_auth(mut self, auth: Option<(&'static str, String)>) -> Self {
        self.auth = auth;
        self
    }

    /// Fetch one asset into `downloads/<subdir>/`, setting its
    /// `download_path` and `hash`. Finished files are reused unless
    /// `force` is set.
    pub async fn fetch(&self, subdir: &Path, asset: &mut Asset) -> Result<(), DownloadError> {
        if self.cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let url = asset
            .url
            .clone()
            .ok_or_else(|| DownloadError::NoLocation(asset.name.clone()))?;

        let dir = self.downloads_dir.join(subdir);
        fs::create_dir_all(&dir)?;
        let dest = dir.join(&asset.name);
        let marker = marker_path(&dest);

        if !self.force && marker.exists() && dest.exists() {
            let hash = fs::read_to_string(&marker)?.trim().to_string();
            debug!(file = %dest.display(), "file already downloaded");
            asset.download_path = Some(dest);
            asset.hash = Some(hash);
            return Ok(());
        }

        info!(asset = %asset.name, "downloading asset");
        trace!(url = %url, "fetching");

        let mut request = self.client.get(&url);
        if let Some((header, value)) = &self.auth {
            request = request.header(*header, value);
        }
        let response = request.send().await?.error_for_status()?;

        let mut file = tokio::fs::File::create(&dest).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }
        file.flush().await?;
        drop(file);

        let hash = hex::encode(hasher.finalize());
        trace!(hash = %hash, "computed content hash");

        write_marker(&marker, &hash)?;

        asset.download_path = Some(dest);
        asset.hash = Some(hash);
        Ok(())
    }
}

fn marker_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Create-then-rename so a half-written marker is never observed.
fn write_marker(marker: &Path, hash: &str) -> std::io::Result<()> {
    let tmp = marker.with_extension("sha256.tmp");
    fs::write(&tmp, hash)?;
    fs::rename(&tmp, marker)
}
