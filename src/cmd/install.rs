//! Install command: the full pipeline from reference to symlinked binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::asset::Asset;
use crate::core::discover::{discover, DiscoverOptions, Discovery};
use crate::core::platform::Platform;
use crate::core::reference::Reference;
use crate::io::download::{DownloadError, Downloader};
use crate::io::{extract, install};
use crate::source::{
    download_auth, find_release_cached, MetadataCache, Release, SourceOptions,
};
use crate::verify::{self, VerifyOptions};
use crate::USER_AGENT;

#[derive(Debug, Default)]
pub struct InstallArgs {
    pub reference: String,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
    pub include_pre_releases: bool,
    pub no_checksum_verify: bool,
    pub no_signature_verify: bool,
    pub no_score_check: bool,
    pub force: bool,
    pub config: Option<PathBuf>,
}

pub async fn run(args: InstallArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    config.mkdirs().context("failed to create directories")?;

    let raw = config
        .resolve_alias(&args.reference)
        .unwrap_or_else(|| args.reference.clone());
    let mut reference = Reference::parse(&raw, config.default_provider)?;
    if let Some(version) = &args.version {
        reference.version = version.clone();
    }

    let platform = match (&args.os, &args.arch) {
        (None, None) => Platform::current(),
        (os, arch) => {
            let current = Platform::current();
            Platform::new(
                os.as_deref().unwrap_or(&current.os),
                arch.as_deref().unwrap_or(&current.arch),
            )
        }
    };

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build http client")?;

    let source_opts = SourceOptions {
        github_token: args.github_token.clone(),
        gitlab_token: args.gitlab_token.clone(),
        include_pre_releases: args.include_pre_releases,
    };

    let cache = MetadataCache::new(config.metadata_dir());
    let release = find_release_cached(&client, &reference, &platform, &source_opts, &cache)
        .await
        .with_context(|| format!("failed to resolve {}", reference.app()))?;

    info!(
        "installing {}@{} ({}/{})",
        reference.app(),
        release.version,
        platform.os,
        platform.arch
    );

    let mut assets = build_assets(&release, &platform);
    let mut discovery = discover(
        &mut assets,
        &platform,
        &DiscoverOptions {
            terms: vec![reference.repo.clone()],
            version: release.version.clone(),
            skip_score_check: args.no_score_check,
        },
    )?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let downloader = Downloader::new(config.downloads_dir(), cancel)
        .with_force(args.force)
        .with_auth(download_auth(reference.provider, &source_opts));

    let subdir: PathBuf = [
        reference.provider.as_str(),
        reference.owner.as_str(),
        reference.repo.as_str(),
        release.version.as_str(),
    ]
    .iter()
    .collect();

    info!("downloading assets");
    downloader
        .fetch(&subdir, &mut assets[discovery.binary])
        .await?;
    for selected in [discovery.signature, discovery.checksum] {
        if let Some(i) = selected {
            downloader.fetch(&subdir, &mut assets[i]).await?;
        }
    }
    if let Some(i) = discovery.key {
        if let Err(err) = downloader.fetch(&subdir, &mut assets[i]).await {
            if matches!(err, DownloadError::Cancelled) {
                return Err(err.into());
            }
            // A synthesized key may not actually exist in the release.
            warn!(%err, "unable to fetch public key, skipping signature verification");
            discovery.key = None;
            discovery.signature = None;
        }
    }

    verify::verify(
        &assets,
        &discovery,
        &VerifyOptions {
            no_checksum_verify: args.no_checksum_verify,
            no_signature_verify: args.no_signature_verify,
        },
    )?;

    let result = extract_and_install(&config, &reference, &release, &mut assets, &discovery);

    // Scratch space goes away on success and failure alike.
    if let Err(err) = extract::cleanup(&assets[discovery.binary]) {
        warn!(%err, "unable to cleanup");
    }

    let installed = result?;
    for path in &installed {
        info!("installed {}", path.display());
    }
    println!(
        "installed {}@{} -> {}",
        reference.app(),
        release.version,
        config.bin_path.display()
    );
    Ok(())
}

fn build_assets(release: &Release, platform: &Platform) -> Vec<Asset> {
    release
        .assets
        .iter()
        .map(|a| {
            let mut asset = Asset::new(
                &a.name,
                &a.name,
                &platform.os,
                &platform.arch,
                &release.version,
            )
            .with_url(&a.url);
            asset.size = a.size;
            asset
        })
        .collect()
}

fn extract_and_install(
    config: &Config,
    reference: &Reference,
    release: &Release,
    assets: &mut [Asset],
    discovery: &Discovery,
) -> Result<Vec<PathBuf>> {
    let binary = &mut assets[discovery.binary];
    extract::extract(binary)?;

    let opt_dir = config
        .opt_path
        .join(reference.provider.as_str())
        .join(&reference.owner)
        .join(&reference.repo)
        .join(&release.version);

    Ok(install::install(binary, &config.bin_path, &opt_dir)?)
}
