//! Verification of downloaded assets: checksum manifest comparison first,
//! then signature verification (OpenPGP armored or ECDSA/cosign).
//!
//! Missing material downgrades to a warning; a present-but-wrong checksum
//! or signature aborts the pipeline.

pub mod checksum;
pub mod cosign;
pub mod pgp;

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::asset::{Asset, SignatureType};
use crate::core::discover::Discovery;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("checksum verification failed")]
    ChecksumMismatch,

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("asset {0} has not been downloaded")]
    NotDownloaded(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    pub no_checksum_verify: bool,
    pub no_signature_verify: bool,
}

/// Verify the discovered binary against its checksum manifest and
/// signature, in that order.
pub fn verify(
    assets: &[Asset],
    discovery: &Discovery,
    opts: &VerifyOptions,
) -> Result<(), VerifyError> {
    verify_checksum(assets, discovery, opts)?;
    verify_signature(assets, discovery, opts)
}

fn verify_checksum(
    assets: &[Asset],
    discovery: &Discovery,
    opts: &VerifyOptions,
) -> Result<(), VerifyError> {
    if opts.no_checksum_verify {
        warn!("skipping checksum verification");
        return Ok(());
    }

    let Some(checksum) = discovery.checksum.map(|i| &assets[i]) else {
        warn!("skipping checksum verification (no checksum)");
        return Ok(());
    };
    let binary = &assets[discovery.binary];

    debug!(binary = %binary.name, manifest = %checksum.name, "verifying checksum");

    let binary_path = downloaded_path(binary)?;
    let manifest_path = downloaded_path(checksum)?;

    let algorithm = checksum::HashAlgorithm::for_manifest_name(&checksum.name);
    let computed = checksum::compute_file_hash(binary_path, algorithm)?;

    if !checksum::manifest_contains(&binary.name, &computed, manifest_path)? {
        return Err(VerifyError::ChecksumMismatch);
    }

    info!("checksum verified");
    Ok(())
}

fn verify_signature(
    assets: &[Asset],
    discovery: &Discovery,
    opts: &VerifyOptions,
) -> Result<(), VerifyError> {
    if opts.no_signature_verify {
        warn!("skipping signature verification");
        return Ok(());
    }

    let Some(signature) = discovery.signature.map(|i| &assets[i]) else {
        warn!("skipping signature verification (no signature)");
        return Ok(());
    };

    // The signature covers either the checksum manifest or the binary.
    let target = match discovery.signature_type {
        SignatureType::Checksum => discovery.checksum.map(|i| &assets[i]),
        _ => Some(&assets[discovery.binary]),
    };
    let Some(target) = target else {
        warn!("skipping signature verification (no signed target)");
        return Ok(());
    };

    let content = fs::read(downloaded_path(target)?)?;
    let signature_path = downloaded_path(signature)?;

    let key = discovery
        .key
        .map(|i| &assets[i])
        .filter(|k| k.download_path.is_some());

    if signature.name.ends_with(".asc") {
        let Some(key) = key else {
            warn!("skipping signature verification (no public key)");
            return Ok(());
        };
        debug!(signature = %signature.name, key = %key.name, "verifying gpg signature");
        pgp::verify_detached(downloaded_path(key)?, signature_path, &content)?;
    } else {
        let signature_data = fs::read(signature_path)?;
        let key_data = match key {
            Some(key) => Some(fs::read(downloaded_path(key)?)?),
            None => None,
        };
        debug!(signature = %signature.name, "verifying cosign signature");
        if !cosign::verify(key_data.as_deref(), &signature_data, &content)? {
            return Ok(());
        }
    }

    info!("signature verified");
    Ok(())
}

fn downloaded_path(asset: &Asset) -> Result<&Path, VerifyError> {
    asset
        .download_path
        .as_deref()
        .ok_or_else(|| VerifyError::NotDownloaded(asset.name.clone()))
}
