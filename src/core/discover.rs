//! Asset discovery: selecting the binary, checksum, signature, and key out
//! of a release's asset listing.
//!
//! Four passes, in order. Keys are matched to signatures first, then the
//! binary is chosen by score, then the checksum, then the signature type is
//! fixed and the signature itself chosen. Pass order matters: later passes
//! score against the names selected by earlier ones.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::core::asset::{
    strip_one_extension, Asset, AssetKind, ChecksumType, SignatureType,
};
use crate::core::platform::Platform;
use crate::core::score::{score, ScoreOptions, Scored, SCORE_THRESHOLD};

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("no matching asset found, score too low{}", .closest.as_ref().map(|c| format!(" (closest: {} ({}), threshold: {}) -- override with --no-score-check", c.name, c.value, SCORE_THRESHOLD)).unwrap_or_default())]
    NoMatchingAsset { closest: Option<Scored> },

    #[error("no binary found in release")]
    NoBinaryFound,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// App name and synonyms rewarded during binary selection.
    pub terms: Vec<String>,
    /// Resolved release version, rewarded when present in a filename.
    pub version: String,
    /// Accept the best candidate even when every score is below threshold.
    pub skip_score_check: bool,
}

/// The selected asset indices for one release. Indices refer to the asset
/// table handed to [`discover`]; pairing is kept as indices rather than
/// back-pointers between assets.
#[derive(Debug)]
pub struct Discovery {
    pub binary: usize,
    pub checksum: Option<usize>,
    pub signature: Option<usize>,
    pub key: Option<usize>,
    pub checksum_type: ChecksumType,
    pub signature_type: SignatureType,
}

pub fn discover(
    assets: &mut Vec<Asset>,
    platform: &Platform,
    opts: &DiscoverOptions,
) -> Result<Discovery, DiscoverError> {
    let key_of_sig = match_keys(assets);

    let binary = discover_binary(assets, platform, opts)?;

    let checksum = discover_checksum(assets, platform);

    let checksum_type = checksum
        .map(|i| assets[i].checksum_type())
        .unwrap_or(ChecksumType::None);
    let signature_type = determine_signature_type(assets);
    debug!(?checksum_type, ?signature_type, "determined verification types");

    let signature = discover_signature(
        assets,
        platform,
        opts,
        binary,
        checksum,
        signature_type,
    );
    let key = signature.and_then(|s| key_of_sig.get(&s).copied());

    if let Some(s) = signature {
        debug!(signature = %assets[s].name, key = key.map(|k| assets[k].name.as_str()), "selected signature");
    }

    Ok(Discovery {
        binary,
        checksum,
        signature,
        key,
        checksum_type,
        signature_type,
    })
}

/// Pass 1: pair key assets with signature assets.
///
/// Names matching after one extension strip pair first. Every key still
/// unpaired is then offered to the signatures that remain bare, so a single
/// release-wide key (`release-cosign.pub`) covers all per-binary `.sig`
/// files. Finally an unpaired `.asc` signature synthesizes its `.pub`
/// sibling, the one synthetic asset the pipeline ever creates.
fn match_keys(assets: &mut Vec<Asset>) -> BTreeMap<usize, usize> {
    let mut key_of_sig: BTreeMap<usize, usize> = BTreeMap::new();
    let mut sig_of_key: BTreeMap<usize, usize> = BTreeMap::new();

    let sigs: Vec<usize> = indices_of(assets, AssetKind::Signature);
    let keys: Vec<usize> = indices_of(assets, AssetKind::Key);

    for &s in &sigs {
        let sig_stem = strip_one_extension(&assets[s].name).unwrap_or(&assets[s].name);
        for &k in &keys {
            if sig_of_key.contains_key(&k) {
                continue;
            }
            let key_stem = strip_one_extension(&assets[k].name).unwrap_or(&assets[k].name);
            if key_stem.eq_ignore_ascii_case(sig_stem) {
                trace!(key = %assets[k].name, signature = %assets[s].name, "matched key to signature");
                key_of_sig.insert(s, k);
                sig_of_key.insert(k, s);
                break;
            }
        }
    }

    for &k in &keys {
        if sig_of_key.contains_key(&k) {
            continue;
        }
        trace!(key = %assets[k].name, "unmatched key, offering to remaining signatures");
        for &s in &sigs {
            if key_of_sig.contains_key(&s) {
                continue;
            }
            key_of_sig.insert(s, k);
            trace!(key = %assets[k].name, signature = %assets[s].name, "matched key to signature");
        }
    }

    for &s in &sigs {
        if key_of_sig.contains_key(&s) || !assets[s].name.ends_with(".asc") {
            continue;
        }
        let key_name = assets[s].name.replace(".asc", ".pub");
        let mut key = Asset::new(
            &key_name,
            &key_name,
            &assets[s].os,
            &assets[s].arch,
            &assets[s].version,
        );
        key.url = assets[s].url.as_ref().map(|u| u.replace(".asc", ".pub"));
        assets.push(key);
        let k = assets.len() - 1;
        key_of_sig.insert(s, k);
        sig_of_key.insert(k, s);
        info!("gpg detected will fetch public key");
    }

    key_of_sig
}

/// Pass 2: choose the binary among binaries, archives, and unknowns.
fn discover_binary(
    assets: &[Asset],
    platform: &Platform,
    opts: &DiscoverOptions,
) -> Result<usize, DiscoverError> {
    const CANDIDATE_KINDS: [AssetKind; 3] =
        [AssetKind::Binary, AssetKind::Archive, AssetKind::Unknown];

    let score_opts = ScoreOptions {
        os: platform.os_tokens(),
        arch: platform.arch_tokens(),
        extensions: platform.extensions(),
        terms: opts.terms.clone(),
        versions: if opts.version.is_empty() {
            vec![]
        } else {
            vec![opts.version.clone()]
        },
        invalid_os: platform.invalid_os(),
        invalid_arch: platform.invalid_arch(),
        ..Default::default()
    };

    let mut scored_by_kind: Vec<(AssetKind, Vec<Scored>)> = Vec::new();
    for kind in CANDIDATE_KINDS {
        let names = names_of(assets, kind);
        if names.is_empty() {
            continue;
        }
        let scored = score(&names, &score_opts);
        for s in &scored {
            debug!(kind = %kind, name = %s.name, score = s.value, "scored binary candidate");
        }
        scored_by_kind.push((kind, scored));
    }

    let high_enough = scored_by_kind
        .iter()
        .flat_map(|(_, s)| s)
        .any(|s| s.value >= SCORE_THRESHOLD);

    if !high_enough && !opts.skip_score_check {
        let closest = scored_by_kind
            .iter()
            .flat_map(|(_, s)| s)
            .max_by_key(|s| s.value)
            .cloned();
        return Err(DiscoverError::NoMatchingAsset { closest });
    }

    for kind in CANDIDATE_KINDS {
        let Some(top) = scored_by_kind
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, s)| s.first())
        else {
            continue;
        };
        if top.value < SCORE_THRESHOLD && !opts.skip_score_check {
            trace!(kind = %kind, name = %top.name, score = top.value, "top candidate below threshold");
            continue;
        }
        if let Some(i) = index_by_name(assets, &top.name) {
            debug!(binary = %assets[i].name, score = top.value, "selected binary");
            return Ok(i);
        }
    }

    Err(DiscoverError::NoBinaryFound)
}

/// Pass 3: choose the checksum manifest. Absence is not fatal.
fn discover_checksum(assets: &[Asset], platform: &Platform) -> Option<usize> {
    let names = names_of(assets, AssetKind::Checksum);
    if names.is_empty() {
        return None;
    }

    let score_opts = ScoreOptions {
        extensions: vec![
            "sha256".into(),
            "md5".into(),
            "sha1".into(),
            "txt".into(),
        ],
        weighted_terms: BTreeMap::from([
            ("checksums".to_string(), 80),
            ("sha512".to_string(), 50),
            ("sha256".to_string(), 40),
            ("md5".to_string(), 30),
            ("sha1".to_string(), 20),
            ("sha".to_string(), 15),
            ("sums".to_string(), 10),
        ]),
        invalid_os: platform.invalid_os(),
        invalid_arch: platform.invalid_arch(),
        ..Default::default()
    };

    let scored = score(&names, &score_opts);
    let top = scored.first()?;
    if top.value < SCORE_THRESHOLD {
        trace!(name = %top.name, score = top.value, "checksum candidate below threshold");
        return None;
    }
    let i = index_by_name(assets, &top.name)?;
    debug!(checksum = %assets[i].name, score = top.value, "selected checksum");
    Some(i)
}

/// A signature over the binary preempts one over the checksum manifest.
fn determine_signature_type(assets: &[Asset]) -> SignatureType {
    let mut sig_type = SignatureType::None;
    for asset in assets {
        if asset.kind != AssetKind::Signature {
            continue;
        }
        match asset.parent_kind {
            AssetKind::Binary | AssetKind::Archive | AssetKind::Unknown => {
                return SignatureType::File;
            }
            AssetKind::Checksum => sig_type = SignatureType::Checksum,
            _ => {}
        }
    }
    sig_type
}

/// Pass 4: choose the signature, boosted by the sibling names of whatever
/// it covers. Absence is not fatal.
fn discover_signature(
    assets: &[Asset],
    platform: &Platform,
    opts: &DiscoverOptions,
    binary: usize,
    checksum: Option<usize>,
    signature_type: SignatureType,
) -> Option<usize> {
    let names = names_of(assets, AssetKind::Signature);
    if names.is_empty() {
        return None;
    }

    let covered = match signature_type {
        SignatureType::Checksum => checksum.map(|i| assets[i].name.clone()),
        SignatureType::File => Some(assets[binary].name.clone()),
        SignatureType::None => None,
    };
    let mut name_boosts = Vec::new();
    if let Some(covered) = covered {
        name_boosts.push(covered.clone());
        for ext in ["sig", "asc"] {
            name_boosts.push(format!("{covered}.{ext}"));
        }
    }

    let score_opts = ScoreOptions {
        extensions: vec![
            "sig".into(),
            "asc".into(),
            "sig.asc".into(),
            "gpg".into(),
            "keyless.sig".into(),
        ],
        names: name_boosts,
        versions: if opts.version.is_empty() {
            vec![]
        } else {
            vec![opts.version.clone()]
        },
        invalid_os: platform.invalid_os(),
        invalid_arch: platform.invalid_arch(),
        ..Default::default()
    };

    let scored = score(&names, &score_opts);
    let top = scored.first()?;
    if top.value < SCORE_THRESHOLD {
        trace!(name = %top.name, score = top.value, "signature candidate below threshold");
        return None;
    }
    index_by_name(assets, &top.name)
}

fn indices_of(assets: &[Asset], kind: AssetKind) -> Vec<usize> {
    assets
        .iter()
        .enumerate()
        .filter(|(_, a)| a.kind == kind)
        .map(|(i, _)| i)
        .collect()
}

fn names_of(assets: &[Asset], kind: AssetKind) -> Vec<String> {
    assets
        .iter()
        .filter(|a| a.kind == kind)
        .map(|a| a.name.clone())
        .collect()
}

fn index_by_name(assets: &[Asset], name: &str) -> Option<usize> {
    assets.iter().position(|a| a.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset::new(name, name, "linux", "amd64", "1.2.0")
    }

    fn discover_for(names: &[&str], os: &str, arch: &str, term: &str) -> (Vec<Asset>, Result<Discovery, DiscoverError>) {
        let mut assets: Vec<Asset> = names
            .iter()
            .map(|n| Asset::new(n, n, os, arch, "1.2.0"))
            .collect();
        let platform = Platform::new(os, arch);
        let opts = DiscoverOptions {
            terms: vec![term.to_string()],
            version: "1.2.0".into(),
            skip_score_check: false,
        };
        let result = discover(&mut assets, &platform, &opts);
        (assets, result)
    }

    #[test]
    fn file_signature_preempts_checksum_signature() {
        let assets = vec![
            asset("tool-linux-amd64.tar.gz"),
            asset("tool-linux-amd64.tar.gz.sig"),
            asset("checksums.txt"),
            asset("checksums.txt.sig"),
        ];
        assert_eq!(determine_signature_type(&assets), SignatureType::File);
    }

    #[test]
    fn checksum_signature_when_no_file_signature() {
        let assets = vec![
            asset("tool-linux-amd64.tar.gz"),
            asset("checksums.txt"),
            asset("checksums.txt.sig"),
        ];
        assert_eq!(determine_signature_type(&assets), SignatureType::Checksum);
    }

    #[test]
    fn unmatched_asc_synthesizes_pub_sibling() {
        let (assets, result) = discover_for(
            &[
                "tool-linux-amd64.tar.gz",
                "release.sha256",
                "release.sha256.asc",
            ],
            "linux",
            "amd64",
            "tool",
        );
        let d = result.unwrap();
        assert_eq!(assets.last().unwrap().name, "release.sha256.pub");
        assert_eq!(assets.last().unwrap().kind, AssetKind::Key);
        assert_eq!(d.signature_type, SignatureType::Checksum);
        assert_eq!(assets[d.key.unwrap()].name, "release.sha256.pub");
    }

    #[test]
    fn release_wide_key_covers_unpaired_signatures() {
        let (assets, result) = discover_for(
            &[
                "tool-linux-amd64",
                "tool-linux-amd64.sig",
                "tool-darwin-amd64",
                "tool-darwin-amd64.sig",
                "release.pub",
            ],
            "linux",
            "amd64",
            "tool",
        );
        let d = result.unwrap();
        assert_eq!(assets[d.signature.unwrap()].name, "tool-linux-amd64.sig");
        assert_eq!(assets[d.key.unwrap()].name, "release.pub");
    }

    #[test]
    fn below_threshold_fails_with_closest_hint() {
        let (_, result) = discover_for(
            &["tool-windows-amd64.zip"],
            "linux",
            "amd64",
            "tool",
        );
        match result {
            Err(DiscoverError::NoMatchingAsset { closest: Some(c) }) => {
                assert_eq!(c.name, "tool-windows-amd64.zip");
                assert!(c.value < SCORE_THRESHOLD);
            }
            other => panic!("expected NoMatchingAsset, got {other:?}"),
        }
    }

    #[test]
    fn binary_kind_preferred_over_archive() {
        let (assets, result) = discover_for(
            &["tool-windows-amd64.zip", "tool-windows-amd64.exe"],
            "windows",
            "amd64",
            "tool",
        );
        let d = result.unwrap();
        assert_eq!(assets[d.binary].name, "tool-windows-amd64.exe");
    }
}
