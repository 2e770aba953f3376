//! Release assets and filename classification.
//!
//! A release publishes dozens of heterogeneously named files; classification
//! assigns each one a semantic kind from its name alone so that discovery
//! can score binaries, pair signatures with keys, and route verification.

use std::fmt;
use std::path::PathBuf;

const INSTALLER_EXTENSIONS: &[&str] = &["deb", "rpm", "msi", "apk"];
const ARCHIVE_EXTENSIONS: &[&str] = &["tar", "tgz", "zip", "gz", "xz", "bz2", "txz", "tbz2"];
const SIGNATURE_EXTENSIONS: &[&str] = &["sig", "asc"];
const KEY_EXTENSIONS: &[&str] = &["pem", "pub", "cert", "crt"];
const SBOM_EXTENSIONS: &[&str] = &["sbom", "bom"];
const CHECKSUM_SUFFIXES: &[&str] = &[".sha256", ".sha512", ".sha1", ".md5"];

/// Semantic label for a release asset, derived from its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Unknown,
    Archive,
    Binary,
    Installer,
    Checksum,
    Signature,
    Key,
    Sbom,
    Data,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetKind::Unknown => "unknown",
            AssetKind::Archive => "archive",
            AssetKind::Binary => "binary",
            AssetKind::Installer => "installer",
            AssetKind::Checksum => "checksum",
            AssetKind::Signature => "signature",
            AssetKind::Key => "key",
            AssetKind::Sbom => "sbom",
            AssetKind::Data => "data",
        };
        f.write_str(s)
    }
}

/// Shape of a checksum manifest, inferred from its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumType {
    #[default]
    None,
    /// One digest for one known file (`foo.tar.gz.sha256`).
    Single,
    /// `<hex>  <filename>` rows covering the whole release.
    Multi,
}

/// What a signature covers: the binary itself or the checksum manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureType {
    #[default]
    None,
    File,
    Checksum,
}

/// A file produced by extraction, relative to the asset's scratch dir.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub alias: Option<String>,
    pub installable: bool,
}

impl FileEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            installable: false,
        }
    }
}

/// A single downloadable file within a release.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub display_name: String,
    pub kind: AssetKind,
    /// Kind of the name with one extension stripped; `foo.tar.gz.sig` is a
    /// signature whose parent is an archive.
    pub parent_kind: AssetKind,
    pub os: String,
    pub arch: String,
    pub version: String,
    /// Opaque fetch location. Empty for synthesized assets until derived.
    pub url: Option<String>,
    pub size: u64,
    pub download_path: Option<PathBuf>,
    pub hash: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub files: Vec<FileEntry>,
}

impl Asset {
    pub fn new(name: &str, display_name: &str, os: &str, arch: &str, version: &str) -> Self {
        let kind = classify(name);
        let parent_kind = match kind {
            AssetKind::Key | AssetKind::Signature | AssetKind::Checksum => parent_kind(name),
            _ => AssetKind::Unknown,
        };

        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            kind,
            parent_kind,
            os: os.to_string(),
            arch: arch.to_string(),
            version: version.to_string(),
            url: None,
            size: 0,
            download_path: None,
            hash: None,
            temp_dir: None,
            files: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Manifest shape implied by the filename; only meaningful for
    /// checksum-kind assets.
    pub fn checksum_type(&self) -> ChecksumType {
        let name = self.name.to_lowercase();
        if CHECKSUM_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return ChecksumType::Single;
        }
        if name.contains("checksums") || name.contains("sums") {
            return ChecksumType::Multi;
        }
        ChecksumType::None
    }
}

/// Classify a filename into an [`AssetKind`].
///
/// Extension tables first, then checksum name heuristics, then the
/// key-material oddballs hardware vendors ship.
pub fn classify(name: &str) -> AssetKind {
    let lower = name.to_lowercase();

    if let Some(ext) = last_extension(&lower) {
        if INSTALLER_EXTENSIONS.contains(&ext) {
            return AssetKind::Installer;
        }
        if ARCHIVE_EXTENSIONS.contains(&ext) {
            return AssetKind::Archive;
        }
        if ext == "exe" {
            return AssetKind::Binary;
        }
        if SIGNATURE_EXTENSIONS.contains(&ext) {
            return AssetKind::Signature;
        }
        if KEY_EXTENSIONS.contains(&ext) {
            return AssetKind::Key;
        }
        if SBOM_EXTENSIONS.contains(&ext) {
            return AssetKind::Sbom;
        }
        if ext == "json" {
            if lower.contains(".sbom") || lower.contains(".bom") {
                return AssetKind::Sbom;
            }
            return AssetKind::Data;
        }
    }

    if CHECKSUM_SUFFIXES.iter().any(|s| lower.ends_with(s))
        || lower.contains("checksums")
        || (lower.contains("sha") && lower.contains("sums"))
        || lower.contains("sums")
    {
        return AssetKind::Checksum;
    }

    if lower.contains("-pivkey-") || (lower.contains("pkcs") && lower.contains("key")) {
        return AssetKind::Key;
    }

    AssetKind::Unknown
}

/// Classify the name with one extension stripped, trimming a trailing
/// `-keyless` marker first (cosign's keyless artifacts pair `foo-keyless.sig`
/// with the plain `foo`).
pub fn parent_kind(name: &str) -> AssetKind {
    match strip_one_extension(name) {
        Some(parent) => {
            let parent = parent.strip_suffix("-keyless").unwrap_or(parent);
            classify(parent)
        }
        None => AssetKind::Unknown,
    }
}

/// The text after the final dot, if any.
fn last_extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Drop the final `.ext`, returning `None` when there is nothing to strip.
pub fn strip_one_extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(stem),
        _ => None,
    }
}
