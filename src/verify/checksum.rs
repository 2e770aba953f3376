//! Checksum manifest parsing and digest comparison.
//!
//! Manifests are whitespace-separated `<hex-digest> [*]<filename>` rows.
//! Single-column rows carry a digest for the target file itself. A leading
//! `*` on the filename column is the binary-mode marker and is stripped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use digest::Digest;
use tracing::trace;

/// Digest algorithm, inferred from the checksum asset's filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Sha1,
    Md5,
}

impl HashAlgorithm {
    /// SHA-256 unless the manifest name says otherwise.
    pub fn for_manifest_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("sha512") {
            Self::Sha512
        } else if name.contains("sha1") && !name.contains("sha256") {
            Self::Sha1
        } else if name.contains("md5") {
            Self::Md5
        } else {
            Self::Sha256
        }
    }
}

/// Stream a file through the given digest, returning lowercase hex.
pub fn compute_file_hash(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    match algorithm {
        HashAlgorithm::Sha256 => hash_reader(file, sha2::Sha256::new()),
        HashAlgorithm::Sha512 => hash_reader(file, sha2::Sha512::new()),
        HashAlgorithm::Sha1 => hash_reader(file, sha1::Sha1::new()),
        HashAlgorithm::Md5 => hash_reader(file, md5::Md5::new()),
    }
}

fn hash_reader<D: Digest>(mut reader: impl Read, mut hasher: D) -> io::Result<String> {
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether the manifest holds `computed` for `file_name`.
///
/// The filename column must equal the asset name or its basename; rows
/// shorter than one token are skipped.
pub fn manifest_contains(
    file_name: &str,
    computed: &str,
    manifest_path: &Path,
) -> io::Result<bool> {
    let reader = BufReader::new(File::open(manifest_path)?);

    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let Some(digest) = parts.next() else {
            trace!(line = %line, "skipping line");
            continue;
        };

        match parts.next() {
            Some(target) => {
                let target = target.strip_prefix('*').unwrap_or(target);
                let basename = target.rsplit('/').next().unwrap_or(target);
                if (target == file_name || basename == file_name)
                    && digest.eq_ignore_ascii_case(computed)
                {
                    return Ok(true);
                }
            }
            // A bare digest names the target implicitly.
            None => {
                if digest.eq_ignore_ascii_case(computed) {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}
