//! On-disk inventory of installed binaries.
//!
//! The opt tree is `opt/<source>/<owner>/<repo>/<version>/<files>`; the bin
//! directory holds the symlinks. A version is the default when a bin
//! symlink resolves into its directory.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct InstalledVersion {
    pub version: String,
    pub path: PathBuf,
    /// Whether the unversioned symlink points here.
    pub default: bool,
}

#[derive(Debug)]
pub struct InstalledBin {
    pub source: String,
    pub owner: String,
    pub repo: String,
    pub versions: Vec<InstalledVersion>,
}

impl InstalledBin {
    pub fn app(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Walk the opt tree and resolve defaults through the bin symlinks.
pub fn scan(opt_dir: &Path, bin_dir: &Path) -> io::Result<Vec<InstalledBin>> {
    let defaults = symlink_target_dirs(bin_dir)?;
    let mut bins = Vec::new();

    for source in sorted_dirs(opt_dir)? {
        for owner in sorted_dirs(&source.path)? {
            for repo in sorted_dirs(&owner.path)? {
                let mut versions = Vec::new();
                for version in sorted_dirs(&repo.path)? {
                    let default = defaults
                        .iter()
                        .any(|target| target.starts_with(&version.path));
                    versions.push(InstalledVersion {
                        version: version.name,
                        path: version.path,
                        default,
                    });
                }
                if versions.is_empty() {
                    continue;
                }
                bins.push(InstalledBin {
                    source: source.name.clone(),
                    owner: owner.name.clone(),
                    repo: repo.name,
                    versions,
                });
            }
        }
    }

    Ok(bins)
}

struct DirEntryNamed {
    name: String,
    path: PathBuf,
}

fn sorted_dirs(dir: &Path) -> io::Result<Vec<DirEntryNamed>> {
    let mut entries = Vec::new();
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(entries),
        Err(err) => return Err(err),
    };
    for entry in read {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            entries.push(DirEntryNamed {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
            });
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Directories the bin symlinks resolve into.
fn symlink_target_dirs(bin_dir: &Path) -> io::Result<BTreeSet<PathBuf>> {
    let mut targets = BTreeSet::new();
    let read = match fs::read_dir(bin_dir) {
        Ok(read) => read,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(targets),
        Err(err) => return Err(err),
    };
    for entry in read {
        let entry = entry?;
        // Skip the version-qualified aliases; the bare name decides.
        if entry.file_name().to_string_lossy().contains('@') {
            continue;
        }
        if let Ok(target) = fs::read_link(entry.path()) {
            targets.insert(target);
        }
    }
    Ok(targets)
}
