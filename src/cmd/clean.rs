//! Clean command: empty the download and metadata caches.
//!
//! Installed binaries and symlinks are never touched.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::config::Config;

pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;

    let mut removed = 0usize;
    for dir in [config.downloads_dir(), config.metadata_dir()] {
        if !dir.exists() {
            continue;
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            debug!(path = %path.display(), "removing");
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            removed += 1;
        }
    }

    println!("removed {removed} cached entries");
    Ok(())
}
