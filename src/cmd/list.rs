//! List command: installed binaries and their versions.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::Config;
use crate::inventory;

pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    let bins = inventory::scan(&config.opt_path, &config.bin_path)?;

    if bins.is_empty() {
        println!("no binaries installed");
        return Ok(());
    }

    for bin in bins {
        let versions: Vec<String> = bin
            .versions
            .iter()
            .map(|v| {
                if v.default {
                    format!("{}*", v.version)
                } else {
                    v.version.clone()
                }
            })
            .collect();
        println!("{} ({}) {}", bin.app(), bin.source, versions.join(", "));
    }
    Ok(())
}
