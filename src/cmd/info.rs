//! Info command: resolved configuration and platform.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::Config;
use crate::core::platform::Platform;

pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    let platform = Platform::current();

    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("platform: {}/{}", platform.os, platform.arch);
    println!("home: {}", config.home_path.display());
    println!("bin: {}", config.bin_path.display());
    println!("opt: {}", config.opt_path.display());
    println!("cache: {}", config.cache_path.display());
    println!("default source: {}", config.default_provider);
    if !config.aliases.is_empty() {
        println!("aliases:");
        for (name, alias) in &config.aliases {
            println!("  {name} -> {}", alias.reference());
        }
    }
    Ok(())
}
