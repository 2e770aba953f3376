//! Configuration file loading and path resolution.
//!
//! The config file is TOML or YAML, picked by suffix. Everything has a
//! sensible default rooted at `~/.distillery`, so a config file is only
//! needed for aliases or custom paths.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::core::reference::Provider;
use crate::NAME;

/// Shorthand for a source you install often: either `owner/repo@version`
/// or a `{ name, version }` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Alias {
    Short(String),
    Full {
        name: String,
        #[serde(default)]
        version: Option<String>,
    },
}

impl Alias {
    /// Expand to the raw reference string the parser accepts.
    pub fn reference(&self) -> String {
        match self {
            Alias::Short(s) => s.clone(),
            Alias::Full { name, version } => match version {
                Some(v) => format!("{name}@{v}"),
                None => name.clone(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    home_path: Option<PathBuf>,
    bin_path: Option<PathBuf>,
    opt_path: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    default_source: Option<String>,
    aliases: BTreeMap<String, Alias>,
}

/// Resolved configuration with all paths concrete.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root for everything user-visible, typically `~/.distillery`.
    pub home_path: PathBuf,
    /// Symlink directory, on `PATH`.
    pub bin_path: PathBuf,
    /// Real installed files: `opt/<source>/<owner>/<repo>/<version>/`.
    pub opt_path: PathBuf,
    /// Download and metadata caches.
    pub cache_path: PathBuf,
    pub default_provider: Provider,
    pub aliases: BTreeMap<String, Alias>,
}

impl Config {
    /// Load from the given file, or from `~/.distillery.{yaml,toml}` when
    /// present, falling back to pure defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(read_config_file(path)?),
            None => default_config_path()
                .map(|p| read_config_file(&p))
                .transpose()?,
        };
        Self::resolve(file.unwrap_or_default())
    }

    fn resolve(file: FileConfig) -> Result<Self> {
        let home_path = match file.home_path {
            Some(p) => p,
            None => dirs::home_dir()
                .context("could not determine home directory")?
                .join(format!(".{NAME}")),
        };
        let cache_path = match file.cache_path {
            Some(p) => p,
            None => dirs::cache_dir()
                .context("could not determine cache directory")?
                .join(NAME),
        };
        let bin_path = file.bin_path.unwrap_or_else(|| home_path.join("bin"));
        let opt_path = file.opt_path.unwrap_or_else(|| home_path.join("opt"));

        let default_provider = match file.default_source.as_deref() {
            None | Some("github") => Provider::Github,
            Some("gitlab") => Provider::Gitlab,
            Some("homebrew") => Provider::Homebrew,
            Some("hashicorp") => Provider::Hashicorp,
            Some("kubernetes") => Provider::Kubernetes,
            Some(other) => anyhow::bail!("unknown default source: {other}"),
        };

        Ok(Self {
            home_path,
            bin_path,
            opt_path,
            cache_path,
            default_provider,
            aliases: file.aliases,
        })
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_path.join("downloads")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.cache_path.join("metadata")
    }

    /// Create every directory the pipeline writes into.
    pub fn mkdirs(&self) -> io::Result<()> {
        for dir in [
            &self.bin_path,
            &self.opt_path,
            &self.downloads_dir(),
            &self.metadata_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Expand a configured alias, if one matches.
    pub fn resolve_alias(&self, name: &str) -> Option<String> {
        self.aliases.get(name).map(|a| a.reference())
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    for ext in ["yaml", "toml"] {
        let candidate = home.join(format!(".{NAME}.{ext}"));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    debug!(path = %path.display(), "loading config");
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;

    if path.extension().is_some_and(|e| e == "toml") {
        toml::from_str(&data).with_context(|| format!("invalid TOML config: {}", path.display()))
    } else {
        serde_yaml::from_str(&data)
            .with_context(|| format!("invalid YAML config: {}", path.display()))
    }
}
