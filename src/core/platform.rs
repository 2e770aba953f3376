//! Platform profile: OS and architecture token tables used during scoring.
//!
//! Release assets encode their target platform in the filename with little
//! consistency (`darwin` vs `macos` vs `osx`, `amd64` vs `x86_64` vs `x64`),
//! so every OS/arch pair expands into the full set of community synonyms,
//! plus the complementary sets used as negative weights.

pub const OS_WINDOWS: &str = "windows";
pub const OS_LINUX: &str = "linux";
pub const OS_DARWIN: &str = "darwin";
pub const OS_FREEBSD: &str = "freebsd";

pub const ARCH_AMD64: &str = "amd64";
pub const ARCH_ARM64: &str = "arm64";

const KNOWN_OSES: &[&str] = &[OS_WINDOWS, OS_LINUX, OS_DARWIN, OS_FREEBSD];

const AMD64_ALIASES: &[&str] = &["x86_64", "x64", "64bit", "64-bit", "x86-64"];
const ARM64_ALIASES: &[&str] = &["aarch64", "armv8-a", "arm64-bit"];

/// Expanded token tables for a single `(os, arch)` pair.
#[derive(Debug, Clone)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    os_aliases: Vec<String>,
    arch_aliases: Vec<String>,
    extensions: Vec<String>,
}

impl Platform {
    pub fn new(os: &str, arch: &str) -> Self {
        let os = os.to_lowercase();
        let arch = arch.to_lowercase();

        let os_aliases: Vec<String> = match os.as_str() {
            OS_WINDOWS => vec!["win".into()],
            OS_DARWIN => vec!["macos".into(), "osx".into(), "sonoma".into()],
            _ => vec![],
        };

        let mut arch_aliases: Vec<String> = match arch.as_str() {
            ARCH_AMD64 => AMD64_ALIASES.iter().map(|s| s.to_string()).collect(),
            ARCH_ARM64 => ARM64_ALIASES.iter().map(|s| s.to_string()).collect(),
            _ => vec![],
        };
        // Universal binaries satisfy either architecture on darwin.
        if os == OS_DARWIN {
            arch_aliases.push("universal".into());
        }

        let extensions: Vec<String> = match os.as_str() {
            OS_WINDOWS => vec![".exe".into()],
            OS_LINUX => vec![".AppImage".into()],
            _ => vec![],
        };

        Self {
            os,
            arch,
            os_aliases,
            arch_aliases,
            extensions,
        }
    }

    /// Detect the platform of the running process, mapped onto release
    /// naming conventions (`macos` -> `darwin`, `x86_64` -> `amd64`).
    pub fn current() -> Self {
        Self::new(host_os(), host_arch())
    }

    /// Canonical OS name plus all accepted synonyms.
    pub fn os_tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.os.clone()];
        tokens.extend(self.os_aliases.iter().cloned());
        tokens
    }

    /// Canonical arch name plus all accepted synonyms.
    pub fn arch_tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.arch.clone()];
        tokens.extend(self.arch_aliases.iter().cloned());
        tokens
    }

    /// Conventional file extensions for this OS.
    pub fn extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }

    /// Base names of every other known OS; never aliases, since those can
    /// collide as substrings of valid names (`win` inside `darwin`).
    pub fn invalid_os(&self) -> Vec<String> {
        if !KNOWN_OSES.contains(&self.os.as_str()) {
            return vec![];
        }
        KNOWN_OSES
            .iter()
            .filter(|o| **o != self.os)
            .map(|o| o.to_string())
            .collect()
    }

    /// The complementary architecture family, aliases included.
    pub fn invalid_arch(&self) -> Vec<String> {
        let family: &[&str] = match self.arch.as_str() {
            ARCH_AMD64 => &[ARCH_ARM64],
            ARCH_ARM64 => &[ARCH_AMD64],
            _ => return vec![],
        };
        let mut tokens: Vec<String> = family.iter().map(|s| s.to_string()).collect();
        match self.arch.as_str() {
            ARCH_AMD64 => tokens.extend(ARM64_ALIASES.iter().map(|s| s.to_string())),
            ARCH_ARM64 => tokens.extend(AMD64_ALIASES.iter().map(|s| s.to_string())),
            _ => {}
        }
        tokens
    }

    /// Whether this profile describes the machine we are running on, i.e.
    /// whether an installed binary would actually execute here.
    pub fn is_host(&self) -> bool {
        self.os == host_os() && self.arch == host_arch()
    }
}

pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => OS_DARWIN,
        "windows" => OS_WINDOWS,
        "freebsd" => OS_FREEBSD,
        _ => OS_LINUX,
    }
}

pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => ARCH_ARM64,
        _ => ARCH_AMD64,
    }
}
