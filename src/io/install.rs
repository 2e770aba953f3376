//! Installation of extracted executables.
//!
//! Each extracted file is content-sniffed; real executables are copied
//! into the versioned opt directory and, when the asset targets the
//! running machine, exposed through `name` and `name@version` symlinks
//! in the bin directory.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::core::asset::Asset;
use crate::core::platform::{Platform, OS_WINDOWS};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("the requested binary was not found in the release")]
    NoBinaryInRelease,

    #[error("asset {0} has not been extracted")]
    NotExtracted(String),
}

/// Plain-data files skipped without content sniffing.
const IGNORE_FILE_EXTENSIONS: &[&str] = &["txt", "sbom", "json"];

const EXECUTABLE_MIMETYPES: &[&str] = &[
    "application/x-mach-binary",
    "application/x-executable",
    "application/x-elf",
    "application/vnd.microsoft.portable-executable",
];

/// Install the asset's installable files. Returns the opt-dir paths of the
/// installed executables.
pub fn install(
    asset: &mut Asset,
    bin_dir: &Path,
    opt_dir: &Path,
) -> Result<Vec<PathBuf>, InstallError> {
    let temp_dir = asset
        .temp_dir
        .clone()
        .ok_or_else(|| InstallError::NotExtracted(asset.name.clone()))?;

    fs::create_dir_all(opt_dir)?;
    fs::create_dir_all(bin_dir)?;

    determine_installable(asset, &temp_dir)?;

    let platform = Platform::new(&asset.os, &asset.arch);
    let mut installed = Vec::new();

    for file in &asset.files {
        if !file.installable {
            trace!(file = %file.name, "skipping file");
            continue;
        }

        let full_path = temp_dir.join(&file.name);
        let base = match &file.alias {
            Some(alias) => alias.clone(),
            None => full_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.name.clone()),
        };
        let dst_name = destination_name(&base, &asset.os, &asset.arch, &asset.version);

        let dest = opt_dir.join(&dst_name);
        debug!(from = %full_path.display(), to = %dest.display(), "copying executable");
        copy_executable(&full_path, &dest)?;

        // Only link binaries we can actually run here.
        if platform.is_host() {
            let link = bin_dir.join(&dst_name);
            let versioned = bin_dir.join(format!(
                "{dst_name}@{}",
                asset.version.trim_start_matches('v')
            ));
            for l in [&link, &versioned] {
                // remove-then-create; a reader may briefly observe no link
                let _ = fs::remove_file(l);
                debug!(link = %l.display(), target = %dest.display(), "creating symlink");
                symlink(&dest, l)?;
            }
        }

        installed.push(dest);
    }

    if installed.is_empty() {
        return Err(InstallError::NoBinaryInRelease);
    }
    Ok(installed)
}

/// Sniff each extracted file and mark real executables installable.
fn determine_installable(asset: &mut Asset, temp_dir: &Path) -> io::Result<()> {
    trace!(files = asset.files.len(), "files to process");

    for file in &mut asset.files {
        let full_path = temp_dir.join(&file.name);

        if let Some(ext) = Path::new(&file.name).extension().and_then(|e| e.to_str()) {
            if IGNORE_FILE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                trace!(file = %file.name, "ignoring file");
                continue;
            }
        }

        let mut buf = vec![0u8; 8192];
        let n = match File::open(&full_path).and_then(|mut f| f.read(&mut buf)) {
            Ok(n) => n,
            Err(err) => {
                warn!(file = %file.name, %err, "unable to read file for type detection");
                continue;
            }
        };
        buf.truncate(n);

        if let Some(detected) = infer::get(&buf) {
            trace!(file = %file.name, mime = detected.mime_type(), "detected mimetype");
            if EXECUTABLE_MIMETYPES.contains(&detected.mime_type()) {
                debug!(file = %file.name, "found installable executable");
                file.installable = true;
            }
        }
    }
    Ok(())
}

/// Compute the installed filename: strip platform and version tokens the
/// publisher embedded, then normalize the `.exe` suffix for windows.
pub fn destination_name(base: &str, os: &str, arch: &str, version: &str) -> String {
    let mut name = base.replace(os, "");
    name = name.replace(arch, "");
    if !version.is_empty() {
        name = name.replace(&format!("v{version}"), "");
        name = name.replace(version, "");
    }

    let windows = os == OS_WINDOWS;
    if windows || name.ends_with(".exe") {
        name = name.trim_end_matches(".exe").to_string();
    }

    name = name.trim().to_string();
    name = name.trim_end_matches('-').to_string();
    name = name.trim_end_matches('_').to_string();

    if windows {
        name.push_str(".exe");
    }
    name
}

fn copy_executable(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = create_executable(dest)?;
    io::copy(&mut reader, &mut writer)?;
    Ok(())
}

#[cfg(unix)]
fn create_executable(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o755)
        .open(path)
}

#[cfg(not(unix))]
fn create_executable(path: &Path) -> io::Result<File> {
    File::create(path)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::FileEntry;
    use crate::core::platform;

    #[test]
    fn destination_name_strips_platform_tokens() {
        assert_eq!(
            destination_name("tool-linux-amd64", "linux", "amd64", "1.2.0"),
            "tool"
        );
        assert_eq!(
            destination_name("tool_darwin_arm64", "darwin", "arm64", "1.2.0"),
            "tool"
        );
        assert_eq!(destination_name("tool", "linux", "amd64", "1.2.0"), "tool");
    }

    #[test]
    fn destination_name_strips_version_tokens() {
        assert_eq!(
            destination_name("tool-v1.2.0-linux-amd64", "linux", "amd64", "1.2.0"),
            "tool"
        );
        assert_eq!(
            destination_name("tool-1.2.0", "linux", "amd64", "1.2.0"),
            "tool"
        );
    }

    #[test]
    fn destination_name_normalizes_windows_exe() {
        assert_eq!(
            destination_name("tool-windows-amd64.exe", "windows", "amd64", "1.2.0"),
            "tool.exe"
        );
        assert_eq!(
            destination_name("tool-windows-amd64", "windows", "amd64", "1.2.0"),
            "tool.exe"
        );
    }

    #[test]
    fn version_replacement_is_literal() {
        // Version `1` also hits the `1` inside `v10`; kept for compatibility.
        assert_eq!(destination_name("tool-v10", "linux", "amd64", "1"), "tool-0");
    }

    /// Minimal ELF header, enough for content sniffing.
    fn elf_bytes() -> Vec<u8> {
        let mut b = vec![0x7f, b'E', b'L', b'F', 2, 1, 1, 0];
        b.resize(64, 0);
        b
    }

    fn extracted_asset(dir: &Path, files: &[(&str, &[u8])]) -> Asset {
        let mut asset = Asset::new(
            "tool-1.2.0.tar.gz",
            "tool-1.2.0.tar.gz",
            platform::host_os(),
            platform::host_arch(),
            "1.2.0",
        );
        asset.temp_dir = Some(dir.to_path_buf());
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
            asset.files.push(FileEntry::new(*name));
        }
        asset
    }

    #[test]
    #[cfg(unix)]
    fn installs_executable_with_symlinks() {
        let temp = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let opt = tempfile::tempdir().unwrap();

        let elf = elf_bytes();
        let mut asset = extracted_asset(temp.path(), &[("tool", &elf), ("README.md", b"doc")]);
        let installed = install(&mut asset, bin.path(), opt.path()).unwrap();

        assert_eq!(installed, vec![opt.path().join("tool")]);
        let link = bin.path().join("tool");
        let versioned = bin.path().join("tool@1.2.0");
        assert_eq!(fs::read_link(&link).unwrap(), opt.path().join("tool"));
        assert_eq!(fs::read_link(&versioned).unwrap(), opt.path().join("tool"));
    }

    #[test]
    #[cfg(unix)]
    fn reinstall_recreates_symlinks() {
        let temp = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let opt = tempfile::tempdir().unwrap();

        let elf = elf_bytes();
        let mut asset = extracted_asset(temp.path(), &[("tool", &elf)]);
        install(&mut asset, bin.path(), opt.path()).unwrap();

        let mut again = extracted_asset(temp.path(), &[("tool", &elf)]);
        install(&mut again, bin.path(), opt.path()).unwrap();

        let link = bin.path().join("tool");
        assert_eq!(fs::read_link(&link).unwrap(), opt.path().join("tool"));
    }

    #[test]
    fn data_only_release_fails() {
        let temp = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let opt = tempfile::tempdir().unwrap();

        let mut asset = extracted_asset(
            temp.path(),
            &[("README.txt", b"doc"), ("meta.json", b"{}")],
        );
        let err = install(&mut asset, bin.path(), opt.path()).unwrap_err();
        assert!(matches!(err, InstallError::NoBinaryInRelease));
    }
}
