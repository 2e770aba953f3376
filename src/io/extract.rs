//! Streaming, recursive archive extraction.
//!
//! The downloaded file is sniffed by magic bytes through a replayable
//! prefix, then dispatched: tar and zip unpack into the asset's scratch
//! directory, compression wrappers (gzip, bzip2, xz) produce a new reader
//! that re-enters the sniff loop, so `.tar.gz` and `.tar.xz` need no
//! nesting logic of their own. Anything unrecognized is copied through
//! verbatim as a raw binary.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::core::asset::{Asset, FileEntry};
use crate::NAME;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("content filepath is tainted: {0}")]
    PathTraversal(String),

    #[error("no files found in archive")]
    EmptyArchive,

    #[error("file mode out of range: {0}")]
    BadFileMode(i64),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("asset {0} has not been downloaded")]
    NotDownloaded(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Tar,
    Zip,
    Gzip,
    Bzip2,
    Xz,
    Other,
}

fn detect_format(data: &[u8]) -> ArchiveFormat {
    match data {
        [0x50, 0x4B, 0x03, 0x04, ..] => ArchiveFormat::Zip,
        [0x1F, 0x8B, ..] => ArchiveFormat::Gzip,
        [0x42, 0x5A, 0x68, ..] => ArchiveFormat::Bzip2,
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => ArchiveFormat::Xz,
        _ if is_tar_header(data) => ArchiveFormat::Tar,
        _ => ArchiveFormat::Other,
    }
}

fn is_tar_header(data: &[u8]) -> bool {
    data.len() >= 512 && &data[257..262] == b"ustar"
}

/// Extract the asset's downloaded file into a fresh scratch directory,
/// populating `temp_dir` and `files`.
pub fn extract(asset: &mut Asset) -> Result<(), ExtractError> {
    let download_path = asset
        .download_path
        .clone()
        .ok_or_else(|| ExtractError::NotDownloaded(asset.name.clone()))?;

    let temp_dir = tempfile::Builder::new()
        .prefix(NAME)
        .tempdir()?
        .into_path();
    asset.temp_dir = Some(temp_dir.clone());

    debug!(path = %download_path.display(), "opened and extracting file");

    let mut extractor = Extractor {
        temp_dir,
        download_path: download_path.clone(),
        display_name: asset.display_name.clone(),
        files: Vec::new(),
    };
    extractor.run(Box::new(File::open(&download_path)?))?;
    asset.files = extractor.files;
    Ok(())
}

/// Remove the asset's scratch directory. Cached downloads are never touched.
pub fn cleanup(asset: &Asset) -> io::Result<()> {
    if let Some(dir) = &asset.temp_dir {
        trace!(dir = %dir.display(), "cleaning up temp dir");
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

struct Extractor {
    temp_dir: PathBuf,
    download_path: PathBuf,
    display_name: String,
    files: Vec<FileEntry>,
}

impl Extractor {
    fn run(&mut self, reader: Box<dyn Read>) -> Result<(), ExtractError> {
        let mut reader = reader;
        loop {
            let (format, replayed) = sniff(reader)?;
            trace!(?format, "detected stream format");
            match format {
                ArchiveFormat::Tar => return self.process_tar(replayed),
                ArchiveFormat::Zip => return self.process_zip(),
                ArchiveFormat::Gzip => {
                    reader = Box::new(flate2::read::GzDecoder::new(replayed));
                }
                ArchiveFormat::Bzip2 => {
                    reader = Box::new(bzip2::read::BzDecoder::new(replayed));
                }
                ArchiveFormat::Xz => {
                    reader = Box::new(xz2::read::XzDecoder::new(replayed));
                }
                ArchiveFormat::Other => return self.process_direct(replayed),
            }
        }
    }

    /// Copy a non-archive file through verbatim, aliased to the asset's
    /// display name.
    fn process_direct(&mut self, mut reader: Box<dyn Read>) -> Result<(), ExtractError> {
        let name = self
            .download_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display_name.clone());
        let target = self.temp_dir.join(&name);
        let mut out = File::create(&target)?;
        io::copy(&mut reader, &mut out)?;
        trace!(target = %target.display(), "direct > create file");

        self.files.push(FileEntry {
            name,
            alias: Some(self.display_name.clone()),
            installable: false,
        });
        Ok(())
    }

    fn process_tar(&mut self, reader: Box<dyn Read>) -> Result<(), ExtractError> {
        let mut archive = tar::Archive::new(reader);

        for entry in archive.entries()? {
            let mut entry = entry?;
            let name = entry.path()?.to_string_lossy().into_owned();
            let target = self.sanitize(&name)?;

            if entry.header().entry_type().is_dir() {
                if !target.exists() {
                    fs::create_dir_all(&target)?;
                    trace!(target = %target.display(), "tar > create directory");
                }
                continue;
            }
            if !entry.header().entry_type().is_file() {
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }

            let mode = checked_file_mode(i64::from(entry.header().mode()?))?;
            let mut out = create_with_mode(&target, mode)?;
            io::copy(&mut entry, &mut out)?;

            self.files.push(FileEntry::new(name));
            trace!(target = %target.display(), "tar > create file");
        }

        if self.files.is_empty() {
            return Err(ExtractError::EmptyArchive);
        }
        Ok(())
    }

    /// The zip format needs random access, so it is read back from the
    /// downloaded file rather than the stream.
    fn process_zip(&mut self) -> Result<(), ExtractError> {
        let mut archive = zip::ZipArchive::new(File::open(&self.download_path)?)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let target = self.sanitize(&name)?;

            if entry.is_dir() {
                if !target.exists() {
                    fs::create_dir_all(&target)?;
                    trace!(target = %target.display(), "zip > create directory");
                }
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }

            let mode = match entry.unix_mode() {
                Some(mode) => checked_file_mode(i64::from(mode))?,
                None => 0o644,
            };
            let mut out = create_with_mode(&target, mode)?;
            io::copy(&mut entry, &mut out)?;

            self.files.push(FileEntry::new(name));
            trace!(target = %target.display(), "zip > create file");
        }

        if self.files.is_empty() {
            return Err(ExtractError::EmptyArchive);
        }
        Ok(())
    }

    /// Join an archive entry path onto the scratch dir, rejecting anything
    /// that would land outside it.
    fn sanitize(&self, entry_name: &str) -> Result<PathBuf, ExtractError> {
        let entry = Path::new(entry_name);
        let mut cleaned = PathBuf::new();
        for component in entry.components() {
            match component {
                Component::Normal(part) => cleaned.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !cleaned.pop() {
                        return Err(ExtractError::PathTraversal(entry_name.to_string()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ExtractError::PathTraversal(entry_name.to_string()));
                }
            }
        }

        let target = self.temp_dir.join(&cleaned);
        if !target.starts_with(&self.temp_dir) {
            return Err(ExtractError::PathTraversal(entry_name.to_string()));
        }
        Ok(target)
    }
}

/// Read a prefix for magic detection and hand back a reader that replays it.
fn sniff(mut reader: Box<dyn Read>) -> Result<(ArchiveFormat, Box<dyn Read>), ExtractError> {
    let mut prefix = vec![0u8; 8192];
    let mut filled = 0;
    while filled < prefix.len() {
        let n = reader.read(&mut prefix[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    prefix.truncate(filled);

    let format = detect_format(&prefix);
    Ok((format, Box::new(io::Cursor::new(prefix).chain(reader))))
}

/// Archive headers can report modes wider than a mode can be; reject
/// anything outside `[0, 2^32)`.
fn checked_file_mode(value: i64) -> Result<u32, ExtractError> {
    u32::try_from(value).map_err(|_| ExtractError::BadFileMode(value))
}

#[cfg(unix)]
fn create_with_mode(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn create_with_mode(path: &Path, _mode: u32) -> io::Result<File> {
    File::create(path)
}
