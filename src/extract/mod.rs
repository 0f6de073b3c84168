//! # Extraction Module
//!
//! This module implements `decompress` and `list_entries`. The archive format
//! is detected from the file's leading bytes, so an archive written on any
//! platform can be expanded on any other.

mod targz;
mod zip;

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::Format;
use crate::common::{copy_chunked, ArchiveEntry, CopyError};
use crate::fsx;
use crate::ArchiveError;

pub use self::targz::TarGzDecoder;
pub use self::zip::ZipDecoder;

/// A decoder for one archive, chosen from the on-disk format.
pub enum ArchiveReader {
    Zip(ZipDecoder),
    TarGz(TarGzDecoder),
}

impl ArchiveReader {
    /// Opens `path`, detecting its format structurally.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        match Format::detect_file(path)? {
            Format::Zip => Ok(ArchiveReader::Zip(ZipDecoder::open(path)?)),
            Format::TarGz => Ok(ArchiveReader::TarGz(TarGzDecoder::open(path)?)),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            ArchiveReader::Zip(_) => Format::Zip,
            ArchiveReader::TarGz(_) => Format::TarGz,
        }
    }

    /// Visits every entry in stored order together with a payload reader.
    /// The archive is consumed; it is read exactly once.
    pub fn for_each_entry<F>(self, visit: F) -> Result<(), ArchiveError>
    where
        F: FnMut(ArchiveEntry, &mut dyn Read) -> Result<(), ArchiveError>,
    {
        match self {
            ArchiveReader::Zip(decoder) => decoder.for_each_entry(visit),
            ArchiveReader::TarGz(decoder) => decoder.for_each_entry(visit),
        }
    }
}

/// Lists the entries of an archive without extracting anything.
///
/// # Arguments
/// * `archive_path` - The archive file to read.
pub fn list_entries(archive_path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let reader = ArchiveReader::open(archive_path)?;
    let mut entries = Vec::new();
    reader.for_each_entry(|entry, _payload| {
        entries.push(entry);
        Ok(())
    })?;
    Ok(entries)
}

/// Expands an archive into `dest_dir`.
///
/// Directory entries are created explicitly; file entries create any missing
/// parents. Permission bits are restored where the platform supports them,
/// with directory modes applied last so read-only directories do not block
/// their own contents.
///
/// A corrupt or truncated archive aborts with [`ArchiveError::Decode`].
/// Entries written before the failure stay on disk.
///
/// # Arguments
/// * `archive_path` - Path to the `.zip` or `.tar.gz` archive.
/// * `dest_dir` - The directory to extract into. Created if missing.
pub fn decompress(archive_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
    let reader = ArchiveReader::open(archive_path)?;
    info!(archive = %archive_path.display(), dest = %dest_dir.display(), format = %reader.format(), "extracting");

    fs::create_dir_all(dest_dir).map_err(|e| ArchiveError::io(dest_dir, e))?;

    let mut dir_modes: Vec<(PathBuf, u32)> = Vec::new();
    let mut count: u64 = 0;

    reader.for_each_entry(|entry, payload| {
        let rel = sanitize_entry_path(&entry.relative_path).ok_or_else(|| {
            ArchiveError::decode(
                archive_path,
                format!("refusing to extract unsafe entry name '{}'", entry.relative_path),
            )
        })?;
        let target = dest_dir.join(rel);

        if entry.is_dir {
            debug!(path = %target.display(), "creating directory");
            fs::create_dir_all(&target).map_err(|e| ArchiveError::io(&target, e))?;
            dir_modes.push((target, entry.mode));
        } else {
            debug!(path = %target.display(), size = entry.size, "extracting file");
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
            }
            let mut out = File::create(&target).map_err(|e| ArchiveError::io(&target, e))?;
            let written = match copy_chunked(payload, &mut out) {
                Ok(n) => n,
                Err(CopyError::Read(e)) => return Err(ArchiveError::decode(archive_path, e)),
                Err(CopyError::Write(e)) => return Err(ArchiveError::io(&target, e)),
            };
            if written != entry.size {
                return Err(ArchiveError::decode(
                    archive_path,
                    format!(
                        "entry '{}' holds {} bytes, header says {}",
                        entry.relative_path, written, entry.size
                    ),
                ));
            }
            drop(out);
            fsx::set_unix_permissions(&target, entry.mode)
                .map_err(|e| ArchiveError::io(&target, e))?;
        }
        count += 1;
        Ok(())
    })?;

    // Deepest directories first.
    for (dir, mode) in dir_modes.iter().rev() {
        fsx::set_unix_permissions(dir, *mode).map_err(|e| ArchiveError::io(dir, e))?;
    }

    info!(entries = count, "extraction complete");
    Ok(())
}

/// Turns an archive entry name into a relative path below the extraction
/// directory. Absolute names, drive prefixes and `..` segments yield `None`.
fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    if name.starts_with('/') || name.starts_with('\\') {
        return None;
    }
    let mut path = PathBuf::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains(':') => return None,
            s => path.push(s),
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_accepts_nested_names() {
        assert_eq!(
            sanitize_entry_path("root/sub2/b.txt"),
            Some(["root", "sub2", "b.txt"].iter().collect::<PathBuf>())
        );
        assert_eq!(sanitize_entry_path("root/sub/"), Some(PathBuf::from("root").join("sub")));
        assert_eq!(sanitize_entry_path("./root"), Some(PathBuf::from("root")));
    }

    #[test]
    fn sanitize_rejects_escaping_names() {
        assert_eq!(sanitize_entry_path("../evil"), None);
        assert_eq!(sanitize_entry_path("root/../../evil"), None);
        assert_eq!(sanitize_entry_path("/etc/passwd"), None);
        assert_eq!(sanitize_entry_path("C:\\Windows"), None);
        assert_eq!(sanitize_entry_path("./"), None);
    }

    #[test]
    fn unknown_format_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"plain text, not an archive").unwrap();
        let err = decompress(&path, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, ArchiveError::Decode { .. }));
        assert!(!dir.path().join("out").exists());
    }
}
