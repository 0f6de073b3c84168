//! # Compression Pipeline
//!
//! This module implements `compress`: it walks a source directory, names every
//! entry relative to the root's parent and streams each one into a freshly
//! created archive file.
//!
//! ## Behaviour
//! - **Single pass**: the archive is written once, in walk order, and never revisited.
//! - **Streaming**: file payloads are copied in bounded chunks, never buffered whole.
//! - **Fail fast**: the first error aborts. Without [`CompressOptions::atomic`] the
//!   partially written archive is left on disk for the caller to remove.

pub mod walker;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::archive::{ArchiveWriter, Format};
use crate::common::{relative_name, ArchiveEntry};
use crate::ArchiveError;

pub use walker::{TreeWalker, WalkItem};

/// Output buffer in front of the archive file, to cut down on small writes.
const OUTPUT_BUF_SIZE: usize = 1024 * 1024;

/// Holds all configuration options for a compression operation.
#[derive(Debug, Clone, Default)]
pub struct CompressOptions {
    /// Compression level (0-9). `None` uses the format's default level.
    pub level: Option<u32>,
    /// Stamp every entry with this unix time instead of its own mtime, making
    /// archives of an unchanged tree byte-identical.
    pub mtime: Option<u64>,
    /// Write to a temporary file next to the destination and rename it into
    /// place only once the archive is complete.
    pub atomic: bool,
}

/// Archives the directory `root` into `dest` using default options.
pub fn compress(root: &Path, dest: &Path, format: Format) -> Result<(), ArchiveError> {
    compress_with(root, dest, format, &CompressOptions::default())
}

/// Archives the directory `root` into `dest`.
///
/// The root folder's own name becomes the first path segment of every entry.
/// A symlinked root keeps the link's name. `dest` is created or truncated.
pub fn compress_with(
    root: &Path,
    dest: &Path,
    format: Format,
    options: &CompressOptions,
) -> Result<(), ArchiveError> {
    let root = absolute_root(root)?;
    if !root.is_dir() {
        return Err(ArchiveError::io(
            &root,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source is not a directory"),
        ));
    }

    info!(source = %root.display(), dest = %dest.display(), %format, "compressing");

    let count = if options.atomic {
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp = temp_archive_in(dir)?;
        let file = temp
            .as_file()
            .try_clone()
            .map_err(|e| ArchiveError::io(temp.path(), e))?;
        // An archive from an earlier run may already sit at `dest`.
        let skip: Vec<PathBuf> = [temp.path(), dest]
            .iter()
            .filter_map(|p| fs::canonicalize(p).ok())
            .collect();
        let count = write_tree(&root, file, temp.path(), format, options, &skip)?;
        temp.persist(dest)
            .map_err(|e| ArchiveError::io(dest, e.error))?;
        count
    } else {
        let file = File::create(dest).map_err(|e| ArchiveError::io(dest, e))?;
        let skip: Vec<PathBuf> = fs::canonicalize(dest).ok().into_iter().collect();
        write_tree(&root, file, dest, format, options, &skip)?
    };

    info!(entries = count, dest = %dest.display(), "archive written");
    Ok(())
}

/// Makes `root` absolute without resolving symlinks, so the name the caller
/// used stays the first entry segment. A root ending in `..` has no name of
/// its own and is resolved instead.
pub fn absolute_root(root: &Path) -> Result<PathBuf, ArchiveError> {
    let absolute = std::path::absolute(root).map_err(|e| ArchiveError::io(root, e))?;
    match absolute.components().next_back() {
        Some(Component::Normal(_)) => Ok(absolute),
        _ => fs::canonicalize(root).map_err(|e| ArchiveError::io(root, e)),
    }
}

/// Creates the temporary file for an atomic write in `dir`.
///
/// On Unix it gets the same umask-filtered mode `File::create` would give,
/// not tempfile's private 0600.
fn temp_archive_in(dir: &Path) -> Result<NamedTempFile, ArchiveError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".treearc-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir).map_err(|e| ArchiveError::io(dir, e))
}

/// True when `path` is one of the canonical paths in `skip`.
fn is_skipped(path: &Path, skip: &[PathBuf]) -> bool {
    skip.iter().any(|s| {
        s.file_name() == path.file_name()
            && fs::canonicalize(path).map_or(false, |p| p == *s)
    })
}

/// Streams every entry under `root` into `out`, returning the entry count.
///
/// `skip` holds the canonical paths of the archive being written, so a
/// destination inside the source tree never archives itself.
fn write_tree(
    root: &Path,
    out: File,
    dest: &Path,
    format: Format,
    options: &CompressOptions,
    skip: &[PathBuf],
) -> Result<u64, ArchiveError> {
    let out = BufWriter::with_capacity(OUTPUT_BUF_SIZE, out);
    let mut writer = ArchiveWriter::new(out, dest, format, options.level);

    for item in TreeWalker::new(root) {
        let WalkItem { path, metadata } = item?;
        if !metadata.is_dir() && is_skipped(&path, skip) {
            debug!(path = %path.display(), "skipping the archive being written");
            continue;
        }

        let is_dir = metadata.is_dir();
        let name = relative_name(root, &path, is_dir)?;
        let mut entry = ArchiveEntry::from_metadata(name, &metadata);
        if let Some(mtime) = options.mtime {
            entry.mod_time = mtime;
        }

        if is_dir {
            writer.add_directory(&entry)?;
        } else {
            writer.add_file(&entry, &path)?;
        }
    }

    let count = writer.entries_written();
    // The trailer is complete once `finish` returns; flushing the buffer closes out the file.
    writer
        .finish()?
        .into_inner()
        .map_err(|e| ArchiveError::io(dest, e.into_error()))?;
    Ok(count)
}

/// Default archive path for `root`: a sibling named `<root>.<ext>`.
pub fn default_output(root: &Path, format: Format) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    root.with_file_name(format!("{}.{}", name, format.extension()))
}
