//! Common utilities and types module.
//! Shared entry metadata, archive-internal naming and the chunked copy helper.

use std::fs::Metadata;
use std::io::{self, Read, Write};
use std::path::{Component, Path};
use std::time::UNIX_EPOCH;

use crate::fsx;
use crate::ArchiveError;

/// Size of the buffer used when streaming payloads in and out of archives.
pub const COPY_BUF_SIZE: usize = 64 * 1024;

/// Metadata for a single file or directory entry within the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Forward-slash separated name, relative to the parent of the source root.
    /// Directory names end with `/`.
    pub relative_path: String,
    pub is_dir: bool,
    /// Payload size in bytes. Always 0 for directories.
    pub size: u64,
    /// Unix timestamp (seconds).
    pub mod_time: u64,
    /// Permission bits.
    pub mode: u32,
}

impl ArchiveEntry {
    /// Builds an entry from filesystem metadata under an already resolved name.
    pub fn from_metadata(relative_path: String, meta: &Metadata) -> Self {
        let is_dir = meta.is_dir();
        let mod_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            relative_path,
            is_dir,
            size: if is_dir { 0 } else { meta.len() },
            mod_time,
            mode: fsx::mode_of(meta),
        }
    }
}

/// Computes the archive-internal name of `path`.
///
/// The name is relative to the parent of `root`, so the root folder's own name
/// becomes the first segment. Separators are always `/` and directories get a
/// trailing `/`.
pub fn relative_name(root: &Path, path: &Path, is_dir: bool) -> Result<String, ArchiveError> {
    let base = root.parent().unwrap_or_else(|| Path::new(""));
    let path_error = || ArchiveError::Path {
        path: path.to_path_buf(),
        base: base.to_path_buf(),
    };

    let rel = path.strip_prefix(base).map_err(|_| path_error())?;

    let mut name = String::new();
    for component in rel.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(path_error)?;
                if !name.is_empty() {
                    name.push('/');
                }
                name.push_str(segment);
            }
            _ => return Err(path_error()),
        }
    }
    if name.is_empty() {
        return Err(path_error());
    }
    if is_dir {
        name.push('/');
    }
    Ok(name)
}

/// Which side of a [`copy_chunked`] call failed.
#[derive(Debug)]
pub enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Streams `reader` into `writer` through a fixed-size buffer, keeping read and
/// write failures apart so callers can attribute them to the right file.
pub fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
) -> Result<u64, CopyError> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut copied: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        writer.write_all(&buf[..n]).map_err(CopyError::Write)?;
        copied += n as u64;
    }
    Ok(copied)
}
