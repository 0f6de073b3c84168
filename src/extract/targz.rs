use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;
use tracing::debug;

use crate::common::ArchiveEntry;
use crate::ArchiveError;

/// Sequential reader over the entries of a gzip-compressed TAR archive.
pub struct TarGzDecoder {
    archive: tar::Archive<GzDecoder<BufReader<File>>>,
    path: PathBuf,
}

impl TarGzDecoder {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        Ok(Self {
            archive: tar::Archive::new(GzDecoder::new(BufReader::new(file))),
            path: path.to_path_buf(),
        })
    }

    /// Calls `visit` for every entry in stored order with a reader over its
    /// payload.
    ///
    /// After the TAR end marker the rest of the gzip stream is drained, so a
    /// damaged or missing gzip trailer is reported instead of ignored.
    pub fn for_each_entry<F>(mut self, mut visit: F) -> Result<(), ArchiveError>
    where
        F: FnMut(ArchiveEntry, &mut dyn Read) -> Result<(), ArchiveError>,
    {
        let path = self.path;
        let decode = |e: io::Error| ArchiveError::decode(&path, e);

        for entry in self.archive.entries().map_err(decode)? {
            let mut entry = entry.map_err(decode)?;

            let kind = entry.header().entry_type();
            if kind == EntryType::XGlobalHeader {
                debug!("skipping pax global header");
                continue;
            }
            let name = String::from_utf8(entry.path_bytes().into_owned())
                .map_err(|_| ArchiveError::decode(&path, "entry name is not valid UTF-8"))?;
            if !kind.is_dir() && !kind.is_file() {
                return Err(ArchiveError::decode(
                    &path,
                    format!("unsupported entry type {:?} for '{}'", kind, name),
                ));
            }

            let header = entry.header();
            let archive_entry = ArchiveEntry {
                relative_path: name,
                is_dir: kind.is_dir(),
                size: if kind.is_dir() { 0 } else { entry.size() },
                mod_time: header.mtime().map_err(decode)?,
                mode: header.mode().map_err(decode)? & 0o7777,
            };
            visit(archive_entry, &mut entry)?;
        }

        let mut rest = self.archive.into_inner();
        io::copy(&mut rest, &mut io::sink()).map_err(decode)?;
        Ok(())
    }
}
