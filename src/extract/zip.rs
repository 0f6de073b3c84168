use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::archive::zip::from_zip_time;
use crate::common::ArchiveEntry;
use crate::fsx::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use crate::ArchiveError;

/// Sequential reader over the entries of a ZIP archive.
pub struct ZipDecoder {
    archive: zip::ZipArchive<BufReader<File>>,
    path: PathBuf,
}

impl ZipDecoder {
    /// Opens `path` and parses its central directory. A missing or damaged
    /// central directory (e.g. a truncated file) is a decode error.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        let archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| ArchiveError::decode(path, e))?;
        Ok(Self {
            archive,
            path: path.to_path_buf(),
        })
    }

    /// Calls `visit` for every entry in stored order with a reader over its
    /// decompressed payload. The payload reader verifies the CRC at its end.
    pub fn for_each_entry<F>(mut self, mut visit: F) -> Result<(), ArchiveError>
    where
        F: FnMut(ArchiveEntry, &mut dyn Read) -> Result<(), ArchiveError>,
    {
        for i in 0..self.archive.len() {
            let mut file = self
                .archive
                .by_index(i)
                .map_err(|e| ArchiveError::decode(&self.path, e))?;
            let is_dir = file.is_dir();
            let default_mode = if is_dir { DEFAULT_DIR_MODE } else { DEFAULT_FILE_MODE };
            let entry = ArchiveEntry {
                relative_path: file.name().to_string(),
                is_dir,
                size: if is_dir { 0 } else { file.size() },
                mod_time: from_zip_time(file.last_modified()),
                mode: file.unix_mode().map(|m| m & 0o7777).unwrap_or(default_mode),
            };
            visit(entry, &mut file)?;
        }
        Ok(())
    }
}
