//! TAR+GZIP encoding: ustar headers streamed through a GZIP compressor.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{EntryType, Header};

use super::EntryEncoder;
use crate::common::ArchiveEntry;
use crate::ArchiveError;

pub struct TarGzEncoder<W: Write> {
    builder: tar::Builder<GzEncoder<W>>,
    dest: PathBuf,
}

impl<W: Write> TarGzEncoder<W> {
    pub fn new(out: W, dest: PathBuf, level: Option<u32>) -> Self {
        let compression = level.map(|l| Compression::new(l.min(9))).unwrap_or_default();
        Self {
            builder: tar::Builder::new(GzEncoder::new(out, compression)),
            dest,
        }
    }

    fn header_for(entry: &ArchiveEntry) -> Header {
        let mut header = Header::new_ustar();
        header.set_mode(entry.mode);
        header.set_mtime(entry.mod_time);
        if entry.is_dir {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
        } else {
            header.set_entry_type(EntryType::Regular);
            header.set_size(entry.size);
        }
        header
    }
}

impl<W: Write> EntryEncoder<W> for TarGzEncoder<W> {
    fn add_directory(&mut self, entry: &ArchiveEntry) -> Result<(), ArchiveError> {
        let mut header = Self::header_for(entry);
        self.builder
            .append_data(&mut header, &entry.relative_path, io::empty())
            .map_err(|e| ArchiveError::io(&self.dest, e))
    }

    fn add_file(&mut self, entry: &ArchiveEntry, data: &mut dyn Read) -> Result<(), ArchiveError> {
        let mut header = Self::header_for(entry);
        // The header already promised `size` bytes; never emit more than that.
        let mut limited = data.take(entry.size);
        self.builder
            .append_data(&mut header, &entry.relative_path, &mut limited)
            .map_err(|e| ArchiveError::io(&self.dest, e))?;
        if limited.limit() != 0 {
            return Err(ArchiveError::io(
                &self.dest,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("'{}' shrank while being archived", entry.relative_path),
                ),
            ));
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<W, ArchiveError> {
        let Self { builder, dest } = *self;
        let gz = builder
            .into_inner()
            .map_err(|e| ArchiveError::io(&dest, e))?;
        gz.finish().map_err(|e| ArchiveError::io(&dest, e))
    }
}
