//! # Archive Formats
//!
//! This module defines the two supported container formats, how a format is
//! chosen for a target platform, and the [`ArchiveWriter`] that appends walked
//! entries to an open archive stream.

pub mod targz;
pub mod zip;

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::Path;
#[cfg(test)]
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::common::ArchiveEntry;
use crate::ArchiveError;

use self::targz::TarGzEncoder;
use self::zip::ZipEncoder;

/// Local file header signature of a ZIP archive.
pub const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";
/// End-of-central-directory signature; an empty ZIP archive starts with it.
pub const ZIP_EMPTY_MAGIC: &[u8; 4] = b"PK\x05\x06";
/// GZIP member header.
pub const GZIP_MAGIC: &[u8; 2] = b"\x1f\x8b";

/// The on-disk container produced by `compress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Format {
    /// ZIP with DEFLATE payloads.
    Zip,
    /// ustar TAR stream wrapped in GZIP.
    #[value(name = "tar.gz", alias = "targz", alias = "tgz")]
    TarGz,
}

impl Format {
    /// File extension (without leading dot) conventionally used for the format.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Zip => "zip",
            Format::TarGz => "tar.gz",
        }
    }

    /// Identifies the container from its leading bytes.
    ///
    /// Returns `Ok(None)` when the bytes match neither format.
    pub fn detect<R: Read>(reader: &mut R) -> io::Result<Option<Format>> {
        let mut magic = [0u8; 4];
        let mut filled = 0;
        while filled < magic.len() {
            match reader.read(&mut magic[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        let magic = &magic[..filled];
        if magic == ZIP_MAGIC || magic == ZIP_EMPTY_MAGIC {
            Ok(Some(Format::Zip))
        } else if magic.starts_with(GZIP_MAGIC) {
            Ok(Some(Format::TarGz))
        } else {
            Ok(None)
        }
    }

    /// Opens `path` and identifies its container.
    pub fn detect_file(path: &Path) -> Result<Format, ArchiveError> {
        let mut file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        match Format::detect(&mut file) {
            Ok(Some(format)) => Ok(format),
            Ok(None) => Err(ArchiveError::decode(path, "not a ZIP or gzip-compressed TAR archive")),
            Err(e) => Err(ArchiveError::io(path, e)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_start_matches('.') {
            "zip" => Ok(Format::Zip),
            "tar.gz" | "targz" | "tgz" => Ok(Format::TarGz),
            other => Err(format!("unknown archive format '{}'", other)),
        }
    }
}

/// Maps a target platform to the archive format shipped for it.
///
/// This is a configuration decision made by the caller; the core never
/// consults the host OS on its own.
pub struct FormatSelector;

impl FormatSelector {
    /// `windows` produces ZIP, `linux` produces TAR+GZIP. Any other target is
    /// rejected rather than guessed.
    pub fn for_target(os: &str) -> Result<Format, ArchiveError> {
        match os.trim().to_ascii_lowercase().as_str() {
            "windows" => Ok(Format::Zip),
            "linux" => Ok(Format::TarGz),
            _ => Err(ArchiveError::UnsupportedPlatform(os.to_string())),
        }
    }

    /// [`FormatSelector::for_target`] applied to the OS this binary was built for.
    pub fn host() -> Result<Format, ArchiveError> {
        Self::for_target(std::env::consts::OS)
    }
}

/// Turns archive entries into bytes appended to an open archive stream.
pub trait EntryEncoder<W> {
    /// Writes a directory-only entry.
    fn add_directory(&mut self, entry: &ArchiveEntry) -> Result<(), ArchiveError>;

    /// Writes the entry header and streams `data` as its payload.
    ///
    /// `data` must yield exactly `entry.size` bytes.
    fn add_file(&mut self, entry: &ArchiveEntry, data: &mut dyn Read) -> Result<(), ArchiveError>;

    /// Writes the format trailer and hands back the underlying stream.
    fn finish(self: Box<Self>) -> Result<W, ArchiveError>;
}

/// Reader wrapper that keeps the first read error of the source file so it
/// can be reported against the source path rather than the archive.
struct SourceReader<R> {
    inner: R,
    error: Option<io::Error>,
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(e) if e.kind() != io::ErrorKind::Interrupted => {
                let kind = e.kind();
                self.error = Some(e);
                Err(io::Error::new(kind, "source read failed"))
            }
            other => other,
        }
    }
}

/// A writer responsible for constructing one archive in a single pass.
///
/// Entries are appended in the order they are added; nothing can be rewritten
/// once added. [`ArchiveWriter::finish`] must be called to produce a valid
/// archive.
pub struct ArchiveWriter<W> {
    encoder: Box<dyn EntryEncoder<W>>,
    format: Format,
    entries_written: u64,
}

impl<W: Write + Seek + 'static> ArchiveWriter<W> {
    /// Creates a new `ArchiveWriter`.
    ///
    /// # Arguments
    /// * `out` - The stream receiving the archive bytes.
    /// * `dest` - Path of the archive, used for error context only.
    /// * `format` - The container to produce.
    /// * `level` - Compression level (0-9); `None` uses the format default.
    pub fn new(out: W, dest: &Path, format: Format, level: Option<u32>) -> Self {
        let dest = dest.to_path_buf();
        let encoder: Box<dyn EntryEncoder<W>> = match format {
            Format::Zip => Box::new(ZipEncoder::new(out, dest, level)),
            Format::TarGz => Box::new(TarGzEncoder::new(out, dest, level)),
        };
        Self {
            encoder,
            format,
            entries_written: 0,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Appends a directory-only entry.
    pub fn add_directory(&mut self, entry: &ArchiveEntry) -> Result<(), ArchiveError> {
        debug!(name = %entry.relative_path, "adding directory");
        self.encoder.add_directory(entry)?;
        self.entries_written += 1;
        Ok(())
    }

    /// Appends a file entry, streaming its payload from `source`.
    pub fn add_file(&mut self, entry: &ArchiveEntry, source: &Path) -> Result<(), ArchiveError> {
        debug!(name = %entry.relative_path, size = entry.size, "adding file");
        let file = File::open(source).map_err(|e| ArchiveError::io(source, e))?;
        self.add_reader(entry, file, source)
    }

    /// Appends a file entry whose payload comes from `reader`.
    ///
    /// Read failures are reported against `source`.
    pub fn add_reader<R: Read>(
        &mut self,
        entry: &ArchiveEntry,
        reader: R,
        source: &Path,
    ) -> Result<(), ArchiveError> {
        let mut reader = SourceReader { inner: reader, error: None };
        let result = self.encoder.add_file(entry, &mut reader);
        if let Some(e) = reader.error.take() {
            return Err(ArchiveError::io(source, e));
        }
        result?;
        self.entries_written += 1;
        Ok(())
    }

    /// Writes the trailer and returns the underlying stream.
    pub fn finish(self) -> Result<W, ArchiveError> {
        debug!(entries = self.entries_written, format = %self.format(), "finishing archive");
        self.encoder.finish()
    }
}

/// Placeholder path used for errors on in-memory archives.
#[cfg(test)]
pub(crate) fn memory_path() -> PathBuf {
    PathBuf::from("<memory>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn target_mapping() {
        assert_eq!(FormatSelector::for_target("windows").unwrap(), Format::Zip);
        assert_eq!(FormatSelector::for_target("Linux").unwrap(), Format::TarGz);
        let err = FormatSelector::for_target("macos").unwrap_err();
        assert!(matches!(err, ArchiveError::UnsupportedPlatform(ref os) if os == "macos"));
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("zip".parse::<Format>().unwrap(), Format::Zip);
        assert_eq!(".tar.gz".parse::<Format>().unwrap(), Format::TarGz);
        assert_eq!("TGZ".parse::<Format>().unwrap(), Format::TarGz);
        assert!("rar".parse::<Format>().is_err());
        assert_eq!(Format::TarGz.to_string(), "tar.gz");
    }

    #[test]
    fn detect_by_magic_bytes() {
        assert_eq!(Format::detect(&mut &b"PK\x03\x04rest"[..]).unwrap(), Some(Format::Zip));
        assert_eq!(Format::detect(&mut &b"PK\x05\x06"[..]).unwrap(), Some(Format::Zip));
        assert_eq!(Format::detect(&mut &b"\x1f\x8b\x08\x00"[..]).unwrap(), Some(Format::TarGz));
        assert_eq!(Format::detect(&mut &b"ustar"[..]).unwrap(), None);
        assert_eq!(Format::detect(&mut &b""[..]).unwrap(), None);
    }

    #[test]
    fn written_archives_are_detected() {
        for format in [Format::Zip, Format::TarGz] {
            let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()), &memory_path(), format, None);
            assert_eq!(writer.format(), format);
            let entry = ArchiveEntry {
                relative_path: "root/".into(),
                is_dir: true,
                size: 0,
                mod_time: 0,
                mode: 0o755,
            };
            writer.add_directory(&entry).unwrap();
            assert_eq!(writer.entries_written(), 1);
            let bytes = writer.finish().unwrap().into_inner();
            assert_eq!(Format::detect(&mut &bytes[..]).unwrap(), Some(format));
        }
    }

    #[test]
    fn source_read_failure_is_reported_against_source() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }

        let mut writer =
            ArchiveWriter::new(Cursor::new(Vec::new()), &memory_path(), Format::TarGz, None);
        let entry = ArchiveEntry {
            relative_path: "root/a.bin".into(),
            is_dir: false,
            size: 4,
            mod_time: 0,
            mode: 0o644,
        };
        let err = writer
            .add_reader(&entry, Failing, Path::new("/src/a.bin"))
            .unwrap_err();
        match err {
            ArchiveError::Io { path, .. } => assert_eq!(path, Path::new("/src/a.bin")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
