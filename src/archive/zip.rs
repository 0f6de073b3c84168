//! ZIP encoding: DEFLATE for file payloads, STORE for directory markers.

use std::io::{Read, Seek, Write};
use std::path::PathBuf;

use chrono::{DateTime, Datelike, NaiveDate, Timelike};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::CompressionMethod;

use super::EntryEncoder;
use crate::common::{copy_chunked, ArchiveEntry, CopyError};
use crate::ArchiveError;

pub struct ZipEncoder<W: Write + Seek> {
    writer: zip::ZipWriter<W>,
    dest: PathBuf,
    level: Option<i32>,
}

impl<W: Write + Seek> ZipEncoder<W> {
    pub fn new(out: W, dest: PathBuf, level: Option<u32>) -> Self {
        Self {
            writer: zip::ZipWriter::new(out),
            dest,
            level: level.map(|l| l.min(9) as i32),
        }
    }

    fn map_err(&self, err: ZipError) -> ArchiveError {
        match err {
            ZipError::Io(e) => ArchiveError::io(&self.dest, e),
            other => ArchiveError::encode(&self.dest, other),
        }
    }
}

impl<W: Write + Seek> EntryEncoder<W> for ZipEncoder<W> {
    fn add_directory(&mut self, entry: &ArchiveEntry) -> Result<(), ArchiveError> {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(to_zip_time(entry.mod_time))
            .unix_permissions(entry.mode);
        self.writer
            .add_directory(entry.relative_path.as_str(), options)
            .map_err(|e| self.map_err(e))
    }

    fn add_file(&mut self, entry: &ArchiveEntry, data: &mut dyn Read) -> Result<(), ArchiveError> {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.level)
            .last_modified_time(to_zip_time(entry.mod_time))
            .unix_permissions(entry.mode)
            .large_file(entry.size >= u32::MAX as u64);
        self.writer
            .start_file(entry.relative_path.as_str(), options)
            .map_err(|e| self.map_err(e))?;

        match copy_chunked(data, &mut self.writer) {
            Ok(_) => Ok(()),
            // The caller attributes source failures to the source path.
            Err(CopyError::Read(e)) => Err(ArchiveError::io(&self.dest, e)),
            Err(CopyError::Write(e)) => Err(ArchiveError::io(&self.dest, e)),
        }
    }

    fn finish(mut self: Box<Self>) -> Result<W, ArchiveError> {
        self.writer.finish().map_err(|e| self.map_err(e))
    }
}

/// Converts a unix timestamp into a ZIP (MS-DOS) date-time, interpreted as UTC.
///
/// Times outside the representable 1980..=2107 range fall back to the DOS epoch.
pub fn to_zip_time(unix_secs: u64) -> zip::DateTime {
    let Some(dt) = i64::try_from(unix_secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    else {
        return zip::DateTime::default();
    };
    let Ok(year) = u16::try_from(dt.year()) else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(
        year,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
    )
    .unwrap_or_default()
}

/// Converts a ZIP date-time back to unix seconds (UTC). Invalid stamps map to 0.
pub fn from_zip_time(dt: zip::DateTime) -> u64 {
    NaiveDate::from_ymd_opt(dt.year() as i32, dt.month() as u32, dt.day() as u32)
        .and_then(|d| d.and_hms_opt(dt.hour() as u32, dt.minute() as u32, dt.second() as u32))
        .map(|naive| naive.and_utc().timestamp())
        .and_then(|secs| u64::try_from(secs).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::memory_path;
    use std::io::Cursor;

    #[test]
    fn zip_time_keeps_even_seconds() {
        // 2021-06-15 12:34:56 UTC
        let secs = 1_623_760_496;
        assert_eq!(from_zip_time(to_zip_time(secs)), secs);
    }

    #[test]
    fn zip_time_before_dos_epoch_is_clamped() {
        let dt = to_zip_time(0);
        assert_eq!((dt.year(), dt.month(), dt.day()), (1980, 1, 1));
    }

    #[test]
    fn directories_are_stored_and_files_deflated() {
        let mut encoder = ZipEncoder::new(Cursor::new(Vec::new()), memory_path(), None);
        let dir = ArchiveEntry {
            relative_path: "root/".into(),
            is_dir: true,
            size: 0,
            mod_time: 1_623_760_496,
            mode: 0o755,
        };
        let file = ArchiveEntry {
            relative_path: "root/a.txt".into(),
            is_dir: false,
            size: 2,
            mod_time: 1_623_760_496,
            mode: 0o640,
        };
        encoder.add_directory(&dir).unwrap();
        encoder.add_file(&file, &mut &b"hi"[..]).unwrap();
        let bytes = Box::new(encoder).finish().unwrap().into_inner();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        {
            let d = archive.by_index(0).unwrap();
            assert_eq!(d.name(), "root/");
            assert!(d.is_dir());
            assert_eq!(d.compression(), CompressionMethod::Stored);
        }
        let mut f = archive.by_index(1).unwrap();
        assert_eq!(f.name(), "root/a.txt");
        assert_eq!(f.compression(), CompressionMethod::Deflated);
        assert_eq!(f.unix_mode().map(|m| m & 0o7777), Some(0o640));
        let mut content = String::new();
        f.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hi");
    }
}
