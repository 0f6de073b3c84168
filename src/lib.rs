//! # treearc Core Library
//!
//! This crate archives a directory tree into a single ZIP or gzip-compressed
//! TAR file and expands such archives back into a folder tree.
//!
//! It is used by the `treearc` command-line application, but the two core
//! operations are meant to be called directly by release and setup tooling:
//!
//! - [`compress`]: walk a source directory and write one archive.
//! - [`decompress`]: detect an archive's format and expand it.
//!
//! Entry names are relative to the **parent** of the source directory, so the
//! folder's own name is preserved on extraction.
//!
//! ## Key Modules
//!
//! - [`archive`]: container formats, format selection and the archive writer.
//! - [`compress`]: the tree walker and the compression pipeline.
//! - [`extract`]: format detection, decoders and extraction.
//! - [`common`]: entry metadata and archive-internal naming.
//!
//! ## Examples
//!
//! ```no_run
//! use std::path::Path;
//! use treearc::{compress, decompress, FormatSelector};
//!
//! let format = FormatSelector::for_target("linux")?;
//! let dest = format!("DDP.{}", format.extension());
//! compress(Path::new("DDP"), Path::new(&dest), format)?;
//! decompress(Path::new(&dest), Path::new("unpacked"))?;
//! # Ok::<(), treearc::ArchiveError>(())
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod compress;
pub mod error;
pub mod extract;

// Cross-platform filesystem helpers
pub mod fsx;

pub use archive::{ArchiveWriter, Format, FormatSelector};
pub use common::ArchiveEntry;
pub use compress::{compress, compress_with, CompressOptions};
pub use error::ArchiveError;
pub use extract::{decompress, list_entries};
