use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::archive::{Format, FormatSelector};
use crate::ArchiveError;

/// Environment variable naming the target platform when `--target` is absent.
pub const TARGET_ENV: &str = "TREEARC_TARGET_OS";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides it.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Archive a directory into a single ZIP or tar.gz file.
    #[command(alias = "c")]
    Compress {
        /// The directory to archive. Its name becomes the top-level folder inside the archive.
        #[arg(required = true)]
        source: PathBuf,

        /// The path for the output archive. Defaults to `<SOURCE>.<ext>` next to the source.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Archive format. Takes precedence over --target.
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Target platform whose format to produce (windows → zip, linux → tar.gz).
        /// Falls back to TREEARC_TARGET_OS, then to the host platform.
        #[arg(long)]
        target: Option<String>,

        /// Compression level (0-9). Defaults to the format's standard level.
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
        level: Option<u32>,

        /// Stamp every entry with this unix time for reproducible archives.
        #[arg(long)]
        mtime: Option<u64>,

        /// Write to a temporary file and move it into place only on success.
        #[arg(long)]
        atomic: bool,
    },

    /// Extract an archive into a directory.
    #[command(alias = "x")]
    Extract {
        /// The archive file to extract.
        #[arg(required = true)]
        archive: PathBuf,

        /// The directory where entries will be extracted. Defaults to the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the contents of an archive without extracting it.
    #[command(alias = "l")]
    List {
        /// The archive file to list contents of.
        #[arg(required = true)]
        archive: PathBuf,
    },
}

/// Gets the target platform from the command-line option or the `TREEARC_TARGET_OS` environment variable.
///
/// Priority:
/// 1. `--target` command-line argument.
/// 2. `TREEARC_TARGET_OS` environment variable.
/// 3. Returns `None` if neither is present, leaving the choice to the caller.
pub fn get_target_from_opt_or_env(target_opt: Option<String>) -> Option<String> {
    if let Some(target) = target_opt {
        return Some(target);
    }
    std::env::var(TARGET_ENV).ok().filter(|t| !t.trim().is_empty())
}

/// Decides the archive format for `compress`: explicit format first, then the
/// target platform, then the host platform.
pub fn resolve_format(format: Option<Format>, target: Option<String>) -> Result<Format, ArchiveError> {
    if let Some(format) = format {
        return Ok(format);
    }
    match get_target_from_opt_or_env(target) {
        Some(os) => FormatSelector::for_target(&os),
        None => FormatSelector::host(),
    }
}

/// Parses command-line arguments using `clap`.
///
/// This is the main entry point for the CLI logic.
/// It handles parsing and returns the parsed `Args`; on invalid input clap prints usage and exits.
pub fn run() -> Result<Args, Box<dyn std::error::Error>> {
    let args = Args::parse();
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_format_wins_over_target() {
        let format = resolve_format(Some(Format::Zip), Some("linux".into())).unwrap();
        assert_eq!(format, Format::Zip);
    }

    #[test]
    fn target_selects_format() {
        assert_eq!(resolve_format(None, Some("windows".into())).unwrap(), Format::Zip);
        assert!(matches!(
            resolve_format(None, Some("freebsd".into())),
            Err(ArchiveError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn parses_compress_arguments() {
        let args = Args::try_parse_from([
            "treearc", "-vv", "c", "DDP", "--format", "tar.gz", "--level", "9", "--atomic",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Commands::Compress { source, format, level, atomic, .. } => {
                assert_eq!(source, PathBuf::from("DDP"));
                assert_eq!(format, Some(Format::TarGz));
                assert_eq!(level, Some(9));
                assert!(atomic);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_level() {
        assert!(Args::try_parse_from(["treearc", "compress", "DDP", "--level", "12"]).is_err());
    }
}
