//! Shared CLI runner: sets up logging and dispatches the parsed command to
//! the library operations.

use std::path::Path;

use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{self, Commands};
use crate::compress::{self, CompressOptions};
use crate::extract;

/// Public entry for running the CLI logic.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run()?;
    init_logging(args.verbose);
    debug!("parsed CLI arguments: {:?}", args);

    match args.command {
        Commands::Compress { source, output, format, target, level, mtime, atomic } => {
            let format = cli::resolve_format(format, target)?;
            let output = match output {
                Some(path) => path,
                None => {
                    let root = compress::absolute_root(&source)?;
                    compress::default_output(&root, format)
                }
            };
            let options = CompressOptions { level, mtime, atomic };
            compress::compress_with(&source, &output, format, &options)?;
            println!("{}", output.display());
        }
        Commands::Extract { archive, output } => {
            let dest = match output {
                Some(path) => path,
                None => std::env::current_dir()?,
            };
            extract::decompress(&archive, &dest)?;
        }
        Commands::List { archive } => list(&archive)?,
    }

    Ok(())
}

fn list(archive: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let entries = extract::list_entries(archive)?;
    println!("Archive Index ({} entries):", entries.len());
    for entry in entries {
        if entry.is_dir {
            println!("- {}", entry.relative_path);
        } else {
            println!("- {} ({} bytes)", entry.relative_path, entry.size);
        }
    }
    Ok(())
}

/// Installs the stderr subscriber. `RUST_LOG` wins over the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
