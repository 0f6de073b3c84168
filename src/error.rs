use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `treearc` crate.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An I/O error occurred while creating, opening, reading or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io { source: io::Error, path: PathBuf },

    /// The directory traversal failed to stat or read an entry.
    #[error("failed to walk '{}': {source}", path.display())]
    Walk { path: PathBuf, source: walkdir::Error },

    /// A walked path could not be expressed relative to the archive base.
    #[error("path '{}' is not representable below '{}'", path.display(), base.display())]
    Path { path: PathBuf, base: PathBuf },

    /// The archive container rejected an entry while writing.
    #[error("failed to encode '{}': {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    /// The archive is malformed, truncated or uses an unsupported structure.
    #[error("failed to decode '{}': {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// No archive format is mapped to the requested target platform.
    #[error("no archive format is defined for target platform '{0}'")]
    UnsupportedPlatform(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ArchiveError::Io { source, path: path.into() }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ArchiveError::Decode { path: path.into(), reason: reason.to_string() }
    }

    pub(crate) fn encode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ArchiveError::Encode { path: path.into(), reason: reason.to_string() }
    }
}

impl From<walkdir::Error> for ArchiveError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        ArchiveError::Walk { path, source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offending_path() {
        let err = ArchiveError::io(
            "/tmp/out.zip",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out.zip"), "{msg}");
        assert!(msg.contains("denied"), "{msg}");
    }

    #[test]
    fn unsupported_platform_names_target() {
        let err = ArchiveError::UnsupportedPlatform("plan9".into());
        assert!(err.to_string().contains("plan9"));
    }
}
