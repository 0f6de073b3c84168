//! Cross-platform filesystem helpers.
//!
//! Permission bits are only meaningful on Unix. Elsewhere entries are written
//! with conventional defaults and restoring permissions is a no-op, so call
//! sites stay identical across OSes.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Mode written for directories when the host has no POSIX permissions.
pub const DEFAULT_DIR_MODE: u32 = 0o755;
/// Mode written for files when the host has no POSIX permissions.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

#[cfg(unix)]
/// Permission bits (including setuid/setgid/sticky) of `meta`.
pub fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub fn mode_of(meta: &Metadata) -> u32 {
    if meta.is_dir() {
        DEFAULT_DIR_MODE
    } else if meta.permissions().readonly() {
        0o444
    } else {
        DEFAULT_FILE_MODE
    }
}

#[cfg(unix)]
/// Set POSIX permission bits on Unix.
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
/// No-op on non-Unix hosts: POSIX permission bits are not restored.
pub fn set_unix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
