//! Applies modification times and owner permission bits to working files.

use std::fs;
use std::path::Path;

use filetime::{FileTime, set_file_mtime};

use crate::error::MetadataError;
use crate::options::MetadataOptions;

/// Applies `options` to the file at `path`.
///
/// Symbolic links are left untouched: their mode is meaningless on most
/// platforms and following them would modify the target.
///
/// # Errors
///
/// Returns [`MetadataError`] if the file cannot be inspected or modified.
///
/// # Examples
///
/// ```no_run
/// use metadata::{MetadataOptions, apply_file_metadata};
///
/// # fn example() -> Result<(), metadata::MetadataError> {
/// let options = MetadataOptions::new()
///     .mod_time(Some(1_700_000_000))
///     .perms(Some("ro"));
/// apply_file_metadata("/ws/readme.txt".as_ref(), &options)?;
/// # Ok(())
/// # }
/// ```
pub fn apply_file_metadata(path: &Path, options: &MetadataOptions) -> Result<(), MetadataError> {
    let metadata = fs::symlink_metadata(path)
        .map_err(|error| MetadataError::new("inspect file", path, error))?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    if let Some(writable) = options.requested_writable() {
        set_writable(path, writable)?;
    }
    if options.requested_executable() {
        set_executable(path)?;
    }
    if let Some(secs) = options.requested_mod_time() {
        set_modification_time(path, secs)?;
    }
    Ok(())
}

/// Sets the modification time to `secs` seconds since the Unix epoch.
pub fn set_modification_time(path: &Path, secs: i64) -> Result<(), MetadataError> {
    set_file_mtime(path, FileTime::from_unix_time(secs, 0))
        .map_err(|error| MetadataError::new("set modification time", path, error))
}

/// Grants or revokes write permission.
///
/// On Unix, granting sets the owner write bit; revoking clears every write bit.
pub fn set_writable(path: &Path, writable: bool) -> Result<(), MetadataError> {
    let mut permissions = fs::metadata(path)
        .map_err(|error| MetadataError::new("inspect permissions", path, error))?
        .permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = permissions.mode();
        let updated = if writable { mode | 0o200 } else { mode & !0o222 };
        if updated == mode {
            return Ok(());
        }
        permissions.set_mode(updated);
    }

    #[cfg(not(unix))]
    {
        if permissions.readonly() != writable {
            return Ok(());
        }
        permissions.set_readonly(!writable);
    }

    fs::set_permissions(path, permissions)
        .map_err(|error| MetadataError::new("set permissions", path, error))
}

/// Adds execute permission for every class that can read the file.
///
/// A no-op where the platform has no execute bit.
pub fn set_executable(path: &Path) -> Result<(), MetadataError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)
            .map_err(|error| MetadataError::new("inspect permissions", path, error))?
            .permissions();
        let mode = permissions.mode();
        let updated = mode | ((mode & 0o444) >> 2);
        if updated != mode {
            permissions.set_mode(updated);
            fs::set_permissions(path, permissions)
                .map_err(|error| MetadataError::new("set executable", path, error))?;
        }
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

/// Whether the owner may write the file. Missing files are not writable.
#[must_use]
pub fn is_user_writable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o200 != 0
    }

    #[cfg(not(unix))]
    {
        !metadata.permissions().readonly()
    }
}

/// Whether the file has any execute bit set.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        false
    }
}
