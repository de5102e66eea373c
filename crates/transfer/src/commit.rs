//! Moving finished content onto working files.

use std::fs;
use std::io;
use std::path::Path;

/// Renames `from` onto `to`, falling back to copy-then-delete.
///
/// The fallback covers cross-device renames and platforms that refuse to
/// rename over an existing file. The source is left in place if the copy
/// fails.
pub fn rename_or_copy(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => logging::trace_transfer!(
            "rename {} -> {} failed ({}), copying",
            from.display(),
            to.display(),
            e
        ),
    }

    fs::copy(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        logging::warn_cleanup!(
            "client::transfer",
            "copied {} but could not remove it: {}",
            from.display(),
            e
        );
    }
    Ok(())
}

/// Creates the parent directories of `path`.
pub fn create_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Whether `path` names a symbolic link (dangling or not).
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Creates a symbolic link at `link` pointing to `target`.
pub fn create_symlink(target: &str, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, link);
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rename_replaces_existing_target() {
        let dir = tempdir().expect("tempdir");
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        fs::write(&from, b"new").expect("write");
        fs::write(&to, b"old").expect("write");

        rename_or_copy(&from, &to).expect("rename");
        assert_eq!(fs::read(&to).expect("read"), b"new");
        assert!(!from.exists());
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempdir().expect("tempdir");
        let err = rename_or_copy(&dir.path().join("absent"), &dir.path().join("to"))
            .expect_err("nothing to move");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn parents_are_created() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("a/b/c/file");
        create_parent_dirs(&nested).expect("mkdir");
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_detected() {
        let dir = tempdir().expect("tempdir");
        let link = dir.path().join("link");
        create_symlink("nowhere", &link).expect("symlink");
        assert!(is_symlink(&link));
        assert!(!link.exists());
    }
}
