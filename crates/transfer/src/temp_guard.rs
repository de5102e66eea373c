//! Scoped temp files for indirect writes and merge legs.
//!
//! [`open_tmpfile`] creates `.name.XXXXXX` next to the target, or
//! `name.XXXXXX` inside the configured temp directory, always with
//! `create_new`. [`TempFileGuard`] deletes the file when dropped unless
//! [`keep`](TempFileGuard::keep) was called after a successful commit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;
const CREATE_ATTEMPTS: u32 = 64;

/// Bytes of the target's name carried into the temp name.
const MAX_STEM_LEN: usize = 200;

/// The part of `dest`'s file name a temp name starts from: leading dots
/// stripped, capped at [`MAX_STEM_LEN`] bytes on a character boundary.
fn temp_stem(dest: &Path) -> String {
    let name = dest
        .file_name()
        .map_or_else(|| "client".to_owned(), |n| n.to_string_lossy().into_owned());
    let name = name.trim_start_matches('.');
    let mut end = name.len().min(MAX_STEM_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_owned()
}

/// Where the temp file for `dest` with `suffix` lives.
fn temp_path(dest: &Path, temp_dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = temp_stem(dest);
    match temp_dir {
        Some(dir) => dir.join(format!("{stem}.{suffix}")),
        None => dest
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!(".{stem}.{suffix}")),
    }
}

fn random_suffix() -> io::Result<String> {
    let mut bytes = [0u8; SUFFIX_LEN];
    getrandom::fill(&mut bytes)
        .map_err(|err| io::Error::other(format!("no entropy for temp file name: {err}")))?;
    Ok(bytes
        .iter()
        .map(|&b| char::from(SUFFIX_ALPHABET[usize::from(b) % SUFFIX_ALPHABET.len()]))
        .collect())
}

/// Creates a uniquely named temp file for `dest`.
///
/// Returns the open handle and a guard that removes the file on drop.
///
/// # Errors
///
/// Fails if the directory is not writable, the system has no entropy
/// source, or every attempted name already exists.
pub fn open_tmpfile(dest: &Path, temp_dir: Option<&Path>) -> io::Result<(fs::File, TempFileGuard)> {
    for _ in 0..CREATE_ATTEMPTS {
        let path = temp_path(dest, temp_dir, &random_suffix()?);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, TempFileGuard::new(path))),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free temp file name for {}", dest.display()),
    ))
}

/// Deletes a file on drop unless told to keep it.
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
    keep_on_drop: bool,
}

impl TempFileGuard {
    /// Guards `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path, keep_on_drop: false }
    }

    /// Marks the file as committed; it survives the guard.
    pub fn keep(&mut self) {
        self.keep_on_drop = true;
    }

    /// The guarded path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.keep_on_drop {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => logging::trace_transfer!("removed temp file {}", self.path.display()),
            // Renamed away or never written.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => logging::warn_cleanup!(
                "client::transfer",
                "could not remove temp file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
