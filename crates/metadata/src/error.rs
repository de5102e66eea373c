
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A filesystem metadata operation failed.
#[derive(Debug, Error)]
#[error("failed to {context} for '{}': {source}", path.display())]
pub struct MetadataError {
    context: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl MetadataError {
    /// Creates an error for `context` (a verb phrase such as "set modification time").
    pub(crate) fn new(context: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    /// What was being attempted.
    #[must_use]
    pub const fn context(&self) -> &'static str {
        self.context
    }

    /// The path the operation targeted.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying I/O error kind.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// Consumes the error, returning the underlying I/O error.
    #[must_use]
    pub fn into_io_error(self) -> io::Error {
        self.source
    }
}
