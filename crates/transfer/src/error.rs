//! Engine error taxonomy.
//!
//! Errors split into two categories:
//!
//! - **Fatal**: the exchange itself is broken (unknown handle, malformed
//!   argument, transport failure). Returned to the caller as `Err`.
//! - **Recoverable**: one file failed. The session converts these into an
//!   error message, marks the handle errored and declines; later calls for
//!   the handle become no-ops.

use std::io;
use std::path::{Path, PathBuf};

use protocol::{ProtocolError, TransportError};
use thiserror::Error;

/// Failure of one engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A writable file would have been overwritten under `noclobber`.
    #[error("can't clobber writable file {}", path.display())]
    ClobberRefused {
        /// The protected file.
        path: PathBuf,
    },

    /// Parent directories of a target could not be created.
    #[error("can't create directory for {}: {source}", path.display())]
    DirectoryCreate {
        /// The target whose parents were being created.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Opening, writing, flushing or transcoding a file failed.
    #[error("write failed for {}: {source}", path.display())]
    FileWrite {
        /// The file being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A rename and its copy fallback both failed.
    #[error("can't move {} to {}: {source}", from.display(), to.display())]
    FileMove {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Received content does not hash to the digest the server declared.
    #[error("{} corrupted during transfer: got {actual}, expected {expected}", path.display())]
    DigestMismatch {
        /// The file that failed verification.
        path: PathBuf,
        /// Digest declared by the server.
        expected: String,
        /// Digest of the received content.
        actual: String,
    },

    /// A call referenced a handle with no open exchange.
    #[error("no open exchange for handle '{handle}'")]
    MissingHandler {
        /// The unknown handle.
        handle: String,
    },

    /// The file type cannot be materialized on this client.
    #[error("file type {type_name} is not supported for {}", path.display())]
    UnsupportedFileType {
        /// The target file.
        path: PathBuf,
        /// Short name of the type.
        type_name: &'static str,
    },

    /// Symbolic links cannot be created on this platform.
    #[error("symlinks are not supported on this client: {}", path.display())]
    SymlinkUnsupported {
        /// The link that could not be created.
        path: PathBuf,
    },

    /// A required argument was missing or malformed.
    #[error(transparent)]
    ProtocolDecode(#[from] ProtocolError),

    /// A file could not be removed.
    #[error("can't delete {}: {source}", path.display())]
    FileDelete {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A local file could not be read for sending.
    #[error("can't read {}: {source}", path.display())]
    FileRead {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The reply sink failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl EngineError {
    /// Creates a [`EngineError::FileWrite`].
    pub fn file_write(path: &Path, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a [`EngineError::FileMove`].
    pub fn file_move(from: &Path, to: &Path, source: io::Error) -> Self {
        Self::FileMove {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }
    }

    /// Creates a [`EngineError::FileDelete`].
    pub fn file_delete(path: &Path, source: io::Error) -> Self {
        Self::FileDelete {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a [`EngineError::FileRead`].
    pub fn file_read(path: &Path, source: io::Error) -> Self {
        Self::FileRead {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the error aborts the exchange instead of failing one file.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingHandler { .. } | Self::ProtocolDecode(_) | Self::Transport(_)
        )
    }

    /// Stable identifier carried in client messages.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ClobberRefused { .. } => "clobber-refused",
            Self::DirectoryCreate { .. } => "directory-create",
            Self::FileWrite { .. } => "file-write",
            Self::FileMove { .. } => "file-move",
            Self::DigestMismatch { .. } => "digest-mismatch",
            Self::MissingHandler { .. } => "missing-handler",
            Self::UnsupportedFileType { .. } => "unsupported-file-type",
            Self::SymlinkUnsupported { .. } => "symlink-unsupported",
            Self::ProtocolDecode(_) => "protocol-decode",
            Self::FileDelete { .. } => "file-delete",
            Self::FileRead { .. } => "file-read",
            Self::Transport(_) => "transport",
        }
    }

    /// Path the error concerns, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::ClobberRefused { path }
            | Self::DirectoryCreate { path, .. }
            | Self::FileWrite { path, .. }
            | Self::DigestMismatch { path, .. }
            | Self::UnsupportedFileType { path, .. }
            | Self::SymlinkUnsupported { path }
            | Self::FileDelete { path, .. }
            | Self::FileRead { path, .. } => Some(path),
            Self::FileMove { to, .. } => Some(to),
            Self::MissingHandler { .. } | Self::ProtocolDecode(_) | Self::Transport(_) => None,
        }
    }
}

/// Maps an I/O failure while creating a symlink to the matching error.
pub(crate) fn categorize_symlink_error(path: &Path, error: io::Error) -> EngineError {
    match error.kind() {
        io::ErrorKind::Unsupported => EngineError::SymlinkUnsupported {
            path: path.to_path_buf(),
        },
        _ => EngineError::file_write(path, error),
    }
}
