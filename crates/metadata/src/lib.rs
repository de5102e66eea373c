#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! Working-file metadata: modification times, writability and the executable bit.
//!
//! The server describes permissions coarsely (`perms=rw` or read-only, plus
//! an executable flag in the file type). [`MetadataOptions`] collects those
//! requests and [`apply_file_metadata`] applies them after a file has been
//! committed.

mod apply;
mod error;
mod options;

pub use apply::{
    apply_file_metadata, is_executable, is_user_writable, set_executable, set_modification_time,
    set_writable,
};
pub use error::MetadataError;
pub use options::{MetadataOptions, perms_are_writable};
