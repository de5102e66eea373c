//! crates/transfer/src/fs_ops/mod.rs
//! File commands that act on working files without a content stream:
//! `checkFile`, `move` and `delete`.

mod check;
mod infer;
mod relocate;
mod remove;

use std::fs;
use std::path::Path;

pub use infer::{
    LocalType, PEEK_LEN, TypeDecision, infer_from_contents, infer_local_type, server_type,
};

/// Removes `dir` if it is empty. Failures are logged and reported as
/// `false`.
fn remove_dir_if_empty(dir: &Path) -> bool {
    match fs::remove_dir(dir) {
        Ok(()) => {
            logging::trace_fs!("removed empty directory {}", dir.display());
            true
        }
        Err(e) => {
            logging::trace_fs!("kept directory {}: {}", dir.display(), e);
            false
        }
    }
}
