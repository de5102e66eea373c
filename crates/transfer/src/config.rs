//! Connection-wide engine settings.

use std::path::PathBuf;

use protocol::{Charset, LineEnding, TransformOptions, Utf8BomPolicy};

use crate::merge::ResolveMode;

/// Settings shared by every handler on one connection.
///
/// Loading these from files or command lines belongs to the embedding
/// application; the engine only consumes the finished value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Write existing files in place instead of through a sibling temp file.
    pub sync_in_place: bool,
    /// Compare the accumulated digest against the server's at close.
    ///
    /// Disabling this mirrors "non-checked" syncs: content is still written
    /// but a mismatch is not treated as a failure.
    pub verify_digests: bool,
    /// Digest the bytes written to disk instead of the bytes received.
    ///
    /// This is a connection-wide toggle, never decided per file.
    pub digest_translated: bool,
    /// Directory for merge temp files and for relocating indirect writes.
    /// `None` places temp files next to their target.
    pub temp_dir: Option<PathBuf>,
    /// Charset of the client machine.
    pub client_charset: Charset,
    /// Whether the server runs in unicode mode.
    pub unicode_server: bool,
    /// Byte order mark policy for utf8 files.
    pub utf8_bom: Utf8BomPolicy,
    /// Line ending used for text written to command output.
    pub line_ending: LineEnding,
    /// Client workspace root; `rmdir` never removes it or anything above it.
    pub client_root: Option<PathBuf>,
    /// Resolve mode when `closeMerge` carries no `mergeAuto`.
    pub default_resolve: ResolveMode,
    /// Highest extended-type level the server understands (`xfiles`).
    pub xfiles_level: u8,
    /// Whether the client filesystem folds case in file names.
    pub case_insensitive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_in_place: false,
            verify_digests: true,
            digest_translated: false,
            temp_dir: None,
            client_charset: Charset::UTF_8,
            unicode_server: false,
            utf8_bom: Utf8BomPolicy::default(),
            line_ending: LineEnding::Local,
            client_root: None,
            default_resolve: ResolveMode::default(),
            xfiles_level: 0,
            case_insensitive: cfg!(any(windows, target_os = "macos")),
        }
    }
}

impl EngineConfig {
    /// Inputs for selecting per-file content transforms.
    #[must_use]
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            client_charset: self.client_charset,
            unicode_server: self.unicode_server,
            utf8_bom: self.utf8_bom,
        }
    }
}
