//! crates/transfer/src/receiver/mod.rs
//! Materializing server content into working files.
//!
//! An exchange runs `open` → `write`* → `close` under one handle:
//!
//! 1. `open` decides between writing the target directly and writing a
//!    sibling temp file that replaces the target at close (indirect mode,
//!    chosen whenever the target already exists, unless the session syncs in
//!    place). Symbolic links are deferred until their target arrives.
//! 2. `write` passes canonical bytes through the file's [`Transform`] and
//!    feeds the digest.
//! 3. `close` verifies the digest, commits, applies time and permissions and
//!    confirms; any failure declines.
//!
//! Every failure in this module is recoverable: the step carries an error
//! message, the handle is marked errored and later calls for it do nothing
//! until `close` declines.
//!
//! [`Transform`]: protocol::Transform

mod chmod;
mod output;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use checksums::DigestAccumulator;
use metadata::{MetadataOptions, apply_file_metadata, perms_are_writable};
use protocol::{ArgMap, ContentEncoder, FileTypeSpec, ReplyTarget, TransformError, keys};

use crate::canonical::matches_digest;
use crate::commit::{create_parent_dirs, create_symlink, is_symlink, rename_or_copy};
use crate::config::EngineConfig;
use crate::error::{EngineError, categorize_symlink_error};
use crate::message::ClientMessage;
use crate::registry::{HandlerRecord, HandlerState};
use crate::session::Session;
use crate::step::Step;
use crate::temp_guard::{TempFileGuard, open_tmpfile};

/// State of one open file transfer.
#[derive(Debug)]
pub struct TransferState {
    target: PathBuf,
    file_type: FileTypeSpec,
    temp: Option<TempFileGuard>,
    out: Option<File>,
    encoder: ContentEncoder,
    digest: DigestAccumulator,
    digest_translated: bool,
    expected_digest: Option<String>,
    mod_time: Option<i64>,
    deferred_symlink: bool,
    written: u64,
    scratch: Vec<u8>,
}

impl TransferState {
    /// Working file being written.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Temp file receiving content, in indirect mode.
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp.as_ref().map(TempFileGuard::path)
    }

    /// Whether content goes to a temp file first.
    pub const fn is_indirect(&self) -> bool {
        self.temp.is_some()
    }

    /// Canonical bytes received so far.
    pub const fn bytes_written(&self) -> u64 {
        self.written
    }

    fn write(&mut self, data: &[u8]) -> Result<(), EngineError> {
        if self.deferred_symlink {
            return self.write_symlink(data);
        }

        self.scratch.clear();
        self.encoder
            .encode(data, &mut self.scratch)
            .map_err(|e| invalid_data(&self.target, e))?;
        if self.digest_translated {
            self.digest.update(&self.scratch);
        } else {
            self.digest.update(data);
        }
        if let Some(out) = self.out.as_mut() {
            out.write_all(&self.scratch)
                .map_err(|e| EngineError::file_write(&self.target, e))?;
        }
        self.written += data.len() as u64;
        Ok(())
    }

    fn write_symlink(&mut self, data: &[u8]) -> Result<(), EngineError> {
        let target: String = String::from_utf8_lossy(data)
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect();
        if is_symlink(&self.target) || self.target.exists() {
            fs::remove_file(&self.target).map_err(|e| EngineError::file_write(&self.target, e))?;
        }
        create_symlink(&target, &self.target)
            .map_err(|e| categorize_symlink_error(&self.target, e))?;
        logging::trace_transfer!("symlink {} -> {}", self.target.display(), target);
        self.digest.update(data);
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flushes, verifies and commits the content, then applies metadata.
    fn commit(mut self, config: &EngineConfig, expected: Option<&str>) -> Result<(), EngineError> {
        if let Some(mut out) = self.out.take() {
            self.scratch.clear();
            self.encoder
                .finish(&mut self.scratch)
                .map_err(|e| invalid_data(&self.target, e))?;
            if self.digest_translated {
                self.digest.update(&self.scratch);
            }
            out.write_all(&self.scratch)
                .and_then(|()| out.flush())
                .map_err(|e| EngineError::file_write(&self.target, e))?;
        }

        let actual = self.digest.snapshot();
        let expected = expected.or(self.expected_digest.as_deref());
        if let Some(expected) = expected
            && config.verify_digests
            && !actual.matches_hex(expected)
        {
            if self.temp.is_none() && !self.deferred_symlink {
                self.remove_partial();
            }
            return Err(EngineError::DigestMismatch {
                path: self.target.clone(),
                expected: expected.to_ascii_uppercase(),
                actual: actual.to_hex(),
            });
        }

        if let Some(mut guard) = self.temp.take() {
            rename_or_copy(guard.path(), &self.target)
                .map_err(|e| EngineError::file_move(guard.path(), &self.target, e))?;
            guard.keep();
        }
        logging::trace_transfer!(
            "committed {} ({} bytes, {})",
            self.target.display(),
            self.written,
            actual
        );
        Ok(())
    }

    /// Closes the stream without committing.
    fn abandon(mut self) {
        self.out = None;
        if self.temp.is_none() && !self.deferred_symlink {
            self.remove_partial();
        }
    }

    fn remove_partial(&self) {
        if let Err(e) = fs::remove_file(&self.target)
            && e.kind() != io::ErrorKind::NotFound
        {
            logging::warn_cleanup!(
                "client::transfer",
                "could not remove partial file {}: {}",
                self.target.display(),
                e
            );
        }
    }
}

fn invalid_data(target: &Path, err: TransformError) -> EngineError {
    EngineError::file_write(target, io::Error::new(io::ErrorKind::InvalidData, err))
}

impl Session {
    /// `open`: prepares a working file for incoming content.
    pub(crate) fn open_file(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let handle = args.require_str(keys::HANDLE)?;
        let path = self.local_path(args.require_str(keys::PATH)?);
        let file_type = self.file_type(args, keys::TYPE)?;
        let mod_time = args.parse_i64(keys::TIME)?;

        let mut step = Step::new();
        let mut record = HandlerRecord::for_file(&path);
        match self.prepare_transfer(&path, file_type, mod_time, args, &mut step) {
            Ok(Some(state)) => record.state = HandlerState::Transfer(Box::new(state)),
            Ok(None) => record.error = true,
            Err(err) => {
                step.error(&err);
                record.fail();
            }
        }
        self.registry.insert(handle, record);
        Ok(step)
    }

    /// Returns `None` when the local file already has the wanted content.
    fn prepare_transfer(
        &self,
        path: &Path,
        file_type: FileTypeSpec,
        mod_time: Option<i64>,
        args: &ArgMap,
        step: &mut Step,
    ) -> Result<Option<TransferState>, EngineError> {
        if !file_type.is_supported() {
            return Err(EngineError::UnsupportedFileType {
                path: path.to_path_buf(),
                type_name: file_type.name(),
            });
        }

        let options = self.config.transform_options();
        if args.non_empty_str(keys::DIGEST_TYPE).is_some()
            && let Some(digest) = args.non_empty_str(keys::DIGEST)
            && matches_digest(path, &file_type, &options, digest)
        {
            logging::trace_transfer!("{} already up to date", path.display());
            step.unchanged(path);
            return Ok(None);
        }
        let expected_digest = if args.contains(keys::DIGEST_TYPE) {
            None
        } else {
            args.non_empty_str(keys::DIGEST).map(str::to_owned)
        };

        let existing = fs::symlink_metadata(path).ok();
        let is_link = existing.as_ref().is_some_and(|m| m.file_type().is_symlink());
        let is_file = existing.as_ref().is_some_and(fs::Metadata::is_file);

        if is_file && args.contains(keys::NOCLOBBER) && metadata::is_user_writable(path) {
            return Err(EngineError::ClobberRefused {
                path: path.to_path_buf(),
            });
        }
        if is_link {
            fs::remove_file(path).map_err(|e| EngineError::file_delete(path, e))?;
        }
        if existing.is_none() || is_link {
            create_parent_dirs(path).map_err(|source| EngineError::DirectoryCreate {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let deferred_symlink = file_type.is_symlink();
        let (out, temp) = if deferred_symlink {
            (None, None)
        } else if is_file && !self.config.sync_in_place {
            let (file, guard) = open_tmpfile(path, self.config.temp_dir.as_deref())
                .map_err(|e| EngineError::file_write(path, e))?;
            (Some(file), Some(guard))
        } else {
            if is_file && let Err(e) = metadata::set_writable(path, true) {
                logging::trace_transfer!("{}", e);
            }
            let file = File::create(path).map_err(|e| EngineError::file_write(path, e))?;
            (Some(file), None)
        };

        logging::trace_transfer!(
            "open {} as {} ({})",
            path.display(),
            file_type.name(),
            if temp.is_some() { "indirect" } else { "direct" }
        );
        Ok(Some(TransferState {
            target: path.to_path_buf(),
            file_type,
            temp,
            out,
            encoder: self.transform(&file_type).encoder(),
            digest: DigestAccumulator::new(),
            digest_translated: self.config.digest_translated,
            expected_digest,
            mod_time,
            deferred_symlink,
            written: 0,
            scratch: Vec::new(),
        }))
    }

    /// `write`: appends a chunk to an open file.
    pub(crate) fn write_file(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let handle = args.require_str(keys::HANDLE)?;
        let data = args.bytes(keys::DATA).unwrap_or_default();
        let record = self.registry.require(handle)?;

        let mut step = Step::new();
        if record.error {
            return Ok(step);
        }
        let Some(state) = record.transfer_mut() else {
            return Ok(step);
        };
        match state.write(data) {
            Ok(()) => {
                let written = state.bytes_written();
                self.report_progress(written);
            }
            Err(err) => {
                step.error(&err);
                record.fail();
            }
        }
        Ok(step)
    }

    /// `close`: commits or discards an open file and answers the server.
    pub(crate) fn close_file(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let handle = args.require_str(keys::HANDLE)?;
        let record = self
            .registry
            .remove(handle)
            .ok_or_else(|| EngineError::MissingHandler {
                handle: handle.to_owned(),
            })?;
        let confirm = ReplyTarget::from_args(args, keys::CONFIRM);
        let decline = ReplyTarget::from_args(args, keys::DECLINE);
        let echo = args.echo_except(&[keys::FUNC]);

        let mut step = Step::new();
        let HandlerState::Transfer(state) = record.state else {
            step.reply_if(decline, echo);
            return Ok(step);
        };
        if record.error {
            step.reply_if(decline, echo);
            return Ok(step);
        }
        if !args.contains(keys::COMMIT) {
            logging::trace_transfer!("discarding {}", state.target.display());
            state.abandon();
            step.reply_if(decline, echo);
            return Ok(step);
        }

        let target = state.target.clone();
        let file_type = state.file_type;
        let mod_time = state.mod_time.filter(|t| *t > 0);
        match state.commit(&self.config, args.non_empty_str(keys::DIGEST)) {
            Ok(()) => {
                let options = MetadataOptions::new()
                    .mod_time(mod_time)
                    .writable(Some(args.str(keys::PERMS).is_some_and(perms_are_writable)))
                    .executable(file_type.is_executable());
                if let Err(e) = apply_file_metadata(&target, &options) {
                    step.message(ClientMessage::warning("metadata", e.to_string()));
                }
                step.reply_if(confirm, echo);
            }
            Err(err) => {
                step.error(&err);
                step.reply_if(decline, echo);
            }
        }
        Ok(step)
    }
}
