//! `sendFile`: streaming a working file to the server.
//!
//! Packets go straight to the [`ReplySink`] as they are produced: an `open`
//! echoing the incoming arguments, one `write` per chunk of canonical
//! content, then `confirm` (or `decline` after a failure) carrying the
//! whole-file digest, size and modification time. A file whose digest the
//! server already has is confirmed with `status=same` and nothing is sent.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use checksums::DigestAccumulator;
use metadata::perms_are_writable;
use protocol::{ArgMap, FileTypeSpec, OutboundCall, ReplySink, ReplyTarget, keys};

use crate::canonical::{CanonicalReader, SEND_CHUNK_LEN, canonical_digest};
use crate::commit::is_symlink;
use crate::error::EngineError;
use crate::message::ClientMessage;
use crate::session::Session;
use crate::step::Step;

/// Modification time in whole seconds, if known and non-zero.
fn mod_time_secs(path: &Path) -> Option<u64> {
    fs::symlink_metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .filter(|secs| *secs != 0)
}

fn local_file_present(path: &Path, file_type: &FileTypeSpec) -> bool {
    if file_type.is_symlink() {
        is_symlink(path)
    } else {
        path.is_file()
    }
}

/// Running totals of one send.
struct Sent {
    digest: DigestAccumulator,
    bytes: u64,
}

impl Session {
    /// `sendFile`: streams a working file to the server.
    pub(crate) fn send_file(
        &mut self,
        args: &ArgMap,
        sink: &mut dyn ReplySink,
    ) -> Result<Step, EngineError> {
        let path = self.local_path(args.require_str(keys::PATH)?);
        let handle = args.require_str(keys::HANDLE)?;
        let file_type = self.file_type(args, keys::TYPE)?;
        let write = ReplyTarget::new(args.require_str(keys::WRITE)?);
        let open = ReplyTarget::from_args(args, keys::OPEN);
        let confirm = ReplyTarget::from_args(args, keys::CONFIRM);
        let decline = ReplyTarget::from_args(args, keys::DECLINE);
        let perms = args.non_empty_str(keys::PERMS);
        let reopen = args.contains(keys::REOPEN);
        let echo = args.echo_except(&[keys::FUNC]);
        let options = self.config.transform_options();

        let mut step = Step::new();

        if args.contains(keys::SKIP_DIGEST_CHECK) {
            logging::trace_send!("{}: digest check skipped", path.display());
            if let Some(confirm) = confirm {
                sink.send_call(OutboundCall::new(confirm, echo.with(keys::STATUS, "same")))?;
            }
            return Ok(step);
        }

        if let Some(server_digest) = args.non_empty_str(keys::SERVER_DIGEST)
            && let Ok((local, _)) = canonical_digest(&path, &file_type, &options)
            && local.matches_hex(server_digest)
        {
            logging::trace_send!("{}: server already has {}", path.display(), local);
            if !reopen && let Some(perms) = perms {
                self.apply_send_perms(&path, &file_type, perms, &mut step);
            }
            if let Some(confirm) = confirm {
                let args = echo
                    .with(keys::STATUS, "same")
                    .with(keys::DIGEST, local.to_hex());
                sink.send_call(OutboundCall::new(confirm, args))?;
            }
            return Ok(step);
        }

        let errored_before = self.registry.get_or_create(handle).error;
        let mut sent = None;
        if !errored_before {
            if let Some(open) = open {
                sink.send_call(OutboundCall::new(open, echo.clone()))?;
            }
            if local_file_present(&path, &file_type) {
                match self.stream_content(&path, &file_type, handle, &write, sink) {
                    Ok(totals) => sent = Some(totals),
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        step.error(&err);
                        self.registry.get_or_create(handle).fail();
                    }
                }
            } else {
                step.message(ClientMessage::info(
                    "file-missing",
                    format!("open for read: {}: No such file or directory", path.display()),
                ));
                self.registry.get_or_create(handle).fail();
            }
        }

        let errored = self.registry.get_or_create(handle).error;
        if !errored
            && !reopen
            && let Some(perms) = perms
        {
            self.apply_send_perms(&path, &file_type, perms, &mut step);
        }

        let mut finish = echo;
        if let Some(sent) = sent {
            finish.insert(keys::DIGEST, sent.digest.finish().to_hex());
            finish.insert(keys::FILE_SIZE, sent.bytes);
            if let Some(secs) = mod_time_secs(&path) {
                finish.insert(keys::TIME, secs);
            }
        }
        let target = if errored { decline } else { confirm };
        if let Some(target) = target {
            sink.send_call(OutboundCall::new(target, finish))?;
        }
        self.registry.remove(handle);
        Ok(step)
    }

    fn stream_content(
        &mut self,
        path: &Path,
        file_type: &FileTypeSpec,
        handle: &str,
        write: &ReplyTarget,
        sink: &mut dyn ReplySink,
    ) -> Result<Sent, EngineError> {
        let options = self.config.transform_options();
        let mut reader = CanonicalReader::open(path, file_type, &options)
            .map_err(|e| EngineError::file_read(path, e))?;
        let mut sent = Sent {
            digest: DigestAccumulator::new(),
            bytes: 0,
        };
        while let Some(chunk) = reader
            .next_chunk(SEND_CHUNK_LEN)
            .map_err(|e| EngineError::file_read(path, e))?
        {
            sent.digest.update(&chunk);
            sent.bytes += chunk.len() as u64;
            let args = ArgMap::new()
                .with(keys::DATA, chunk)
                .with(keys::HANDLE, handle);
            sink.send_call(OutboundCall::new(write.clone(), args))?;
            self.report_progress(sent.bytes);
        }
        logging::trace_send!("{}: sent {} bytes", path.display(), sent.bytes);
        Ok(sent)
    }

    fn apply_send_perms(
        &self,
        path: &Path,
        file_type: &FileTypeSpec,
        perms: &str,
        step: &mut Step,
    ) {
        if file_type.is_symlink() || is_symlink(path) {
            return;
        }
        if let Err(e) = metadata::set_writable(path, perms_are_writable(perms)) {
            logging::trace_send!("{}", e);
            step.message(ClientMessage::warning("metadata", e.to_string()));
        }
    }
}
