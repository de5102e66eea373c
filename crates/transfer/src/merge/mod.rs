//! crates/transfer/src/merge/mod.rs
//! Three-way and two-way merges driven by the server.
//!
//! The server diffs base, theirs and yours itself and streams the result as
//! chunks tagged with [`SelectorBits`]. The client rebuilds base, theirs and
//! the merge result in temp files, keeps a digest of each, counts regions,
//! and at `closeMerge` picks an outcome with [`auto_resolve`] and moves the
//! chosen file onto the working file.
//!
//! Two-way merges only stream theirs; the counts come from comparing the
//! base, working and incoming digests.

mod chunk;
mod resolve;
mod state;

pub use chunk::{Counter, MarkerKind, MergeLabels, SelectorBits, classify, marker_visible};
pub use resolve::{
    MergeCounts, ParseResolveModeError, ResolveChoice, ResolveMode, auto_resolve,
};
pub use state::{LegDigests, MergeState};

use std::path::Path;

use metadata::perms_are_writable;
use protocol::{ArgMap, ProtocolError, ReplyTarget, keys};

use crate::canonical::canonical_digest;
use crate::commit::rename_or_copy;
use crate::error::EngineError;
use crate::message::ClientMessage;
use crate::registry::{HandlerRecord, HandlerState};
use crate::session::Session;
use crate::step::Step;

fn parse_choice(value: &str) -> Option<ResolveChoice> {
    match value {
        "yours" => Some(ResolveChoice::Yours),
        "theirs" => Some(ResolveChoice::Theirs),
        "merged" => Some(ResolveChoice::Merged),
        "edit" => Some(ResolveChoice::Edit),
        "skip" => Some(ResolveChoice::Skip),
        _ => None,
    }
}

fn insert_counts(reply: &mut ArgMap, counts: &MergeCounts) {
    reply.insert(keys::YOURS, u64::from(counts.yours));
    reply.insert(keys::THEIRS, u64::from(counts.theirs));
    reply.insert(keys::BOTH, u64::from(counts.both));
    reply.insert(keys::CONFLICT, u64::from(counts.conflict));
}

fn apply_merge_perms(path: &Path, perms: &str, step: &mut Step) {
    if let Err(e) = metadata::set_writable(path, perms_are_writable(perms)) {
        logging::trace_merge!("{}", e);
        step.message(ClientMessage::warning("metadata", e.to_string()));
    }
}

impl Session {
    /// `openMerge3` / `openMerge2`: allocates the merge temp files.
    pub(crate) fn open_merge(&mut self, args: &ArgMap, two_way: bool) -> Result<Step, EngineError> {
        let handle = args.require_str(keys::HANDLE)?;
        let path = self.local_path(args.require_str(keys::PATH)?);
        let file_type = self.file_type(args, keys::TYPE)?;
        let result_type = if args.contains(keys::TYPE2) {
            self.file_type(args, keys::TYPE2)?
        } else {
            file_type
        };

        let mut step = Step::new();
        let mut record = HandlerRecord::for_file(&path);
        let temp_dir = self.config.temp_dir.clone();

        let opened = if let Some(prepared) = self.external_merge_file.take() {
            logging::trace_merge!(
                "external merge of {} via {}",
                path.display(),
                prepared.display()
            );
            Ok(MergeState::external(path.clone(), file_type, prepared))
        } else if two_way {
            MergeState::two_way(
                path.clone(),
                file_type,
                &self.transform(&result_type),
                args.non_empty_str(keys::DIGEST).map(str::to_owned),
                temp_dir.as_deref(),
            )
        } else {
            let defaults = MergeLabels::default();
            let label = |key: &str, fallback: String| {
                args.non_empty_str(key).map_or(fallback, str::to_owned)
            };
            let labels = MergeLabels {
                base: label(keys::BASE_NAME, defaults.base),
                theirs: label(keys::THEIR_NAME, defaults.theirs),
                yours: label(keys::YOUR_NAME, defaults.yours),
            };
            MergeState::three_way(
                path.clone(),
                file_type,
                &self.transform(&file_type),
                &self.transform(&result_type),
                labels,
                args.contains(keys::SHOW_ALL),
                temp_dir.as_deref(),
            )
        };

        match opened {
            Ok(state) => record.state = HandlerState::Merge(Box::new(state)),
            Err(e) => {
                step.error(&EngineError::file_write(&path, e));
                record.fail();
            }
        }
        self.registry.insert(handle, record);
        Ok(step)
    }

    /// `writeMerge`: routes one chunk.
    pub(crate) fn write_merge(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let handle = args.require_str(keys::HANDLE)?;
        let raw_bits = args.require_i64(keys::BITS)?;
        let bits = u8::try_from(raw_bits)
            .map(SelectorBits::from_raw)
            .map_err(|_| ProtocolError::decode(keys::BITS, raw_bits.to_string(), "selector bits"))?;
        let data = args.bytes(keys::DATA).unwrap_or_default();

        let record = self.registry.require(handle)?;
        let mut step = Step::new();
        if record.error {
            return Ok(step);
        }
        let Some(state) = record.merge_mut() else {
            return Ok(step);
        };
        if let Err(e) = state.write_chunk(bits, data) {
            let err = EngineError::file_write(state.client_path(), e);
            step.error(&err);
            record.fail();
        }
        Ok(step)
    }

    /// `closeMerge`: resolves, commits and answers the server.
    pub(crate) fn close_merge(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let handle = args.require_str(keys::HANDLE)?;
        let record = self
            .registry
            .remove(handle)
            .ok_or_else(|| EngineError::MissingHandler {
                handle: handle.to_owned(),
            })?;
        let mode = match args.non_empty_str(keys::MERGE_AUTO) {
            Some(value) => value
                .parse::<ResolveMode>()
                .map_err(|_| {
                    ProtocolError::decode(keys::MERGE_AUTO, value, "safe, force, auto or none")
                })?,
            None => self.config.default_resolve,
        };
        let forced = match args.non_empty_str(keys::MERGE_HOW) {
            Some(value) => Some(parse_choice(value).ok_or_else(|| {
                ProtocolError::decode(keys::MERGE_HOW, value, "a merge outcome")
            })?),
            None => None,
        };
        let confirm = ReplyTarget::from_args(args, keys::MERGE_CONFIRM);
        let decline = ReplyTarget::from_args(args, keys::MERGE_DECLINE);
        let merge_perms = args.non_empty_str(keys::MERGE_PERMS);
        let mut reply = args.echo_except(&[keys::FUNC, keys::TYPE, keys::STATUS]);

        let mut step = Step::new();
        let HandlerState::Merge(mut state) = record.state else {
            insert_counts(&mut reply, &MergeCounts::default());
            step.reply_if(decline, reply);
            return Ok(step);
        };
        insert_counts(&mut reply, &state.counts());
        if record.error {
            step.reply_if(decline, reply);
            return Ok(step);
        }

        let options = self.config.transform_options();
        let client_path = state.client_path().to_path_buf();
        let file_type = *state.file_type();

        if let Some(prepared) = state.external_file().map(Path::to_path_buf) {
            if merge_perms.is_some() && client_path.exists() {
                apply_merge_perms(&client_path, "rw", &mut step);
            }
            if let Err(e) = rename_or_copy(&prepared, &client_path) {
                step.error(&EngineError::file_move(&prepared, &client_path, e));
                step.reply_if(decline, reply);
                return Ok(step);
            }
            if let Some(perms) = merge_perms {
                apply_merge_perms(&client_path, perms, &mut step);
            }
            reply.insert(keys::MERGE_HOW, "edit");
            if let Ok((digest, _)) = canonical_digest(&client_path, &file_type, &options) {
                reply.insert(keys::DIGEST, digest.to_hex());
            }
            step.reply_if(confirm, reply);
            return Ok(step);
        }

        let digests = match state.finish_streams() {
            Ok(digests) => digests,
            Err(e) => {
                step.error(&EngineError::file_write(&client_path, e));
                step.reply_if(decline, reply);
                return Ok(step);
            }
        };

        let two_way = state.is_two_way();
        let yours_digest = if two_way {
            canonical_digest(&client_path, &file_type, &options)
                .ok()
                .map(|(digest, _)| digest)
        } else {
            digests.yours
        };
        if two_way {
            let yours_hex = yours_digest.map(|d| d.to_hex());
            let theirs_hex = digests.theirs.map(|d| d.to_hex());
            let counts = MergeCounts::two_way(
                state.base_digest(),
                yours_hex.as_deref(),
                theirs_hex.as_deref(),
            );
            state.set_counts(counts);
        }

        let counts = state.counts();
        let choice = forced.unwrap_or_else(|| auto_resolve(mode, &counts, two_way));
        logging::trace_merge!(
            "{}: {:?} with {:?} ({})",
            client_path.display(),
            choice,
            counts,
            mode
        );
        step.message(ClientMessage::info("merge-summary", counts.summary()));

        let replaces = matches!(
            choice,
            ResolveChoice::Theirs | ResolveChoice::Merged | ResolveChoice::Edit
        );
        if replaces && merge_perms.is_some() && client_path.exists() {
            apply_merge_perms(&client_path, "rw", &mut step);
        }
        insert_counts(&mut reply, &counts);
        if let Err(e) = state.finish_merge(choice) {
            step.error(&EngineError::file_move(&client_path, &client_path, e));
            step.reply_if(decline, reply);
            return Ok(step);
        }
        if replaces && let Some(perms) = merge_perms {
            apply_merge_perms(&client_path, perms, &mut step);
        }
        drop(state);

        let Some(how) = choice.merge_how() else {
            step.reply_if(decline, reply);
            return Ok(step);
        };
        reply.insert(keys::MERGE_HOW, how);
        let digest = match choice {
            ResolveChoice::Yours => yours_digest,
            ResolveChoice::Theirs => {
                reply.insert(keys::FORCE, "no");
                digests.theirs
            }
            ResolveChoice::Merged if counts.conflict == 0 => digests.result,
            _ => None,
        };
        if let Some(digest) = digest {
            reply.insert(keys::DIGEST, digest.to_hex());
        }
        step.reply_if(confirm, reply);
        Ok(step)
    }
}
