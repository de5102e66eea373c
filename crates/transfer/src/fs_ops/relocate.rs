//! `move`: renaming a working file on the client.

use std::path::Path;

use protocol::{ArgMap, ReplyTarget, keys};

use super::check::entry_exists;
use super::remove_dir_if_empty;
use crate::commit::{create_parent_dirs, rename_or_copy};
use crate::error::EngineError;
use crate::message::ClientMessage;
use crate::session::Session;
use crate::step::Step;

fn is_case_only_rename(from: &Path, to: &Path) -> bool {
    from != to && from.to_string_lossy().eq_ignore_ascii_case(&to.to_string_lossy())
}

impl Session {
    /// `move`: renames `path` to `path2`, creating target directories and
    /// optionally removing the emptied source directory.
    pub(crate) fn move_file(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let from = self.local_path(args.require_str(keys::PATH)?);
        let to = self.local_path(args.require_str(keys::PATH2)?);
        let from_type = self.file_type(args, keys::TYPE)?;
        let to_type = self.file_type(args, keys::TYPE2)?;
        let handle = args.non_empty_str(keys::HANDLE);
        let confirm = ReplyTarget::from_args(args, keys::CONFIRM);

        if let Some(handle) = handle {
            let record = self.registry.get_or_create(handle);
            record.error = false;
            record.associated_file = Some(to.clone());
        }

        let mut step = Step::new();
        if !entry_exists(&from, &from_type) {
            step.message(ClientMessage::info(
                "file-missing",
                format!("{} - no such file", from.display()),
            ));
            return Ok(step);
        }

        let same_entry = self.config.case_insensitive && is_case_only_rename(&from, &to);
        let outcome = if entry_exists(&to, &to_type) && !same_entry {
            Err(EngineError::ClobberRefused { path: to.clone() })
        } else {
            create_parent_dirs(&to)
                .map_err(|source| EngineError::DirectoryCreate {
                    path: to.clone(),
                    source,
                })
                .and_then(|()| {
                    rename_or_copy(&from, &to).map_err(|e| EngineError::file_move(&from, &to, e))
                })
        };

        match outcome {
            Ok(()) => {
                logging::trace_fs!("moved {} -> {}", from.display(), to.display());
                step.reply_if(confirm, args.echo_except(&[keys::FUNC]));
            }
            Err(err) => {
                step.error(&err);
                if let Some(handle) = handle {
                    self.registry.get_or_create(handle).fail();
                }
                return Ok(step);
            }
        }

        if args.contains(keys::RMDIR)
            && let Some(parent) = from.parent()
            && self.config.client_root.as_deref() != Some(parent)
        {
            remove_dir_if_empty(parent);
        }
        Ok(step)
    }
}
