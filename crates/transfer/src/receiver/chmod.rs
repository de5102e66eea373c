//! `chmodFile`: permission and time updates without content.

use metadata::{MetadataOptions, apply_file_metadata};
use protocol::{ArgMap, keys};

use crate::error::EngineError;
use crate::message::ClientMessage;
use crate::session::Session;
use crate::step::Step;

impl Session {
    /// `chmodFile`: applies `time`, `perms` and the executable bit of `type`
    /// to an existing file.
    pub(crate) fn chmod_file(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let path = self.local_path(args.require_str(keys::PATH)?);
        let file_type = self.file_type(args, keys::TYPE)?;
        let mod_time = args.parse_i64(keys::TIME)?;

        let mut step = Step::new();
        let exists = if file_type.is_symlink() {
            std::fs::symlink_metadata(&path).is_ok()
        } else {
            path.exists()
        };
        if !exists {
            step.message(ClientMessage::info(
                "chmod-missing",
                format!("{}: can't chmod, file missing", path.display()),
            ));
            return Ok(step);
        }

        let options = MetadataOptions::new()
            .mod_time(mod_time)
            .perms(args.str(keys::PERMS))
            .executable(file_type.is_executable());
        if let Err(e) = apply_file_metadata(&path, &options) {
            logging::trace_fs!("chmod {} failed: {}", path.display(), e);
            step.message(ClientMessage::info("chmod-failed", e.to_string()));
        }
        Ok(step)
    }
}
