//! `checkFile`: existence, digest and type checks on a working file.

use std::path::Path;

use protocol::{ArgMap, FileTypeSpec, ReplyTarget, keys};

use super::infer::{LocalType, infer_local_type, server_type};
use crate::canonical::matches_digest;
use crate::error::EngineError;
use crate::session::Session;
use crate::step::Step;

/// `status` values reported by `checkFile`.
const STATUS_MISSING: &str = "missing";
const STATUS_EXISTS: &str = "exists";
const STATUS_SAME: &str = "same";

pub(super) fn entry_exists(path: &Path, file_type: &FileTypeSpec) -> bool {
    if file_type.is_symlink() {
        std::fs::symlink_metadata(path).is_ok()
    } else {
        path.exists()
    }
}

impl Session {
    /// `checkFile`: with a `type`, reports whether the file is missing,
    /// present or identical to `digest`; without one, infers the type the
    /// server should record for it.
    pub(crate) fn check_file(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let path = self.local_path(args.require_str(keys::PATH)?);
        let confirm = ReplyTarget::from_args(args, keys::CONFIRM);
        let mut step = Step::new();

        let (type_name, status) = if let Some(raw_type) = args.non_empty_str(keys::TYPE) {
            let file_type = self.file_type(args, keys::TYPE)?;
            let status = if !entry_exists(&path, &file_type) {
                STATUS_MISSING
            } else if let Some(digest) = args.non_empty_str(keys::DIGEST)
                && matches_digest(&path, &file_type, &self.config.transform_options(), digest)
            {
                STATUS_SAME
            } else {
                STATUS_EXISTS
            };
            (raw_type.to_owned(), status)
        } else {
            let xfiles = match args.parse_i64(keys::XFILES)? {
                Some(level) => u8::try_from(level.clamp(0, i64::from(u8::MAX))).unwrap_or(u8::MAX),
                None => self.config.xfiles_level,
            };
            let local = infer_local_type(&path, self.config.unicode_server);
            logging::trace_fs!("{} looks like {:?}", path.display(), local);
            let status = if local == LocalType::Missing {
                STATUS_MISSING
            } else {
                STATUS_EXISTS
            };
            match server_type(&path, local, args.non_empty_str(keys::FORCE_TYPE), xfiles) {
                Ok(decision) => {
                    if let Some(note) = decision.note {
                        step.message(note);
                    }
                    (decision.name, status)
                }
                Err(refusal) => {
                    step.message(refusal);
                    return Ok(step);
                }
            }
        };

        let reply = args
            .echo_except(&[keys::FUNC, keys::TYPE, keys::STATUS])
            .with(keys::TYPE, type_name)
            .with(keys::STATUS, status);
        step.reply_if(confirm, reply);
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksums::DigestAccumulator;
    use protocol::{FunctionCall, OutboundCall};
    use std::fs;
    use tempfile::tempdir;

    fn check(session: &mut Session, args: ArgMap) -> Step {
        let mut sink: Vec<OutboundCall> = Vec::new();
        session
            .dispatch(&FunctionCall::new("client-CheckFile", args), &mut sink)
            .expect("dispatch")
    }

    fn base_args(path: &Path) -> ArgMap {
        ArgMap::new()
            .with("path", path.to_string_lossy().as_ref())
            .with("confirm", "dm-OpenFile")
            .with("change", "12")
    }

    fn only_reply(step: &Step) -> &OutboundCall {
        let replies: Vec<_> = step.replies().collect();
        assert_eq!(replies.len(), 1);
        replies[0]
    }

    #[test]
    fn typed_check_reports_status() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        let mut session = Session::default();

        let missing = check(&mut session, base_args(&path).with("type", "0"));
        assert_eq!(only_reply(&missing).args.str("status"), Some("missing"));

        fs::write(&path, b"one\n").expect("seed");
        let exists = check(
            &mut session,
            base_args(&path).with("type", "0").with("digest", "00"),
        );
        assert_eq!(only_reply(&exists).args.str("status"), Some("exists"));

        let digest = DigestAccumulator::digest_of(b"one\n").to_hex();
        let same = check(
            &mut session,
            base_args(&path).with("type", "0").with("digest", digest.as_str()),
        );
        let reply = only_reply(&same);
        assert_eq!(reply.target.name(), "dm-OpenFile");
        assert_eq!(reply.args.str("status"), Some("same"));
        assert_eq!(reply.args.str("type"), Some("0"));
        assert_eq!(reply.args.str("change"), Some("12"));
    }

    #[test]
    fn untyped_check_infers_type() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("img.bin");
        fs::write(&path, [0x89, b'P', b'N', b'G', 0, 1, 2]).expect("seed");
        let mut session = Session::default();

        let step = check(&mut session, base_args(&path).with("xfiles", "3"));
        let reply = only_reply(&step);
        assert_eq!(reply.args.str("type"), Some("ubinary"));
        assert_eq!(reply.args.str("status"), Some("exists"));
        assert_eq!(reply.args.str("xfiles"), Some("3"));
    }

    #[test]
    fn empty_file_is_assumed_text_with_note() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty");
        fs::write(&path, b"").expect("seed");
        let mut session = Session::default();

        let step = check(&mut session, base_args(&path));
        assert_eq!(only_reply(&step).args.str("type"), Some("text"));
        let note = step.messages().next().expect("note");
        assert!(!note.is_error());
    }

    #[test]
    fn directory_gets_message_and_no_reply() {
        let dir = tempdir().expect("tempdir");
        let mut session = Session::default();
        let step = check(&mut session, base_args(dir.path()));
        assert_eq!(step.replies().count(), 0);
        assert!(step.messages().next().expect("refusal").text().contains("can't be added"));
    }

    #[test]
    fn missing_file_without_type_is_reported_missing() {
        let dir = tempdir().expect("tempdir");
        let mut session = Session::default();
        let step = check(&mut session, base_args(&dir.path().join("nope")));
        let reply = only_reply(&step);
        assert_eq!(reply.args.str("status"), Some("missing"));
        assert_eq!(reply.args.str("type"), Some("text"));
    }
}
