//! `delete`: removing a working file and, optionally, its empty parents.

use std::fs;
use std::io;
use std::path::Path;

use protocol::{ArgMap, keys};

use super::check::entry_exists;
use super::remove_dir_if_empty;
use crate::canonical::canonical_digest;
use crate::commit::is_symlink;
use crate::error::EngineError;
use crate::session::Session;
use crate::step::Step;

fn remove_entry(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(first) if !is_symlink(path) && !metadata::is_user_writable(path) => {
            logging::trace_fs!("retrying delete of {} as writable: {}", path.display(), first);
            metadata::set_writable(path, true).map_err(|_| first)?;
            fs::remove_file(path)
        }
        Err(e) => Err(e),
    }
}

impl Session {
    /// `delete`: removes a working file. A missing file is not an error.
    pub(crate) fn delete_file(&mut self, args: &ArgMap) -> Result<Step, EngineError> {
        let path = self.local_path(args.require_str(keys::PATH)?);
        let file_type = self.file_type(args, keys::TYPE)?;
        let handle = args.non_empty_str(keys::HANDLE);

        let mut step = Step::new();
        if !entry_exists(&path, &file_type) {
            logging::trace_fs!("{} already gone", path.display());
            return Ok(step);
        }

        let outcome = self.check_deletable(args, &path, &file_type).and_then(|()| {
            remove_entry(&path).map_err(|e| EngineError::file_delete(&path, e))
        });
        if let Err(err) = outcome {
            step.error(&err);
            if let Some(handle) = handle {
                self.registry.get_or_create(handle).fail();
            }
            return Ok(step);
        }
        logging::trace_fs!("deleted {}", path.display());

        if args.contains(keys::RMDIR) {
            self.remove_empty_parents(&path);
        }
        Ok(step)
    }

    fn check_deletable(
        &self,
        args: &ArgMap,
        path: &Path,
        file_type: &protocol::FileTypeSpec,
    ) -> Result<(), EngineError> {
        if args.contains(keys::DIGEST_TYPE)
            && let Some(expected) = args.non_empty_str(keys::DIGEST)
        {
            let actual = canonical_digest(path, file_type, &self.config.transform_options())
                .map_err(|e| EngineError::file_read(path, e))?
                .0;
            if !actual.matches_hex(expected) {
                return Err(EngineError::DigestMismatch {
                    path: path.to_path_buf(),
                    expected: expected.to_ascii_uppercase(),
                    actual: actual.to_hex(),
                });
            }
        }
        if args.contains(keys::NOCLOBBER) && path.is_file() && metadata::is_user_writable(path) {
            return Err(EngineError::ClobberRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Removes empty directories above `path`, stopping at the client root,
    /// at a symlink or at the first directory that can't be removed.
    fn remove_empty_parents(&self, path: &Path) {
        let root = self.config.client_root.as_deref();
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || Some(dir) == root || is_symlink(dir) {
                break;
            }
            if !remove_dir_if_empty(dir) {
                break;
            }
            current = dir.parent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksums::DigestAccumulator;
    use protocol::{FunctionCall, OutboundCall};
    use std::path::PathBuf;
    use tempfile::tempdir;

    use crate::config::EngineConfig;

    fn del(path: &Path) -> ArgMap {
        ArgMap::new()
            .with("path", path.to_string_lossy().as_ref())
            .with("handle", "d")
    }

    fn run(session: &mut Session, args: ArgMap) -> Step {
        let mut sink: Vec<OutboundCall> = Vec::new();
        session
            .dispatch(&FunctionCall::new("client-DeleteFile", args), &mut sink)
            .expect("dispatch")
    }

    #[test]
    fn missing_file_is_silent() {
        let dir = tempdir().expect("tempdir");
        let mut session = Session::default();
        assert!(run(&mut session, del(&dir.path().join("gone"))).is_empty());
    }

    #[test]
    fn read_only_file_is_deleted() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ro.txt");
        fs::write(&path, b"x").expect("seed");
        metadata::set_writable(&path, false).expect("read-only");
        let mut session = Session::default();

        let step = run(&mut session, del(&path));
        assert!(step.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn noclobber_protects_writable_files() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("w.txt");
        fs::write(&path, b"x").expect("seed");
        metadata::set_writable(&path, true).expect("writable");
        let mut session = Session::default();

        let step = run(&mut session, del(&path).with("noclobber", "1"));
        assert_eq!(step.messages().next().expect("error").code(), "clobber-refused");
        assert!(path.exists());
    }

    #[test]
    fn digest_mismatch_keeps_file_and_errors_handle() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        fs::write(&path, b"edited\n").expect("seed");
        let mut session = Session::default();

        let stale = DigestAccumulator::digest_of(b"original\n").to_hex();
        let step = run(
            &mut session,
            del(&path)
                .with("digest", stale.as_str())
                .with("digestType", "md5")
                .with("type", "0"),
        );
        assert_eq!(step.messages().next().expect("error").code(), "digest-mismatch");
        assert!(path.exists());
        assert!(session.registry_mut().get("d").expect("record").error);

        let current = DigestAccumulator::digest_of(b"edited\n").to_hex();
        let matching = del(&path).with("digest", current.as_str()).with("digestType", "md5");
        run(&mut session, matching);
        assert!(!path.exists());
    }

    #[test]
    fn digest_without_digest_type_is_not_checked() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        fs::write(&path, b"edited\n").expect("seed");
        let mut session = Session::default();

        let stale = DigestAccumulator::digest_of(b"original\n").to_hex();
        let step = run(&mut session, del(&path).with("digest", stale.as_str()));
        assert_eq!(step.messages().count(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn rmdir_stops_at_client_root() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("ws");
        let deep = root.join("a/b");
        fs::create_dir_all(&deep).expect("mkdir");
        fs::write(root.join("a/keep.txt"), b"k").expect("seed");
        let path = deep.join("f.txt");
        fs::write(&path, b"x").expect("seed");
        let mut session = Session::new(EngineConfig {
            client_root: Some(root.clone()),
            ..EngineConfig::default()
        });

        run(&mut session, del(Path::new("a/b/f.txt")).with("rmdir", ""));
        assert!(!deep.exists());
        assert!(root.join("a").exists());

        fs::remove_file(root.join("a/keep.txt")).expect("unseed");
        let path: PathBuf = root.join("a/g.txt");
        fs::write(&path, b"x").expect("seed");
        run(&mut session, del(&path).with("rmdir", ""));
        assert!(!root.join("a").exists());
        assert!(root.exists());
    }
}
