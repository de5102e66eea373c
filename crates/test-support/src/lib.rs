#![deny(unsafe_code)]
#![deny(missing_docs)]
//! Fixtures shared by the workspace's integration tests: a scratch
//! workspace directory, a recording reply sink and helpers for building
//! server function calls.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use protocol::{ArgMap, FunctionCall, OutboundCall, ReplySink, TransportError};
use tempfile::TempDir;

/// A temporary client workspace, removed on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates an empty workspace.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create workspace"),
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `rel`.
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Absolute path of `rel` as a string, the form the server sends.
    #[must_use]
    pub fn path_arg(&self, rel: &str) -> String {
        self.path(rel).to_string_lossy().into_owned()
    }

    /// Writes `contents` to `rel`, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics on I/O failure.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Reads `rel`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).expect("read fixture file")
    }

    /// Whether anything exists at `rel`.
    #[must_use]
    pub fn exists(&self, rel: &str) -> bool {
        fs::symlink_metadata(self.path(rel)).is_ok()
    }

    /// Names of the entries directly inside `rel`, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be listed.
    #[must_use]
    pub fn entries(&self, rel: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path(rel))
            .expect("list directory")
            .map(|entry| {
                entry
                    .expect("directory entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    /// Sets or clears the read-only flag on `rel`.
    ///
    /// # Panics
    ///
    /// Panics if the permissions cannot be changed.
    pub fn set_read_only(&self, rel: &str, read_only: bool) {
        let path = self.path(rel);
        let mut perms = fs::metadata(&path).expect("stat fixture").permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(read_only);
        fs::set_permissions(&path, perms).expect("set permissions");
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Reply sink that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Vec<OutboundCall>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    /// A sink that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that accepts `count` calls and fails every later one with a
    /// broken pipe.
    #[must_use]
    pub fn failing_after(count: usize) -> Self {
        Self {
            calls: Vec::new(),
            fail_after: Some(count),
        }
    }

    /// Recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> &[OutboundCall] {
        &self.calls
    }

    /// Target names of the recorded calls, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.target.name()).collect()
    }

    /// Recorded calls sent to `name`.
    pub fn sent_to<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a OutboundCall> + 'a {
        self.calls.iter().filter(move |c| c.target.name() == name)
    }

    /// Removes and returns the recorded calls.
    pub fn take(&mut self) -> Vec<OutboundCall> {
        std::mem::take(&mut self.calls)
    }
}

impl ReplySink for RecordingSink {
    fn send_call(&mut self, call: OutboundCall) -> Result<(), TransportError> {
        if self.fail_after.is_some_and(|limit| self.calls.len() >= limit) {
            return Err(TransportError(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        self.calls.push(call);
        Ok(())
    }
}

/// Builds a function call from string pairs.
#[must_use]
pub fn call(name: &str, pairs: &[(&str, &str)]) -> FunctionCall {
    FunctionCall::new(name, args(pairs))
}

/// Builds an argument map from string pairs.
#[must_use]
pub fn args(pairs: &[(&str, &str)]) -> ArgMap {
    pairs
        .iter()
        .fold(ArgMap::new(), |map, (key, value)| map.with(key, *value))
}

/// A `write`-style call carrying `data` for `handle`.
#[must_use]
pub fn data_call(name: &str, handle: &str, data: &[u8]) -> FunctionCall {
    FunctionCall::new(name, ArgMap::new().with("handle", handle).with("data", data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::ReplyTarget;

    #[test]
    fn workspace_files() {
        let ws = Workspace::new();
        ws.write("a/b.txt", b"hi");
        assert_eq!(ws.read("a/b.txt"), b"hi");
        assert!(ws.exists("a"));
        assert_eq!(ws.entries("a"), ["b.txt"]);
        assert!(ws.path_arg("a/b.txt").ends_with("b.txt"));
    }

    #[test]
    fn sink_fails_on_request() {
        let mut sink = RecordingSink::failing_after(1);
        let call = || OutboundCall::new(ReplyTarget::new("x"), ArgMap::new());
        assert!(sink.send_call(call()).is_ok());
        assert!(sink.send_call(call()).is_err());
        assert_eq!(sink.names(), ["x"]);
    }

    #[test]
    fn call_builder() {
        let call = call("open", &[("handle", "h"), ("path", "/w/a")]);
        assert_eq!(call.name, "open");
        assert_eq!(call.args.str("path"), Some("/w/a"));
    }
}
