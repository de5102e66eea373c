//! Per-connection table of open exchanges, keyed by handle.
//!
//! A handle names one bounded exchange (an open/write/close sequence, a
//! merge, a send). The record outlives individual calls and is removed when
//! the exchange closes. Not synchronized: each connection owns one registry.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use protocol::ArgValue;

use crate::error::EngineError;
use crate::merge::MergeState;
use crate::receiver::TransferState;

/// State specific to the kind of exchange a handle is running.
#[derive(Debug, Default)]
pub enum HandlerState {
    /// No typed state (sends, moves, deletes).
    #[default]
    Generic,
    /// An open/write/close file transfer.
    Transfer(Box<TransferState>),
    /// A merge.
    Merge(Box<MergeState>),
}

/// One open exchange.
#[derive(Debug, Default)]
pub struct HandlerRecord {
    /// Set after a recoverable failure; later calls for the handle are no-ops.
    pub error: bool,
    /// File the exchange is about.
    pub associated_file: Option<PathBuf>,
    /// Free-form values remembered between calls.
    pub attributes: BTreeMap<String, ArgValue>,
    /// Typed state.
    pub state: HandlerState,
}

impl HandlerRecord {
    /// A fresh record for `path`.
    #[must_use]
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            associated_file: Some(path.into()),
            ..Self::default()
        }
    }

    /// The transfer state, if this is a transfer.
    pub fn transfer_mut(&mut self) -> Option<&mut TransferState> {
        match &mut self.state {
            HandlerState::Transfer(state) => Some(state),
            _ => None,
        }
    }

    /// The merge state, if this is a merge.
    pub fn merge_mut(&mut self) -> Option<&mut MergeState> {
        match &mut self.state {
            HandlerState::Merge(state) => Some(state),
            _ => None,
        }
    }

    /// Drops typed state (closing streams and removing temp files) and
    /// marks the record errored.
    pub fn fail(&mut self) {
        self.error = true;
        self.state = HandlerState::Generic;
    }
}

/// Handle → record table.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    records: HashMap<String, HandlerRecord>,
}

impl HandlerRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `handle`, if one exists.
    pub fn get(&mut self, handle: &str) -> Option<&mut HandlerRecord> {
        self.records.get_mut(handle)
    }

    /// Record for `handle`, creating an empty one if needed.
    pub fn get_or_create(&mut self, handle: &str) -> &mut HandlerRecord {
        self.records.entry(handle.to_owned()).or_default()
    }

    /// Replaces any record for `handle` with `record`.
    pub fn insert(&mut self, handle: &str, record: HandlerRecord) -> &mut HandlerRecord {
        self.records.insert(handle.to_owned(), record);
        self.get_or_create(handle)
    }

    /// Record for `handle`, failing the exchange when absent.
    pub fn require(&mut self, handle: &str) -> Result<&mut HandlerRecord, EngineError> {
        self.records
            .get_mut(handle)
            .ok_or_else(|| EngineError::MissingHandler {
                handle: handle.to_owned(),
            })
    }

    /// Removes and returns the record for `handle`.
    pub fn remove(&mut self, handle: &str) -> Option<HandlerRecord> {
        self.records.remove(handle)
    }

    /// Whether `handle` is registered.
    #[must_use]
    pub fn contains(&self, handle: &str) -> bool {
        self.records.contains_key(handle)
    }

    /// Number of open exchanges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no exchange is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record, releasing all temp files.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_fails_for_unknown_handle() {
        let mut registry = HandlerRegistry::new();
        let err = registry.require("sync").expect_err("nothing open");
        assert!(matches!(err, EngineError::MissingHandler { ref handle } if handle == "sync"));
        assert!(err.is_fatal());
    }

    #[test]
    fn get_or_create_reuses_record() {
        let mut registry = HandlerRegistry::new();
        registry.get_or_create("h").error = true;
        assert!(registry.get_or_create("h").error);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn insert_replaces_stale_record() {
        let mut registry = HandlerRegistry::new();
        registry.get_or_create("h").error = true;
        let record = registry.insert("h", HandlerRecord::for_file("/w/a"));
        assert!(!record.error);
        assert_eq!(record.associated_file.as_deref(), Some(std::path::Path::new("/w/a")));
    }

    #[test]
    fn fail_drops_typed_state() {
        let mut record = HandlerRecord::default();
        record.fail();
        assert!(record.error);
        assert!(record.transfer_mut().is_none());
        assert!(record.merge_mut().is_none());
    }

    #[test]
    fn remove_and_clear() {
        let mut registry = HandlerRegistry::new();
        registry.get_or_create("a");
        registry.get_or_create("b");
        assert!(registry.remove("a").is_some());
        assert!(!registry.contains("a"));
        registry.clear();
        assert!(registry.is_empty());
    }
}
