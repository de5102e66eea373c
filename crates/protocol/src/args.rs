//! crates/protocol/src/args.rs
//! Function-call argument maps.
//!
//! Every server-issued function call carries a map of string keys to string,
//! byte-array or integer values. Numeric fields travel as decimal text and
//! are parsed on access; a malformed value is a [`ProtocolError::Decode`].

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ProtocolError;

/// Argument keys used by the client file functions.
pub mod keys {
    /// Function name echoed inside some maps.
    pub const FUNC: &str = "func";
    /// Client-side path of the file being operated on.
    pub const PATH: &str = "path";
    /// Secondary path (move target).
    pub const PATH2: &str = "path2";
    /// Server file type (hex).
    pub const TYPE: &str = "type";
    /// Secondary file type (merge result type, move target type).
    pub const TYPE2: &str = "type2";
    /// Modification time in seconds since the epoch.
    pub const TIME: &str = "time";
    /// Refuse to overwrite writable files.
    pub const NOCLOBBER: &str = "noclobber";
    /// Permission policy, `rw` for writable.
    pub const PERMS: &str = "perms";
    /// Exchange handle.
    pub const HANDLE: &str = "handle";
    /// Content bytes.
    pub const DATA: &str = "data";
    /// Content digest (hex).
    pub const DIGEST: &str = "digest";
    /// Presence selects the digest precheck.
    pub const DIGEST_TYPE: &str = "digestType";
    /// Commit the transfer at close.
    pub const COMMIT: &str = "commit";
    /// Reply function on success.
    pub const CONFIRM: &str = "confirm";
    /// Reply function on failure.
    pub const DECLINE: &str = "decline";
    /// Status field in replies.
    pub const STATUS: &str = "status";
    /// Merge chunk selector bits (decimal).
    pub const BITS: &str = "bits";
    /// Display label of the merge base.
    pub const BASE_NAME: &str = "baseName";
    /// Display label of "theirs".
    pub const THEIR_NAME: &str = "theirName";
    /// Display label of "yours".
    pub const YOUR_NAME: &str = "yourName";
    /// Emit markers around every span, not just conflicts.
    pub const SHOW_ALL: &str = "showAll";
    /// Merge reply function on success.
    pub const MERGE_CONFIRM: &str = "mergeConfirm";
    /// Merge reply function on failure.
    pub const MERGE_DECLINE: &str = "mergeDecline";
    /// Automatic resolve mode.
    pub const MERGE_AUTO: &str = "mergeAuto";
    /// Permissions for the merged file.
    pub const MERGE_PERMS: &str = "mergePerms";
    /// How the merge was resolved.
    pub const MERGE_HOW: &str = "mergeHow";
    /// Force flag in merge replies.
    pub const FORCE: &str = "force";
    /// Remove emptied directories.
    pub const RMDIR: &str = "rmdir";
    /// Type forced by the user.
    pub const FORCE_TYPE: &str = "forceType";
    /// Digest the server holds for the file.
    pub const SERVER_DIGEST: &str = "serverDigest";
    /// Open function name for outbound sends.
    pub const OPEN: &str = "open";
    /// Write function name for outbound sends.
    pub const WRITE: &str = "write";
    /// Content size in bytes.
    pub const FILE_SIZE: &str = "fileSize";
    /// Skip local digest computation for sends.
    pub const SKIP_DIGEST_CHECK: &str = "skipDigestCheck";
    /// File stays open after submit.
    pub const REOPEN: &str = "reopen";
    /// Translation request for writeText.
    pub const TRANS: &str = "trans";
    /// Server xfiles level for type mapping.
    pub const XFILES: &str = "xfiles";
    /// Counters carried by merge replies.
    pub const YOURS: &str = "yours";
    /// Counters carried by merge replies.
    pub const THEIRS: &str = "theirs";
    /// Counters carried by merge replies.
    pub const BOTH: &str = "both";
    /// Counters carried by merge replies.
    pub const CONFLICT: &str = "conflict";
}

/// A single argument value.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArgValue {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes (file content, or text in an unknown encoding).
    Bytes(Vec<u8>),
    /// Integer carried natively by the transport.
    Int(i64),
}

impl ArgValue {
    /// Text view of the value. Byte values qualify when they are valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(b) => std::str::from_utf8(b).ok(),
            Self::Int(_) => None,
        }
    }

    /// Byte view of the value. Text values expose their UTF-8 encoding.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(s) => Some(s.as_bytes()),
            Self::Bytes(b) => Some(b),
            Self::Int(_) => None,
        }
    }

    fn lossy(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Self::Int(i) => i.to_string(),
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for ArgValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for ArgValue {
    fn from(value: u64) -> Self {
        Self::Text(value.to_string())
    }
}

/// Ordered map of argument keys to values.
///
/// Ordering is by key so replies built from a map are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArgMap(BTreeMap<String, ArgValue>);

impl ArgMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: &str, value: impl Into<ArgValue>) {
        self.0.insert(key.to_owned(), value.into());
    }

    /// Removes and returns a value.
    pub fn remove(&mut self, key: &str) -> Option<ArgValue> {
        self.0.remove(key)
    }

    /// Raw value lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    /// Whether `key` is present, whatever its value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Text value of `key`, if present and textual.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ArgValue::as_str)
    }

    /// Text value of `key`, treating an empty string as absent.
    #[must_use]
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.str(key).filter(|s| !s.is_empty())
    }

    /// Byte value of `key`.
    #[must_use]
    pub fn bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(ArgValue::as_bytes)
    }

    /// Text value of a key the function cannot run without.
    pub fn require_str(&self, key: &str) -> Result<&str, ProtocolError> {
        match self.get(key) {
            None => Err(ProtocolError::missing(key)),
            Some(value) => value
                .as_str()
                .ok_or_else(|| ProtocolError::decode(key, value.lossy(), "text")),
        }
    }

    /// Decimal integer value of `key`; absent keys yield `Ok(None)`.
    pub fn parse_i64(&self, key: &str) -> Result<Option<i64>, ProtocolError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value {
            ArgValue::Int(i) => Ok(Some(*i)),
            other => other
                .as_str()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map(Some)
                .ok_or_else(|| ProtocolError::decode(key, other.lossy(), "a decimal integer")),
        }
    }

    /// Decimal integer value of a key the function cannot run without.
    pub fn require_i64(&self, key: &str) -> Result<i64, ProtocolError> {
        self.parse_i64(key)?
            .ok_or_else(|| ProtocolError::missing(key))
    }

    /// Copy of the map without `excluded` keys; used to echo arguments back.
    #[must_use]
    pub fn echo_except(&self, excluded: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !excluded.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for ArgMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One incoming function call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionCall {
    /// Function name as sent by the server.
    pub name: String,
    /// Argument map.
    pub args: ArgMap,
}

impl FunctionCall {
    /// Creates a call.
    #[must_use]
    pub fn new(name: impl Into<String>, args: ArgMap) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}
