#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! Client-side file engine for a function-call driven version control
//! protocol.
//!
//! The server drives the client with named function calls; this crate
//! answers them. It is a facade over the workspace crates:
//!
//! - [`protocol`]: argument maps, reply targets, file types and the
//!   canonical/local content transforms.
//! - [`checksums`]: MD5 content digests.
//! - [`metadata`]: modification time and permission updates.
//! - [`transfer`]: the [`Session`] that dispatches calls to the transfer,
//!   merge, send and file-command handlers.
//! - [`logging`]: tracing targets and subscriber installation.
//!
//! # Example
//!
//! ```
//! use client_engine::{EngineConfig, Session};
//! use client_engine::protocol::{ArgMap, FunctionCall, OutboundCall};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("hello.txt");
//! let path = path.to_string_lossy();
//!
//! let mut session = Session::new(EngineConfig::default());
//! let mut replies: Vec<OutboundCall> = Vec::new();
//! for call in [
//!     FunctionCall::new("open", ArgMap::new().with("handle", "h").with("path", path.as_ref()).with("type", "1")),
//!     FunctionCall::new("write", ArgMap::new().with("handle", "h").with("data", b"hi".as_slice())),
//!     FunctionCall::new("close", ArgMap::new().with("handle", "h").with("commit", "1").with("confirm", "dm-Done")),
//! ] {
//!     let step = session.dispatch(&call, &mut replies).unwrap();
//!     step.deliver(&mut replies).unwrap();
//! }
//! assert_eq!(replies.len(), 1);
//! assert_eq!(std::fs::read(dir.path().join("hello.txt")).unwrap(), b"hi");
//! ```

pub use checksums;
pub use logging;
pub use metadata;
pub use protocol;
pub use transfer;

pub use transfer::{ClientMessage, Effect, EngineConfig, EngineError, Session, Severity, Step};
