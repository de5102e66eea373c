#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! Client-side file engine driven by server function calls.
//!
//! The server steers the client through named functions (`open`, `write`,
//! `close`, `openMerge3`, `sendFile`, ...) each carrying an argument map.
//! A [`Session`] routes every call to its handler and returns a [`Step`]:
//! the ordered replies and user messages the call produced.
//!
//! # Exchanges
//!
//! Calls that span several packets share a *handle*. The session keeps one
//! [`HandlerRecord`] per open handle in its [`HandlerRegistry`]:
//!
//! - **Transfer** (`open` → `write`* → `close`): content is transformed from
//!   canonical form to the local representation, written directly or via a
//!   temp file, verified against the server digest and committed.
//! - **Merge** (`openMerge3`/`openMerge2` → `writeMerge`* → `closeMerge`):
//!   tagged chunks are routed into base, theirs and result streams, counted
//!   and resolved automatically or by an explicit choice.
//! - **Send** (`sendFile`): the local file is read in canonical form and
//!   streamed straight to the [`ReplySink`](protocol::ReplySink).
//!
//! `checkFile`, `chmodFile`, `move`, `delete`, `writeText` and `writeBinary`
//! complete in a single call.
//!
//! # Errors
//!
//! [`EngineError::is_fatal`] splits failures. Fatal errors (unknown handle,
//! malformed argument, transport failure) come back from
//! [`Session::dispatch`] as `Err`. Everything else fails one file: the step
//! carries an error message, the handle is marked errored and the exchange
//! ends with a decline.

/// Reading local files in canonical form.
pub mod canonical;
/// Moving finished content onto working files.
pub mod commit;
/// Connection-wide settings.
pub mod config;
/// Error taxonomy.
pub mod error;
/// `checkFile`, `move` and `delete`.
pub mod fs_ops;
/// Merge exchanges.
pub mod merge;
/// User-facing messages.
pub mod message;
/// Transfer exchanges and command output.
pub mod receiver;
/// Open exchanges by handle.
pub mod registry;
mod sender;
/// Dispatch and per-connection state.
pub mod session;
/// Handler effects.
pub mod step;
/// Scoped temp files.
pub mod temp_guard;

pub use canonical::{CanonicalReader, SEND_CHUNK_LEN, canonical_digest, matches_digest};
pub use config::EngineConfig;
pub use error::EngineError;
pub use fs_ops::{LocalType, infer_local_type};
pub use merge::{
    MergeCounts, MergeLabels, MergeState, ResolveChoice, ResolveMode, SelectorBits, auto_resolve,
};
pub use message::{ClientMessage, Severity};
pub use receiver::TransferState;
pub use registry::{HandlerRecord, HandlerRegistry, HandlerState};
pub use session::{ClientFunction, ProgressFn, Session};
pub use step::{Effect, Step};
pub use temp_guard::TempFileGuard;
