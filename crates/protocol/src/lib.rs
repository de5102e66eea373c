#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! Values exchanged with the server and the content transforms they select.
//!
//! Incoming function calls carry an [`ArgMap`] of text, byte and integer
//! values. Reply names are never fixed: each call names the function to
//! answer in one of its arguments, carried here as [`ReplyTarget`]. The
//! server's hex file-type string decodes into a [`FileTypeSpec`], which in
//! turn selects the [`Transform`] between canonical (UTF-8, LF) and local
//! file content.
//!
//! # Examples
//!
//! ```
//! use protocol::{ArgMap, FileTypeSpec, Transform, TransformOptions, keys};
//!
//! let args = ArgMap::new().with(keys::TYPE, "1800").with(keys::PATH, "/ws/a.txt");
//! let spec = FileTypeSpec::decode(args.str(keys::TYPE)).unwrap();
//! assert_eq!(spec.name(), "utf16");
//!
//! let transform = Transform::for_file(&spec, &TransformOptions::default());
//! assert!(!transform.is_identity());
//! ```

mod args;
mod error;
mod filetype;
pub mod iconv;
mod line_ending;
mod reply;
mod transform;

pub use args::{ArgMap, ArgValue, FunctionCall, keys};
pub use error::{ProtocolError, TransformError, TransportError};
pub use filetype::{BaseType, CharsetKind, FileTypeSpec};
pub use iconv::Charset;
pub use line_ending::{LineEnding, LineEndingDecoder, LineEndingEncoder};
pub use reply::{OutboundCall, ReplySink, ReplyTarget};
pub use transform::{ContentDecoder, ContentEncoder, Transform, TransformOptions, Utf8BomPolicy};
