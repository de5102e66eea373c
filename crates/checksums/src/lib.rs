#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Content digests for the client file engine. Every file the engine writes,
//! merges or sends is identified by the MD5 of its canonical content, rendered
//! as 32 upper-case hex characters.
//!
//! # Design
//!
//! - [`strong::Md5`] wraps the `md-5` crate behind a small streaming API.
//! - [`DigestAccumulator`] is the incremental hasher the state machines hold
//!   while content streams through them.
//! - [`ContentDigest`] is the finished value with hex rendering and
//!   case-insensitive comparison against peer-supplied strings.
//!
//! # Invariants
//!
//! Feeding the same bytes split at any chunk boundaries yields the same
//! digest as hashing the concatenation in one call.

mod accumulator;
mod content;
pub mod strong;

pub use accumulator::{DIGEST_BUFFER_LEN, DigestAccumulator, digest_file, digest_reader};
pub use content::{ContentDigest, DIGEST_HEX_LEN, DigestParseError};
