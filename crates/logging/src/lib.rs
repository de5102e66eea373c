#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` gives every engine subsystem its own tracing target and a
//! single configuration type controlling how verbose each one is.
//!
//! # Design
//!
//! - [`Subsystem`] names the targets (`client::transfer`, `client::merge`,
//!   `client::send`, `client::fs`, `client::protocol`).
//! - The `trace_*!` macros emit under those targets so call sites never spell
//!   a target string by hand.
//! - [`VerbosityConfig`] turns a `-v` count plus per-subsystem overrides into
//!   `EnvFilter` directives; [`init_tracing`] installs a fmt subscriber.
//!
//! # Examples
//!
//! ```
//! use logging::{Subsystem, VerbosityConfig};
//!
//! let mut config = VerbosityConfig::from_verbose_level(1);
//! config.set(Subsystem::Merge, 3);
//! assert!(config.directives().contains("client::merge=trace"));
//! ```

mod config;
mod levels;
mod tracing_bridge;
mod tracing_macros;

pub use config::VerbosityConfig;
pub use levels::{Subsystem, level_filter};
pub use tracing_bridge::{InitError, LOG_ENV_VAR, build_filter, init_tracing, try_init_tracing};

#[doc(hidden)]
pub use tracing;
