//! crates/logging/src/tracing_macros.rs
//! Convenience macros for engine-specific tracing.
//!
//! These macros wrap the standard tracing macros with the target of one
//! engine subsystem so filters configured through
//! [`VerbosityConfig`](crate::VerbosityConfig) apply to them.

/// Emit a file-transfer trace.
///
/// # Example
/// ```ignore
/// trace_transfer!("opened {} indirect={}", path.display(), indirect);
/// ```
#[macro_export]
macro_rules! trace_transfer {
    ($($arg:tt)*) => {
        $crate::tracing::debug!(target: "client::transfer", $($arg)*);
    };
}

/// Emit a merge-engine trace.
///
/// # Example
/// ```ignore
/// trace_merge!("chunk bits={:#x} len={}", bits, data.len());
/// ```
#[macro_export]
macro_rules! trace_merge {
    ($($arg:tt)*) => {
        $crate::tracing::debug!(target: "client::merge", $($arg)*);
    };
}

/// Emit a send-engine trace.
///
/// # Example
/// ```ignore
/// trace_send!("sent chunk {} of {}", index, path.display());
/// ```
#[macro_export]
macro_rules! trace_send {
    ($($arg:tt)*) => {
        $crate::tracing::debug!(target: "client::send", $($arg)*);
    };
}

/// Emit a filesystem-command trace.
///
/// # Example
/// ```ignore
/// trace_fs!("deleted {}", path.display());
/// ```
#[macro_export]
macro_rules! trace_fs {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "client::fs", $($arg)*);
    };
}

/// Emit a protocol debug trace.
///
/// # Example
/// ```ignore
/// trace_proto!("reply {} with {} args", name, count);
/// ```
#[macro_export]
macro_rules! trace_proto {
    ($($arg:tt)*) => {
        $crate::tracing::trace!(target: "client::protocol", $($arg)*);
    };
}

/// Emit a warning attributed to a subsystem target.
///
/// Used for secondary failures (cleanup, permission restore) that are logged
/// instead of propagated.
///
/// # Example
/// ```ignore
/// warn_cleanup!("client::transfer", "could not remove {}: {}", path.display(), err);
/// ```
#[macro_export]
macro_rules! warn_cleanup {
    ($target:literal, $($arg:tt)*) => {
        $crate::tracing::warn!(target: $target, $($arg)*);
    };
}
