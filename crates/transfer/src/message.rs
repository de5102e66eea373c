//! Messages reported to the command layer.

use std::fmt;

use crate::error::EngineError;

/// How serious a message is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational; the operation continued.
    Info,
    /// Something was skipped or degraded.
    Warning,
    /// The operation on one file failed.
    Failed,
}

/// A message for the user, produced alongside or instead of a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientMessage {
    severity: Severity,
    code: &'static str,
    text: String,
}

impl ClientMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(severity: Severity, code: &'static str, text: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            text: text.into(),
        }
    }

    /// Informational message.
    #[must_use]
    pub fn info(code: &'static str, text: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, text)
    }

    /// Warning message.
    #[must_use]
    pub fn warning(code: &'static str, text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, text)
    }

    /// Failure message describing `error`.
    #[must_use]
    pub fn from_error(error: &EngineError) -> Self {
        Self::new(Severity::Failed, error.code(), error.to_string())
    }

    /// Severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Stable identifier.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Human-readable text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the message reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Failed
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
