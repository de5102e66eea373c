//! Error types for argument decoding, content transforms and transport.

use std::io;

use thiserror::Error;

/// Errors raised while decoding function-call arguments.
///
/// These are fatal for the exchange: the engine cannot guess at the meaning
/// of a malformed numeric or enumerated field, so it never silently
/// substitutes a default.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ProtocolError {
    /// A required key was absent from the argument map.
    #[error("missing required argument '{key}'")]
    MissingArgument {
        /// The missing key.
        key: String,
    },

    /// A field was present but could not be decoded.
    #[error("malformed argument '{key}'={value:?}: expected {expected}")]
    Decode {
        /// Key of the offending field.
        key: String,
        /// The raw value as received (lossy UTF-8 for byte values).
        value: String,
        /// What the decoder expected to find.
        expected: &'static str,
    },
}

impl ProtocolError {
    /// Creates a [`ProtocolError::MissingArgument`].
    #[must_use]
    pub fn missing(key: &str) -> Self {
        Self::MissingArgument {
            key: key.to_owned(),
        }
    }

    /// Creates a [`ProtocolError::Decode`].
    #[must_use]
    pub fn decode(key: &str, value: impl Into<String>, expected: &'static str) -> Self {
        Self::Decode {
            key: key.to_owned(),
            value: value.into(),
            expected,
        }
    }
}

/// Errors raised by the content transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Input bytes are not valid in the source charset.
    #[error("invalid {charset} input")]
    Malformed {
        /// Name of the charset being decoded.
        charset: &'static str,
    },

    /// A character cannot be represented in the target charset.
    #[error("character not representable in {charset}")]
    Unmappable {
        /// Name of the charset being encoded.
        charset: &'static str,
    },

    /// The gzip layer rejected the stream.
    #[error("gzip inflate failed: {0}")]
    Inflate(#[source] io::Error),
}

/// Failure reported by the transport when delivering an outbound call.
#[derive(Debug, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(#[from] pub io::Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_key_and_value() {
        let err = ProtocolError::decode("bits", "x1", "a decimal integer");
        let text = err.to_string();
        assert!(text.contains("'bits'"), "{text}");
        assert!(text.contains("\"x1\""), "{text}");
    }

    #[test]
    fn missing_argument_display() {
        assert_eq!(
            ProtocolError::missing("path").to_string(),
            "missing required argument 'path'"
        );
    }
}
