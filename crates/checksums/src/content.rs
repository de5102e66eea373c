//! Fixed-width content digest values and their hex wire form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of hex characters in a rendered digest.
pub const DIGEST_HEX_LEN: usize = 32;

/// A finished 128-bit content digest.
///
/// The protocol transmits digests as 32 upper-case hex characters. Parsing is
/// case-insensitive so values echoed by older servers in lower case still
/// compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentDigest([u8; 16]);

/// Error returned when a digest string is not 32 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed digest {value:?}: expected {DIGEST_HEX_LEN} hex characters")]
pub struct DigestParseError {
    /// The rejected input.
    pub value: String,
}

impl ContentDigest {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Renders the digest as 32 upper-case hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Compares against a hex string received from the peer.
    ///
    /// Malformed strings never match.
    #[must_use]
    pub fn matches_hex(&self, hex: &str) -> bool {
        hex.parse::<Self>().is_ok_and(|other| other == *self)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({self})")
    }
}

impl FromStr for ContentDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DigestParseError {
            value: s.to_owned(),
        };
        let bytes = s.as_bytes();
        if bytes.len() != DIGEST_HEX_LEN {
            return Err(malformed());
        }

        let mut out = [0_u8; 16];
        for (slot, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
            let hi = hex_value(pair[0]).ok_or_else(malformed)?;
            let lo = hex_value(pair[1]).ok_or_else(malformed)?;
            *slot = (hi << 4) | lo;
        }
        Ok(Self(out))
    }
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
