//! Line-ending conventions and streaming translators.
//!
//! Canonical (server) text always uses LF. Writing to disk converts LF to the
//! client's convention; reading local files converts back.

/// Line-ending convention for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineEnding {
    /// Whatever the client platform uses.
    #[default]
    Local,
    /// `\n`.
    Lf,
    /// `\r`.
    Cr,
    /// `\r\n`.
    CrLf,
    /// Written as LF; CRLF accepted and normalized on read.
    Share,
}

impl LineEnding {
    /// Decodes the line-type digit of a server file type string.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Local),
            1 => Some(Self::Lf),
            2 => Some(Self::Cr),
            3 => Some(Self::CrLf),
            4 => Some(Self::Share),
            _ => None,
        }
    }

    /// Parses a client-spec style name (`local`, `unix`, `mac`, `win`, `share`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "unix" | "lf" => Some(Self::Lf),
            "mac" | "cr" => Some(Self::Cr),
            "win" | "crlf" => Some(Self::CrLf),
            "share" => Some(Self::Share),
            _ => None,
        }
    }

    /// Replaces [`Local`](Self::Local) with the platform convention.
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Local => {
                if cfg!(windows) {
                    Self::CrLf
                } else {
                    Self::Lf
                }
            }
            other => other,
        }
    }

    /// Bytes written to disk for each canonical `\n`.
    #[must_use]
    pub const fn local_bytes(self) -> &'static [u8] {
        match self.effective() {
            Self::Cr => b"\r",
            Self::CrLf => b"\r\n",
            _ => b"\n",
        }
    }

    /// Whether content passes through unchanged in both directions.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self.effective(), Self::Lf)
    }
}

/// Canonical → local translator. Stateless: every `\n` expands independently.
#[derive(Clone, Copy, Debug)]
pub struct LineEndingEncoder {
    ending: LineEnding,
}

impl LineEndingEncoder {
    /// Creates an encoder for `ending`.
    #[must_use]
    pub const fn new(ending: LineEnding) -> Self {
        Self {
            ending: ending.effective(),
        }
    }

    /// Appends the translation of `input` to `out`.
    pub fn encode(&self, input: &[u8], out: &mut Vec<u8>) {
        let replacement = self.ending.local_bytes();
        if replacement == b"\n" {
            out.extend_from_slice(input);
            return;
        }
        out.reserve(input.len());
        for segment in input.split_inclusive(|&b| b == b'\n') {
            if let Some(body) = segment.strip_suffix(b"\n") {
                out.extend_from_slice(body);
                out.extend_from_slice(replacement);
            } else {
                out.extend_from_slice(segment);
            }
        }
    }
}

/// Local → canonical translator.
///
/// A `\r` at the end of one chunk may pair with a `\n` at the start of the
/// next, so CRLF-family decoders hold it back until more input or
/// [`finish`](Self::finish).
#[derive(Clone, Copy, Debug)]
pub struct LineEndingDecoder {
    ending: LineEnding,
    pending_cr: bool,
}

impl LineEndingDecoder {
    /// Creates a decoder for `ending`.
    #[must_use]
    pub const fn new(ending: LineEnding) -> Self {
        Self {
            ending: ending.effective(),
            pending_cr: false,
        }
    }

    /// Appends the canonical form of `input` to `out`.
    pub fn decode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        match self.ending {
            LineEnding::Cr => out.extend(input.iter().map(|&b| if b == b'\r' { b'\n' } else { b })),
            LineEnding::CrLf | LineEnding::Share => self.decode_crlf(input, out),
            _ => out.extend_from_slice(input),
        }
    }

    fn decode_crlf(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len());
        for &byte in input {
            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    out.push(b'\n');
                    continue;
                }
                out.push(b'\r');
            }
            if byte == b'\r' {
                self.pending_cr = true;
            } else {
                out.push(byte);
            }
        }
    }

    /// Flushes a held-back `\r`.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if std::mem::take(&mut self.pending_cr) {
            out.push(b'\r');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(ending: LineEnding, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        LineEndingEncoder::new(ending).encode(input, &mut out);
        out
    }

    fn decode_chunks(ending: LineEnding, chunks: &[&[u8]]) -> Vec<u8> {
        let mut decoder = LineEndingDecoder::new(ending);
        let mut out = Vec::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut out);
        }
        decoder.finish(&mut out);
        out
    }

    #[test]
    fn codes_map_to_conventions() {
        assert_eq!(LineEnding::from_code(0), Some(LineEnding::Local));
        assert_eq!(LineEnding::from_code(3), Some(LineEnding::CrLf));
        assert_eq!(LineEnding::from_code(4), Some(LineEnding::Share));
        assert_eq!(LineEnding::from_code(9), None);
        assert_eq!(LineEnding::from_name("WIN"), Some(LineEnding::CrLf));
    }

    #[test]
    fn encode_expands_each_newline() {
        assert_eq!(encode(LineEnding::CrLf, b"a\nb\n\nc"), b"a\r\nb\r\n\r\nc");
        assert_eq!(encode(LineEnding::Cr, b"a\nb"), b"a\rb");
        assert_eq!(encode(LineEnding::Lf, b"a\r\nb"), b"a\r\nb");
        assert_eq!(encode(LineEnding::Share, b"a\nb"), b"a\nb");
    }

    #[test]
    fn crlf_split_across_chunks_collapses() {
        let out = decode_chunks(LineEnding::CrLf, &[b"one\r", b"\ntwo\r", b"\r\n"]);
        assert_eq!(out, b"one\ntwo\r\n");
    }

    #[test]
    fn trailing_cr_is_flushed() {
        assert_eq!(decode_chunks(LineEnding::CrLf, &[b"x\r"]), b"x\r");
    }

    #[test]
    fn share_normalizes_windows_files() {
        assert_eq!(decode_chunks(LineEnding::Share, &[b"a\r\nb\n"]), b"a\nb\n");
    }

    #[test]
    fn cr_decoder_maps_every_cr() {
        assert_eq!(decode_chunks(LineEnding::Cr, &[b"a\rb\r"]), b"a\nb\n");
    }
}
