//! Character set conversion between canonical UTF-8 and a file's on-disk charset.
//!
//! Conversion is streaming: protocol chunks may end in the middle of a
//! multi-byte sequence, so encoders and decoders carry partial input between
//! calls and only report malformed data once the stream is finished.
//!
//! # Examples
//!
//! ```
//! use protocol::iconv::{Charset, CharsetDecoder, CharsetEncoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let latin1 = Charset::for_label("iso-8859-1").expect("known label");
//! let mut encoded = Vec::new();
//! let mut encoder = CharsetEncoder::new(latin1);
//! encoder.encode("caf\u{e9}".as_bytes(), &mut encoded)?;
//! encoder.finish(&mut encoded)?;
//! assert_eq!(encoded, b"caf\xe9");
//!
//! let mut decoded = Vec::new();
//! let mut decoder = CharsetDecoder::new(latin1);
//! decoder.decode(&encoded, &mut decoded)?;
//! decoder.finish(&mut decoded)?;
//! assert_eq!(decoded, "caf\u{e9}".as_bytes());
//! # Ok(())
//! # }
//! ```

use std::fmt;

use encoding_rs::{DecoderResult, Encoding, EncoderResult};

use crate::error::TransformError;

/// Byte order mark written in front of little-endian UTF-16 output.
pub const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];

/// Byte order mark written in front of big-endian UTF-16 output.
pub const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Byte order mark for UTF-8 files.
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A character set known to `encoding_rs`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
}

impl Default for Charset {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl Charset {
    /// UTF-8, the canonical transfer charset.
    pub const UTF_8: Self = Self {
        encoding: encoding_rs::UTF_8,
    };

    /// UTF-16 little endian.
    pub const UTF_16LE: Self = Self {
        encoding: encoding_rs::UTF_16LE,
    };

    /// UTF-16 big endian.
    pub const UTF_16BE: Self = Self {
        encoding: encoding_rs::UTF_16BE,
    };

    /// Looks up a charset by label.
    ///
    /// Accepts WHATWG labels plus the server's own spellings (`utf16`,
    /// `utf8`, `iso8859-1`, `winansi`, ...). `none`, `auto` and the empty
    /// string mean UTF-8.
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        let normalized = normalize_label(label);
        let encoding = match normalized.as_str() {
            "" | "none" | "auto" | "utf8" | "utf-8" | "utf8-bom" | "utf8unchecked" => {
                encoding_rs::UTF_8
            }
            "utf16" | "utf-16" | "utf16-nobom" | "utf16le" | "utf16le-bom" => {
                encoding_rs::UTF_16LE
            }
            "utf16be" | "utf16be-bom" => encoding_rs::UTF_16BE,
            "winansi" => encoding_rs::WINDOWS_1252,
            "iso8859-1" => encoding_rs::WINDOWS_1252,
            "iso8859-5" => encoding_rs::ISO_8859_5,
            "iso8859-15" => encoding_rs::ISO_8859_15,
            "shiftjis" => encoding_rs::SHIFT_JIS,
            "eucjp" => encoding_rs::EUC_JP,
            "cp949" => encoding_rs::EUC_KR,
            "cp936" => encoding_rs::GBK,
            "cp950" => encoding_rs::BIG5,
            "koi8-r" => encoding_rs::KOI8_R,
            other => Encoding::for_label(other.as_bytes())?,
        };
        Some(Self { encoding })
    }

    /// Canonical name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Whether this is UTF-8 (conversion is the identity).
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        self.encoding == encoding_rs::UTF_8
    }

    /// Whether this is a UTF-16 flavour.
    #[must_use]
    pub fn is_utf16(&self) -> bool {
        self.encoding == encoding_rs::UTF_16LE || self.encoding == encoding_rs::UTF_16BE
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().to_ascii_lowercase().replace('_', "-")
}

/// Streaming UTF-8 → charset encoder.
pub struct CharsetEncoder {
    charset: Charset,
    encoder: Option<encoding_rs::Encoder>,
    pending: Vec<u8>,
    wrote_bom: bool,
}

impl fmt::Debug for CharsetEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharsetEncoder")
            .field("charset", &self.charset)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl CharsetEncoder {
    /// Creates an encoder targeting `charset`. UTF-16 output starts with a BOM.
    #[must_use]
    pub fn new(charset: Charset) -> Self {
        let encoder = if charset.is_utf8() || charset.is_utf16() {
            None
        } else {
            Some(charset.encoding.new_encoder())
        };
        Self {
            charset,
            encoder,
            pending: Vec::new(),
            wrote_bom: false,
        }
    }

    /// Converts `input` (UTF-8, possibly ending mid-sequence) into `out`.
    pub fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), TransformError> {
        if self.charset.is_utf8() {
            out.extend_from_slice(input);
            return Ok(());
        }

        self.pending.extend_from_slice(input);
        let valid_len = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => return Err(TransformError::Malformed { charset: "UTF-8" }),
        };
        let tail = self.pending.split_off(valid_len);
        let text = std::mem::replace(&mut self.pending, tail);
        let text = std::str::from_utf8(&text)
            .map_err(|_| TransformError::Malformed { charset: "UTF-8" })?;
        self.encode_str(text, out, false)
    }

    /// Flushes buffered state; an incomplete trailing sequence is an error.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), TransformError> {
        if self.charset.is_utf8() {
            return Ok(());
        }
        if !self.pending.is_empty() {
            return Err(TransformError::Malformed { charset: "UTF-8" });
        }
        self.encode_str("", out, true)
    }

    fn encode_str(
        &mut self,
        text: &str,
        out: &mut Vec<u8>,
        last: bool,
    ) -> Result<(), TransformError> {
        let name = self.charset.name();
        if self.charset.is_utf16() {
            let big_endian = self.charset == Charset::UTF_16BE;
            if !self.wrote_bom && (!text.is_empty() || last) {
                out.extend_from_slice(if big_endian { UTF16BE_BOM } else { UTF16LE_BOM });
                self.wrote_bom = true;
            }
            for unit in text.encode_utf16() {
                let bytes = if big_endian {
                    unit.to_be_bytes()
                } else {
                    unit.to_le_bytes()
                };
                out.extend_from_slice(&bytes);
            }
            return Ok(());
        }

        let Some(encoder) = self.encoder.as_mut() else {
            out.extend_from_slice(text.as_bytes());
            return Ok(());
        };
        let mut remaining = text;
        loop {
            let needed = encoder
                .max_buffer_length_from_utf8_without_replacement(remaining.len())
                .unwrap_or(remaining.len() * 4 + 16);
            out.reserve(needed);
            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(remaining, out, last);
            remaining = &remaining[read..];
            match result {
                EncoderResult::InputEmpty => return Ok(()),
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(_) => {
                    return Err(TransformError::Unmappable { charset: name });
                }
            }
        }
    }
}

/// Streaming charset → UTF-8 decoder.
pub struct CharsetDecoder {
    charset: Charset,
    decoder: Option<encoding_rs::Decoder>,
}

impl fmt::Debug for CharsetDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharsetDecoder")
            .field("charset", &self.charset)
            .finish_non_exhaustive()
    }
}

impl CharsetDecoder {
    /// Creates a decoder reading `charset`. A leading BOM is consumed and,
    /// for UTF-16, selects the byte order.
    #[must_use]
    pub fn new(charset: Charset) -> Self {
        let decoder = if charset.is_utf8() {
            None
        } else {
            Some(charset.encoding.new_decoder())
        };
        Self { charset, decoder }
    }

    /// Converts `input` into UTF-8 appended to `out`.
    pub fn decode(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), TransformError> {
        self.run(input, out, false)
    }

    /// Flushes buffered state; a truncated trailing sequence is an error.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), TransformError> {
        self.run(&[], out, true)
    }

    fn run(&mut self, input: &[u8], out: &mut Vec<u8>, last: bool) -> Result<(), TransformError> {
        let name = self.charset.name();
        let Some(decoder) = self.decoder.as_mut() else {
            out.extend_from_slice(input);
            return Ok(());
        };

        let mut text = String::new();
        let mut remaining = input;
        loop {
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(remaining.len())
                .unwrap_or(remaining.len() * 3 + 16);
            text.reserve(needed);
            let (result, read) =
                decoder.decode_to_string_without_replacement(remaining, &mut text, last);
            remaining = &remaining[read..];
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(_, _) => {
                    return Err(TransformError::Malformed { charset: name });
                }
            }
        }
        out.extend_from_slice(text.as_bytes());
        Ok(())
    }
}
