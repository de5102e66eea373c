//! Composed byte-stream transform between canonical and local file content.
//!
//! Canonical content is what the server stores: UTF-8 with LF line endings.
//! Local content is what lands on disk. [`Transform`] is the per-file plan;
//! [`ContentEncoder`] (canonical → local) and [`ContentDecoder`]
//! (local → canonical) are the streaming halves built from it.
//!
//! Encoding runs the stages in this order:
//!
//! 1. gzip inflate (gunzip types only)
//! 2. LF → local line ending (text-class types)
//! 3. UTF-8 → target charset
//! 4. byte order mark prefix (utf8 types, per [`Utf8BomPolicy`])
//!
//! Decoding undoes stages 4, 3 and 2. Only utf8 types lose a leading BOM on
//! decode; other text keeps every byte. Gzip content is never re-compressed.

use std::io::Write;

use flate2::write::GzDecoder;

use crate::error::TransformError;
use crate::filetype::{BaseType, CharsetKind, FileTypeSpec};
use crate::iconv::{Charset, CharsetDecoder, CharsetEncoder, UTF8_BOM};
use crate::line_ending::{LineEnding, LineEndingDecoder, LineEndingEncoder};

/// When utf8 files get a byte order mark on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Utf8BomPolicy {
    /// Never write a BOM.
    Never,
    /// Always write a BOM.
    #[default]
    Always,
    /// Write a BOM only on Windows clients.
    WindowsOnly,
}

impl Utf8BomPolicy {
    /// Whether a BOM is written on this platform.
    #[must_use]
    pub const fn writes_bom(self) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::WindowsOnly => cfg!(windows),
        }
    }
}

/// Connection-wide inputs to transform selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Charset of the client machine, used for unicode-class files.
    pub client_charset: Charset,
    /// Whether the server runs in unicode mode.
    pub unicode_server: bool,
    /// BOM policy for utf8 files.
    pub utf8_bom: Utf8BomPolicy,
}

/// Transform plan for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transform {
    line_ending: LineEnding,
    charset: Charset,
    bom: bool,
    strip_bom: bool,
    gunzip: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Plan that passes bytes through unchanged.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            line_ending: LineEnding::Lf,
            charset: Charset::UTF_8,
            bom: false,
            strip_bom: false,
            gunzip: false,
        }
    }

    /// Plan for a file of the given type.
    ///
    /// # Examples
    ///
    /// ```
    /// use protocol::{FileTypeSpec, Transform, TransformOptions};
    ///
    /// let spec = FileTypeSpec::decode(Some("03")).unwrap();
    /// let transform = Transform::for_file(&spec, &TransformOptions::default());
    /// assert_eq!(transform.encode_all(b"a\nb\n").unwrap(), b"a\r\nb\r\n");
    /// assert_eq!(transform.decode_all(b"a\r\nb\r\n").unwrap(), b"a\nb\n");
    /// ```
    #[must_use]
    pub fn for_file(spec: &FileTypeSpec, options: &TransformOptions) -> Self {
        let line_ending = if spec.translates_line_endings() {
            spec.line_ending()
        } else {
            LineEnding::Lf
        };
        let (charset, bom) = match spec.charset_kind() {
            CharsetKind::None => (Charset::UTF_8, false),
            CharsetKind::Client if options.unicode_server => (options.client_charset, false),
            CharsetKind::Client => (Charset::UTF_8, false),
            CharsetKind::Utf16 => (Charset::UTF_16LE, false),
            CharsetKind::Utf8 => (Charset::UTF_8, options.utf8_bom.writes_bom()),
        };
        Self {
            line_ending,
            charset,
            bom,
            strip_bom: spec.charset_kind() == CharsetKind::Utf8,
            gunzip: spec.base() == BaseType::Gunzip,
        }
    }

    /// Plan for text written to a command output stream.
    #[must_use]
    pub fn for_text(line_ending: LineEnding, options: &TransformOptions) -> Self {
        let charset = if options.unicode_server {
            options.client_charset
        } else {
            Charset::UTF_8
        };
        Self {
            line_ending,
            charset,
            bom: false,
            strip_bom: false,
            gunzip: false,
        }
    }

    /// Whether both directions pass bytes through unchanged.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.line_ending.is_identity()
            && self.charset.is_utf8()
            && !self.bom
            && !self.strip_bom
            && !self.gunzip
    }

    /// Target charset.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Canonical → local streaming encoder.
    #[must_use]
    pub fn encoder(&self) -> ContentEncoder {
        ContentEncoder {
            inflate: self.gunzip.then(|| GzDecoder::new(Vec::new())),
            lines: LineEndingEncoder::new(self.line_ending),
            charset: CharsetEncoder::new(self.charset),
            bom_pending: self.bom,
            scratch: Vec::new(),
        }
    }

    /// Local → canonical streaming decoder.
    #[must_use]
    pub fn decoder(&self) -> ContentDecoder {
        ContentDecoder {
            bom_probe: self.strip_bom.then(Vec::new),
            charset: CharsetDecoder::new(self.charset),
            lines: LineEndingDecoder::new(self.line_ending),
            scratch: Vec::new(),
        }
    }

    /// Encodes a complete buffer.
    pub fn encode_all(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let mut encoder = self.encoder();
        let mut out = Vec::with_capacity(input.len());
        encoder.encode(input, &mut out)?;
        encoder.finish(&mut out)?;
        Ok(out)
    }

    /// Decodes a complete buffer.
    pub fn decode_all(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let mut decoder = self.decoder();
        let mut out = Vec::with_capacity(input.len());
        decoder.decode(input, &mut out)?;
        decoder.finish(&mut out)?;
        Ok(out)
    }
}

/// Streaming canonical → local converter.
pub struct ContentEncoder {
    inflate: Option<GzDecoder<Vec<u8>>>,
    lines: LineEndingEncoder,
    charset: CharsetEncoder,
    bom_pending: bool,
    scratch: Vec<u8>,
}

impl std::fmt::Debug for ContentEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentEncoder")
            .field("gunzip", &self.inflate.is_some())
            .field("lines", &self.lines)
            .field("charset", &self.charset)
            .finish_non_exhaustive()
    }
}

impl ContentEncoder {
    /// Appends the local form of `input` to `out`.
    pub fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), TransformError> {
        if let Some(inflate) = self.inflate.as_mut() {
            inflate.write_all(input).map_err(TransformError::Inflate)?;
            let inflated = std::mem::take(inflate.get_mut());
            out.extend_from_slice(&inflated);
            return Ok(());
        }
        if input.is_empty() {
            return Ok(());
        }
        self.emit_bom(out);
        self.scratch.clear();
        self.lines.encode(input, &mut self.scratch);
        self.charset.encode(&self.scratch, out)
    }

    /// Flushes carried state. Must be called once after the last chunk.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), TransformError> {
        if let Some(inflate) = self.inflate.as_mut() {
            inflate.try_finish().map_err(TransformError::Inflate)?;
            let inflated = std::mem::take(inflate.get_mut());
            out.extend_from_slice(&inflated);
            return Ok(());
        }
        self.emit_bom(out);
        self.charset.finish(out)
    }

    fn emit_bom(&mut self, out: &mut Vec<u8>) {
        if std::mem::take(&mut self.bom_pending) {
            out.extend_from_slice(UTF8_BOM);
        }
    }
}

/// Streaming local → canonical converter.
pub struct ContentDecoder {
    bom_probe: Option<Vec<u8>>,
    charset: CharsetDecoder,
    lines: LineEndingDecoder,
    scratch: Vec<u8>,
}

impl std::fmt::Debug for ContentDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentDecoder")
            .field("charset", &self.charset)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl ContentDecoder {
    /// Appends the canonical form of `input` to `out`.
    pub fn decode(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), TransformError> {
        // A utf8 file's BOM is dropped; it may arrive split across chunks.
        if let Some(probe) = self.bom_probe.as_mut() {
            let take = (UTF8_BOM.len() - probe.len()).min(input.len());
            probe.extend_from_slice(&input[..take]);
            if probe.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(probe) {
                return Ok(());
            }
            let head = self.bom_probe.take().unwrap_or_default();
            if head != UTF8_BOM {
                self.decode_body(&head, out)?;
            }
            return self.decode_body(&input[take..], out);
        }
        self.decode_body(input, out)
    }

    /// Flushes carried state. Must be called once after the last chunk.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), TransformError> {
        if let Some(head) = self.bom_probe.take() {
            self.decode_body(&head, out)?;
        }
        self.scratch.clear();
        self.charset.finish(&mut self.scratch)?;
        self.lines.decode(&self.scratch, out);
        self.lines.finish(out);
        Ok(())
    }

    fn decode_body(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), TransformError> {
        if input.is_empty() {
            return Ok(());
        }
        self.scratch.clear();
        self.charset.decode(input, &mut self.scratch)?;
        self.lines.decode(&self.scratch, out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(code: &str) -> FileTypeSpec {
        FileTypeSpec::decode(Some(code)).expect("valid type")
    }

    fn plan(code: &str) -> Transform {
        Transform::for_file(&spec(code), &TransformOptions::default())
    }

    #[test]
    fn binary_is_identity() {
        let transform = plan("1");
        assert!(transform.is_identity());
        let bytes = b"\x00\r\n\xff";
        assert_eq!(transform.encode_all(bytes).expect("encode"), bytes);
    }

    #[test]
    fn raw_text_keeps_line_endings() {
        let transform = Transform::for_file(
            &spec("9").with_line_ending(LineEnding::CrLf),
            &TransformOptions::default(),
        );
        assert_eq!(transform.encode_all(b"a\n").expect("encode"), b"a\n");
    }

    #[test]
    fn utf16_text_gets_bom_and_crlf() {
        let transform = plan("1830");
        let local = transform.encode_all(b"hi\n").expect("encode");
        assert_eq!(local, [0xFF, 0xFE, b'h', 0, b'i', 0, b'\r', 0, b'\n', 0]);
        assert_eq!(transform.decode_all(&local).expect("decode"), b"hi\n");
    }

    #[test]
    fn utf8_bom_follows_policy() {
        let with = plan("1410");
        assert_eq!(with.encode_all(b"x").expect("encode"), b"\xEF\xBB\xBFx");

        let options = TransformOptions {
            utf8_bom: Utf8BomPolicy::Never,
            ..TransformOptions::default()
        };
        let without = Transform::for_file(&spec("1410"), &options);
        assert_eq!(without.encode_all(b"x").expect("encode"), b"x");
    }

    #[test]
    fn utf8_bom_stripped_across_chunks() {
        let transform = plan("1410");
        let mut decoder = transform.decoder();
        let mut out = Vec::new();
        decoder.decode(b"\xEF", &mut out).expect("decode");
        decoder.decode(b"\xBB\xBFok", &mut out).expect("decode");
        decoder.finish(&mut out).expect("finish");
        assert_eq!(out, b"ok");
    }

    #[test]
    fn short_utf8_file_without_bom_survives() {
        let transform = plan("1410");
        assert_eq!(transform.decode_all(b"\xEF\xBB").expect("decode"), b"\xEF\xBB");
        assert_eq!(transform.decode_all(b"a").expect("decode"), b"a");
    }

    #[test]
    fn unicode_uses_client_charset_only_on_unicode_servers() {
        let latin1 = Charset::for_label("latin1").expect("latin1");
        let mut options = TransformOptions {
            client_charset: latin1,
            unicode_server: false,
            utf8_bom: Utf8BomPolicy::Never,
        };
        let text = "\u{e9}\n".as_bytes();
        let plain = Transform::for_file(&spec("81"), &options);
        assert_eq!(plain.encode_all(text).expect("encode"), text);

        options.unicode_server = true;
        let converted = Transform::for_file(&spec("81"), &options);
        assert_eq!(converted.encode_all(text).expect("encode"), b"\xe9\n");
    }

    #[test]
    fn gunzip_inflates_in_chunks() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(b"compressed payload\n").expect("gzip");
        let packed = gz.finish().expect("gzip");

        let transform = plan("101");
        let mut encoder = transform.encoder();
        let mut out = Vec::new();
        for chunk in packed.chunks(5) {
            encoder.encode(chunk, &mut out).expect("inflate");
        }
        encoder.finish(&mut out).expect("finish");
        assert_eq!(out, b"compressed payload\n");
    }

    #[test]
    fn corrupt_gzip_is_an_inflate_error() {
        let err = plan("101")
            .encode_all(b"definitely not gzip")
            .expect_err("bad header");
        assert!(matches!(err, TransformError::Inflate(_)));
    }
}
