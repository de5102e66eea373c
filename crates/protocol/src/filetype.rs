//! Server file type strings.
//!
//! The server sends a file's type as a short hex string laid out as
//! `fileType [lineType [uncompress]]`. Legacy servers use one hex digit for
//! the file type; four-character strings carry a two-digit file type so the
//! utf8/utf16 codes (`0x14`..`0x1A`) are reachable.

use crate::args::keys;
use crate::error::ProtocolError;
use crate::line_ending::LineEnding;

/// Storage class of a file, independent of the executable modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseType {
    /// Text with line-ending translation.
    Text,
    /// Opaque bytes.
    Binary,
    /// Symbolic link; content is the link target.
    Symlink,
    /// Classic Mac OS resource fork.
    Resource,
    /// Text transcoded to the client charset on unicode servers.
    Unicode,
    /// Text written without line-ending translation.
    RawText,
    /// AppleSingle-wrapped text.
    AppleText,
    /// AppleSingle-wrapped data and resource forks.
    AppleFile,
    /// UTF-8 text, optionally with a byte order mark.
    Utf8,
    /// UTF-16 text.
    Utf16,
    /// Content stored gzip-compressed on the wire.
    Gunzip,
}

/// Charset handling a base type requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharsetKind {
    /// Bytes are written as received.
    None,
    /// Canonical UTF-8 is converted to the client charset on unicode servers.
    Client,
    /// Canonical UTF-8 is converted to UTF-16.
    Utf16,
    /// UTF-8 with the configured byte-order-mark policy.
    Utf8,
}

/// Decoded server file type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileTypeSpec {
    base: BaseType,
    executable: bool,
    line_ending: LineEnding,
}

impl Default for FileTypeSpec {
    fn default() -> Self {
        Self::new(BaseType::Text, false)
    }
}

impl FileTypeSpec {
    /// Builds a spec with the local line-ending convention.
    #[must_use]
    pub const fn new(base: BaseType, executable: bool) -> Self {
        Self {
            base,
            executable,
            line_ending: LineEnding::Local,
        }
    }

    /// Replaces the line-ending convention.
    #[must_use]
    pub const fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Decodes the `type` argument; an absent value means plain text.
    ///
    /// # Examples
    ///
    /// ```
    /// use protocol::{BaseType, FileTypeSpec, LineEnding};
    ///
    /// let spec = FileTypeSpec::decode(Some("23")).unwrap();
    /// assert_eq!(spec.base(), BaseType::Text);
    /// assert!(spec.is_executable());
    /// assert_eq!(spec.line_ending(), LineEnding::CrLf);
    /// ```
    pub fn decode(value: Option<&str>) -> Result<Self, ProtocolError> {
        Self::decode_field(keys::TYPE, value)
    }

    /// Like [`decode`](Self::decode), naming `key` in errors.
    pub fn decode_field(key: &str, value: Option<&str>) -> Result<Self, ProtocolError> {
        let Some(text) = value else {
            return Ok(Self::default());
        };

        let digits: Vec<u8> = text
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(|| ProtocolError::decode(key, text, "a hex file type"))?;

        let (tf, tl, tu) = match digits.as_slice() {
            [] => (0, 0, 0),
            [f] => (*f, 0, 0),
            [f, l] => (*f, *l, 0),
            [f, l, u] => (*f, *l, *u),
            [hi, lo, l, u] => ((*hi << 4) | *lo, *l, *u),
            _ => return Err(ProtocolError::decode(key, text, "at most four hex digits")),
        };

        let (base, executable) = match (u16::from(tu) << 8) | u16::from(tf) {
            0x000 => (BaseType::Text, false),
            0x001 => (BaseType::Binary, false),
            0x002 => (BaseType::Text, true),
            0x003 => (BaseType::Binary, true),
            0x004 | 0x006 => (BaseType::Symlink, false),
            0x005 | 0x007 => (BaseType::Resource, false),
            0x008 => (BaseType::Unicode, false),
            0x009 => (BaseType::RawText, false),
            0x00A => (BaseType::Unicode, true),
            0x00B => (BaseType::RawText, true),
            0x00C | 0x00E => (BaseType::AppleText, false),
            0x00D => (BaseType::AppleFile, false),
            0x00F => (BaseType::AppleFile, true),
            0x014 => (BaseType::Utf8, false),
            0x016 => (BaseType::Utf8, true),
            0x018 => (BaseType::Utf16, false),
            0x01A => (BaseType::Utf16, true),
            0x101 => (BaseType::Gunzip, false),
            0x103 => (BaseType::Gunzip, true),
            _ => (BaseType::Binary, false),
        };

        let line_ending = LineEnding::from_code(tl).unwrap_or_default();
        Ok(Self {
            base,
            executable,
            line_ending,
        })
    }

    /// Storage class.
    #[must_use]
    pub const fn base(&self) -> BaseType {
        self.base
    }

    /// Whether the file gets the executable bit.
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        self.executable
    }

    /// Declared line-ending convention.
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Whether this is a symbolic link.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.base, BaseType::Symlink)
    }

    /// Whether line endings are translated for this type.
    #[must_use]
    pub const fn translates_line_endings(&self) -> bool {
        matches!(
            self.base,
            BaseType::Text | BaseType::Unicode | BaseType::Utf8 | BaseType::Utf16
        )
    }

    /// Charset handling for this type.
    #[must_use]
    pub const fn charset_kind(&self) -> CharsetKind {
        match self.base {
            BaseType::Unicode => CharsetKind::Client,
            BaseType::Utf16 => CharsetKind::Utf16,
            BaseType::Utf8 => CharsetKind::Utf8,
            _ => CharsetKind::None,
        }
    }

    /// Whether the engine can materialize this type. Resource forks and
    /// AppleSingle containers need platform support this engine lacks.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        !matches!(
            self.base,
            BaseType::Resource | BaseType::AppleText | BaseType::AppleFile
        )
    }

    /// Short human-readable name used in messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match (self.base, self.executable) {
            (BaseType::Text, false) => "text",
            (BaseType::Text, true) => "xtext",
            (BaseType::Binary, false) => "binary",
            (BaseType::Binary, true) => "xbinary",
            (BaseType::Symlink, _) => "symlink",
            (BaseType::Resource, _) => "resource",
            (BaseType::Unicode, false) => "unicode",
            (BaseType::Unicode, true) => "xunicode",
            (BaseType::RawText, false) => "rtext",
            (BaseType::RawText, true) => "xrtext",
            (BaseType::AppleText, _) => "appletext",
            (BaseType::AppleFile, false) => "apple",
            (BaseType::AppleFile, true) => "apple+x",
            (BaseType::Utf8, false) => "utf8",
            (BaseType::Utf8, true) => "xutf8",
            (BaseType::Utf16, false) => "utf16",
            (BaseType::Utf16, true) => "xutf16",
            (BaseType::Gunzip, false) => "gunzip",
            (BaseType::Gunzip, true) => "xgunzip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str) -> FileTypeSpec {
        FileTypeSpec::decode(Some(s)).expect("valid type")
    }

    #[test]
    fn absent_type_is_text() {
        let spec = FileTypeSpec::decode(None).expect("absent type");
        assert_eq!(spec.base(), BaseType::Text);
        assert!(!spec.is_executable());
        assert_eq!(spec.line_ending(), LineEnding::Local);
    }

    #[test]
    fn legacy_single_digit_codes() {
        assert_eq!(decode("0").base(), BaseType::Text);
        assert_eq!(decode("1").base(), BaseType::Binary);
        assert!(decode("2").is_executable());
        assert!(decode("3").is_executable());
        assert!(decode("4").is_symlink());
        assert_eq!(decode("8").charset_kind(), CharsetKind::Client);
        assert_eq!(decode("9").base(), BaseType::RawText);
        assert!(!decode("9").translates_line_endings());
        assert!(decode("F").is_executable());
    }

    #[test]
    fn uncompress_digit_selects_gunzip() {
        assert_eq!(decode("101").base(), BaseType::Gunzip);
        assert_eq!(decode("301").base(), BaseType::Gunzip);
        assert!(decode("301").is_executable());
        // Unknown combination falls back to binary.
        assert_eq!(decode("102").base(), BaseType::Binary);
    }

    #[test]
    fn four_digit_codes_reach_utf_types() {
        assert_eq!(decode("1400").base(), BaseType::Utf8);
        assert!(decode("1600").is_executable());
        assert_eq!(decode("1830").charset_kind(), CharsetKind::Utf16);
        assert_eq!(decode("1830").line_ending(), LineEnding::CrLf);
        assert!(decode("1A00").is_executable());
    }

    #[test]
    fn line_type_digit() {
        assert_eq!(decode("01").line_ending(), LineEnding::Lf);
        assert_eq!(decode("02").line_ending(), LineEnding::Cr);
        assert_eq!(decode("04").line_ending(), LineEnding::Share);
        assert_eq!(decode("0E").line_ending(), LineEnding::Local);
    }

    #[test]
    fn malformed_types_are_decode_errors() {
        assert!(FileTypeSpec::decode(Some("zz")).is_err());
        assert!(FileTypeSpec::decode(Some("00000")).is_err());
        assert!(matches!(
            FileTypeSpec::decode_field("type2", Some("-1")),
            Err(ProtocolError::Decode { key, .. }) if key == "type2"
        ));
    }

    #[test]
    fn apple_and_resource_types_unsupported() {
        assert!(!decode("5").is_supported());
        assert!(!decode("D").is_supported());
        assert!(decode("1").is_supported());
    }
}
