//! Local file type inference and the mapping onto server type names.
//!
//! `checkFile` without a `type` asks the client what a file looks like. The
//! answer is inferred from the directory entry and the first
//! [`PEEK_LEN`] bytes, then mapped through [`TYPE_TABLE`], which knows which
//! server `xfiles` level introduced each type and what to send instead when
//! the server is older.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::message::ClientMessage;

/// Bytes read from the start of a file to infer its type.
pub const PEEK_LEN: usize = 8192;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Signatures of formats that are already compressed.
const COMPRESSED_MAGIC: &[&[u8]] = &[
    b"GIF",
    &[0xFF, 0xD8, 0xFF, 0xE0],
    &[0xFF, 0xD8, 0xFF, 0xE1],
    &[0x1F, 0x8B],
    &[0xFF, 0x1F],
    &[0x1F, 0x9D],
    &[b'P', b'K', 0x03, 0x04],
    &[b'P', b'K', 0x05, 0x06],
    &[0x89, b'P', b'N', b'G'],
    &[0xCA, 0xFE, 0xBA, 0xBE],
];

/// What a local directory entry appears to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalType {
    /// Plain text.
    Text,
    /// Executable text.
    XText,
    /// Binary.
    Binary,
    /// Executable binary.
    XBinary,
    /// Already-compressed binary.
    CBinary,
    /// Symbolic link.
    Symlink,
    /// Directory.
    Directory,
    /// Neither file, directory nor link.
    Special,
    /// Nothing at the path.
    Missing,
    /// Present but unreadable.
    Unreadable,
    /// Zero-length file.
    Empty,
    /// Text in the client charset with non-ASCII content.
    Unicode,
    /// Executable unicode text.
    XUnicode,
    /// UTF-8 with a byte order mark.
    Utf8,
    /// Executable UTF-8 with a byte order mark.
    XUtf8,
    /// UTF-16 with a byte order mark.
    Utf16,
    /// Executable UTF-16.
    XUtf16,
}

/// Infers the type of the entry at `path`.
///
/// `unicode_server` enables the UTF-8 validation that promotes text with
/// high-bit bytes to [`LocalType::Unicode`].
pub fn infer_local_type(path: &Path, unicode_server: bool) -> LocalType {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return LocalType::Missing,
        Err(_) => return LocalType::Unreadable,
    };
    let kind = meta.file_type();
    if kind.is_symlink() {
        return LocalType::Symlink;
    }
    if kind.is_dir() {
        return LocalType::Directory;
    }
    if !kind.is_file() {
        return LocalType::Special;
    }
    if meta.len() == 0 {
        return LocalType::Empty;
    }

    let mut buf = Vec::with_capacity(PEEK_LEN);
    let read = fs::File::open(path).and_then(|f| f.take(PEEK_LEN as u64).read_to_end(&mut buf));
    match read {
        Ok(0) => LocalType::Empty,
        Ok(_) => infer_from_contents(&buf, metadata::is_executable(path), unicode_server),
        Err(e) => {
            logging::trace_fs!("can't read {} for type check: {}", path.display(), e);
            LocalType::Unreadable
        }
    }
}

/// Infers a type from the leading bytes of a regular file.
pub fn infer_from_contents(buf: &[u8], executable: bool, unicode_server: bool) -> LocalType {
    if buf.is_empty() {
        return LocalType::Empty;
    }
    let pick = |plain, exec| if executable { exec } else { plain };
    let binary = || {
        if COMPRESSED_MAGIC.iter().any(|magic| buf.starts_with(magic)) {
            LocalType::CBinary
        } else {
            pick(LocalType::Binary, LocalType::XBinary)
        }
    };

    let high_bit = buf.iter().any(|b| b & 0x80 != 0);
    let control = buf.iter().copied().any(is_control);

    if buf.starts_with(PDF_MAGIC) {
        return pick(LocalType::Binary, LocalType::XBinary);
    }

    let mut inferred = pick(LocalType::Text, LocalType::XText);
    match detect_bom(buf) {
        Some(Bom::Utf8) => {
            if control {
                return binary();
            }
            if is_valid_utf8_prefix(buf) {
                inferred = pick(LocalType::Utf8, LocalType::XUtf8);
            }
        }
        Some(Bom::Utf16) => {
            return if is_valid_utf16_prefix(buf) {
                pick(LocalType::Utf16, LocalType::XUtf16)
            } else {
                binary()
            };
        }
        Some(Bom::Utf32) | None => {}
    }

    if control {
        return binary();
    }
    if unicode_server
        && high_bit
        && matches!(inferred, LocalType::Text | LocalType::XText)
        && is_valid_utf8_prefix(buf)
    {
        inferred = pick(LocalType::Unicode, LocalType::XUnicode);
    }
    inferred
}

/// ASCII control characters other than whitespace.
const fn is_control(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0E..=0x1B | 0x7F)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bom {
    Utf8,
    Utf16,
    Utf32,
}

fn detect_bom(buf: &[u8]) -> Option<Bom> {
    if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some(Bom::Utf8)
    } else if buf.starts_with(&[0xFF, 0xFE, 0x00, 0x00])
        || buf.starts_with(&[0x00, 0x00, 0xFE, 0xFF])
    {
        Some(Bom::Utf32)
    } else if buf.starts_with(&[0xFF, 0xFE]) || buf.starts_with(&[0xFE, 0xFF]) {
        Some(Bom::Utf16)
    } else {
        None
    }
}

/// Valid UTF-8, allowing a sequence cut off at the end of the peek buffer.
fn is_valid_utf8_prefix(buf: &[u8]) -> bool {
    match std::str::from_utf8(buf) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

fn is_valid_utf16_prefix(buf: &[u8]) -> bool {
    let little_endian = buf.starts_with(&[0xFF, 0xFE]);
    let units = buf[2..].chunks_exact(2).map(|pair| {
        let pair = [pair[0], pair[1]];
        if little_endian {
            u16::from_le_bytes(pair)
        } else {
            u16::from_be_bytes(pair)
        }
    });
    let decoded: Vec<_> = char::decode_utf16(units).collect();
    let last = decoded.len().saturating_sub(1);
    decoded
        .iter()
        .enumerate()
        // a high surrogate may be split by the peek boundary
        .all(|(i, unit)| unit.is_ok() || i == last)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Use `forceType` or the table's type.
    Accept,
    /// Nothing useful on disk: use `forceType` or the fallback, and say so.
    Assume,
    /// The server is too old for the type: send the fallback instead.
    Substitute,
    /// The entry can't be added at all.
    Refuse,
}

struct TypeRule {
    local: LocalType,
    /// `xfiles` level that introduced the type.
    level: i8,
    /// Action when the server is below `level`.
    below: Action,
    /// Action when the server is at or above `level`.
    supported: Action,
    name: &'static str,
    fallback: Option<&'static str>,
}

const fn rule(
    local: LocalType,
    level: i8,
    below: Action,
    supported: Action,
    name: &'static str,
    fallback: Option<&'static str>,
) -> TypeRule {
    TypeRule {
        local,
        level,
        below,
        supported,
        name,
        fallback,
    }
}

const SYMLINK_ACTION: Action = if cfg!(unix) { Action::Accept } else { Action::Refuse };

/// Server type names per local type and the `xfiles` level that allows them.
const TYPE_TABLE: &[TypeRule] = &[
    rule(LocalType::Text, 0, Action::Accept, Action::Accept, "text", Some("text")),
    rule(LocalType::XText, 0, Action::Substitute, Action::Accept, "xtext", Some("text")),
    rule(LocalType::Binary, 0, Action::Accept, Action::Accept, "binary", Some("binary")),
    rule(LocalType::XBinary, 0, Action::Substitute, Action::Accept, "xbinary", Some("binary")),
    rule(LocalType::CBinary, 3, Action::Substitute, Action::Accept, "ubinary", Some("binary")),
    rule(LocalType::Symlink, 1, Action::Refuse, SYMLINK_ACTION, "symlink", None),
    rule(LocalType::Special, -1, Action::Refuse, Action::Refuse, "special", None),
    rule(LocalType::Directory, -1, Action::Refuse, Action::Refuse, "directory", None),
    rule(LocalType::Missing, -1, Action::Assume, Action::Assume, "missing", Some("text")),
    rule(LocalType::Unreadable, -1, Action::Assume, Action::Assume, "unreadable", Some("text")),
    rule(LocalType::Empty, -1, Action::Assume, Action::Assume, "empty", Some("text")),
    rule(LocalType::Unicode, 5, Action::Substitute, Action::Accept, "unicode", Some("text")),
    rule(LocalType::XUnicode, 5, Action::Substitute, Action::Accept, "xunicode", Some("text")),
    rule(LocalType::Utf16, 6, Action::Substitute, Action::Accept, "utf16", Some("binary")),
    rule(LocalType::XUtf16, 6, Action::Substitute, Action::Accept, "xutf16", Some("binary")),
    rule(LocalType::Utf8, 7, Action::Substitute, Action::Accept, "utf8", Some("text")),
    rule(LocalType::XUtf8, 7, Action::Substitute, Action::Accept, "xutf8", Some("text")),
];

/// Server type chosen for a local file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecision {
    /// Type name to report to the server.
    pub name: String,
    /// Informational note for the user (assumed or substituted type).
    pub note: Option<ClientMessage>,
}

/// Maps `local` to the type name a server at `xfiles` understands.
///
/// `force_type` (from the typemap) overrides the inferred name wherever the
/// entry can be added at all. An entry that can't be added yields the info
/// message to show instead of a reply.
pub fn server_type(
    path: &Path,
    local: LocalType,
    force_type: Option<&str>,
    xfiles: u8,
) -> Result<TypeDecision, ClientMessage> {
    let shown = path.display();
    let Some(rule) = TYPE_TABLE.iter().find(|r| r.local == local) else {
        return Err(cant_add(path, "unknown"));
    };
    let action = if i16::from(xfiles) >= i16::from(rule.level) {
        rule.supported
    } else {
        rule.below
    };

    let fallback = rule.fallback.unwrap_or(rule.name);
    match action {
        Action::Accept => Ok(TypeDecision {
            name: force_type.unwrap_or(rule.name).to_owned(),
            note: None,
        }),
        Action::Assume => {
            let name = force_type.unwrap_or(fallback);
            Ok(TypeDecision {
                name: name.to_owned(),
                note: Some(ClientMessage::info(
                    "type-assumed",
                    format!("{shown} - {} file, assuming {name}", rule.name),
                )),
            })
        }
        Action::Substitute => Ok(TypeDecision {
            name: fallback.to_owned(),
            note: Some(ClientMessage::info(
                "type-substituted",
                format!("{shown} - using {fallback} instead of {}", rule.name),
            )),
        }),
        Action::Refuse => Err(cant_add(path, rule.name)),
    }
}

fn cant_add(path: &Path, type_name: &str) -> ClientMessage {
    ClientMessage::info(
        "type-refused",
        format!("{} - {type_name} file can't be added", path.display()),
    )
}
