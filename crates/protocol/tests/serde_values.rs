//! Argument maps and file types survive a trip through JSON, for callers
//! that log or replay exchanges.

#![cfg(feature = "serde")]

use protocol::{ArgMap, FileTypeSpec};

#[test]
fn arg_map_keeps_value_kinds() {
    let args = ArgMap::new()
        .with("path", "//depot/a.txt")
        .with("data", b"\x00\xff".as_slice())
        .with("bits", 0x0F_i64);
    let json = serde_json::to_value(&args).expect("serialize");
    let back: ArgMap = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, args);
    assert_eq!(back.parse_i64("bits").expect("int"), Some(0x0F));
    assert_eq!(back.bytes("data"), Some(b"\x00\xff".as_slice()));
}

#[test]
fn file_type_round_trips() {
    let spec = FileTypeSpec::decode(Some("1800")).expect("utf16");
    let text = serde_json::to_string(&spec).expect("serialize");
    let back: FileTypeSpec = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(back, spec);
}
