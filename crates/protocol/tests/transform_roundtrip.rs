//! Streaming transforms give the same result however the input is chunked,
//! and decoding undoes encoding for well-formed text.

use proptest::prelude::*;
use protocol::{FileTypeSpec, LineEnding, Transform, TransformOptions, Utf8BomPolicy};

fn text_plan(code: &str, ending: LineEnding) -> Transform {
    let spec = FileTypeSpec::decode(Some(code))
        .expect("valid type")
        .with_line_ending(ending);
    Transform::for_file(&spec, &TransformOptions::default())
}

fn encode_chunked(transform: &Transform, input: &[u8], split: usize) -> Vec<u8> {
    let mut encoder = transform.encoder();
    let mut out = Vec::new();
    for chunk in input.chunks(split.max(1)) {
        encoder.encode(chunk, &mut out).expect("encode chunk");
    }
    encoder.finish(&mut out).expect("finish");
    out
}

fn decode_chunked(transform: &Transform, input: &[u8], split: usize) -> Vec<u8> {
    let mut decoder = transform.decoder();
    let mut out = Vec::new();
    for chunk in input.chunks(split.max(1)) {
        decoder.decode(chunk, &mut out).expect("decode chunk");
    }
    decoder.finish(&mut out).expect("finish");
    out
}

fn line_ending() -> impl Strategy<Value = LineEnding> {
    prop_oneof![
        Just(LineEnding::Lf),
        Just(LineEnding::Cr),
        Just(LineEnding::CrLf),
        Just(LineEnding::Share),
    ]
}

// Text without bare carriage returns; CR-convention files additionally
// cannot distinguish a literal CR from a newline.
fn canonical_text() -> impl Strategy<Value = String> {
    "[a-z\u{e9}\u{4e2d}\u{1f600} \n]{0,200}"
}

proptest! {
    #[test]
    fn text_round_trips(text in canonical_text(), ending in line_ending(), split in 1usize..17) {
        let transform = text_plan("0", ending);
        let local = encode_chunked(&transform, text.as_bytes(), split);
        prop_assert_eq!(decode_chunked(&transform, &local, split), text.as_bytes());
    }

    #[test]
    fn utf16_round_trips(text in canonical_text(), ending in line_ending(), split in 1usize..17) {
        let transform = text_plan("1800", ending);
        let local = encode_chunked(&transform, text.as_bytes(), split);
        prop_assert_eq!(&local[..2], &[0xFF, 0xFE]);
        prop_assert_eq!(decode_chunked(&transform, &local, split), text.as_bytes());
    }

    #[test]
    fn utf8_with_bom_round_trips(text in canonical_text(), split in 1usize..9) {
        let options = TransformOptions {
            utf8_bom: Utf8BomPolicy::Always,
            ..TransformOptions::default()
        };
        let spec = FileTypeSpec::decode(Some("1430")).expect("utf8 crlf");
        let transform = Transform::for_file(&spec, &options);
        let local = encode_chunked(&transform, text.as_bytes(), split);
        prop_assert_eq!(decode_chunked(&transform, &local, split), text.as_bytes());
    }

    #[test]
    fn chunking_does_not_change_encoding(text in canonical_text(), split in 1usize..33) {
        let transform = text_plan("1800", LineEnding::CrLf);
        let whole = transform.encode_all(text.as_bytes()).expect("encode");
        prop_assert_eq!(encode_chunked(&transform, text.as_bytes(), split), whole);
    }

    #[test]
    fn binary_passes_any_bytes(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        split in 1usize..17,
    ) {
        let transform = text_plan("1", LineEnding::CrLf);
        prop_assert_eq!(encode_chunked(&transform, &bytes, split), bytes.clone());
        prop_assert_eq!(decode_chunked(&transform, &bytes, split), bytes);
    }
}
