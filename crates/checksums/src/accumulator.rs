//! crates/checksums/src/accumulator.rs
//! Incremental digest over a byte stream plus whole-file helpers.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::content::ContentDigest;
use crate::strong::Md5;

/// Read size used when hashing readers and files.
pub const DIGEST_BUFFER_LEN: usize = 64 * 1024;

/// Running digest of everything passed to [`update`](Self::update).
///
/// Tracks the number of bytes seen alongside the hash state so callers can
/// report the canonical content size without a second pass.
///
/// # Examples
///
/// ```
/// use checksums::DigestAccumulator;
///
/// let mut acc = DigestAccumulator::new();
/// acc.update(b"hello ");
/// acc.update(b"world");
/// assert_eq!(acc.bytes(), 11);
/// assert_eq!(acc.finish(), DigestAccumulator::digest_of(b"hello world"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct DigestAccumulator {
    hasher: Md5,
    bytes: u64,
}

impl DigestAccumulator {
    /// Creates an accumulator that has seen no bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes += data.len() as u64;
    }

    /// Total bytes fed so far.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Finishes the digest.
    #[must_use]
    pub fn finish(self) -> ContentDigest {
        ContentDigest::from_bytes(self.hasher.finalize())
    }

    /// Returns the digest of the bytes seen so far without consuming the state.
    #[must_use]
    pub fn snapshot(&self) -> ContentDigest {
        self.clone().finish()
    }

    /// One-shot digest of an in-memory buffer.
    #[must_use]
    pub fn digest_of(data: &[u8]) -> ContentDigest {
        ContentDigest::from_bytes(Md5::digest(data))
    }
}

/// Hashes a reader to its end, returning the digest and byte count.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<(ContentDigest, u64)> {
    let mut acc = DigestAccumulator::new();
    let mut buffer = vec![0_u8; DIGEST_BUFFER_LEN];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        acc.update(&buffer[..n]);
    }
    let bytes = acc.bytes();
    Ok((acc.finish(), bytes))
}

/// Hashes the raw bytes of the file at `path`.
pub fn digest_file(path: &Path) -> io::Result<ContentDigest> {
    let file = File::open(path)?;
    digest_reader(file).map(|(digest, _)| digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_digest_matches_known_value() {
        let digest = DigestAccumulator::new().finish();
        assert_eq!(digest.to_hex(), "D41D8CD98F00B204E9800998ECF8427E");
    }

    #[test]
    fn snapshot_does_not_disturb_state() {
        let mut acc = DigestAccumulator::new();
        acc.update(b"abc");
        let early = acc.snapshot();
        acc.update(b"def");
        assert_eq!(early, DigestAccumulator::digest_of(b"abc"));
        assert_eq!(acc.finish(), DigestAccumulator::digest_of(b"abcdef"));
    }

    #[test]
    fn file_digest_matches_buffer_digest() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("data.bin");
        let payload: Vec<u8> = (0..200_000_u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &payload).expect("write payload");

        let digest = digest_file(&path).expect("digest file");
        assert_eq!(digest, DigestAccumulator::digest_of(&payload));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().expect("create temp dir");
        let err = digest_file(&dir.path().join("absent")).expect_err("missing file");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
