//! Reading local files in canonical form.
//!
//! Content identity is defined on the canonical form (UTF-8, LF line
//! endings), so the digest of a working file is taken over its decoded
//! bytes. Symbolic links are represented by their target plus a newline.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use checksums::{ContentDigest, DigestAccumulator};
use protocol::{ContentDecoder, FileTypeSpec, Transform, TransformOptions};

/// Size of one outbound content chunk.
pub const SEND_CHUNK_LEN: usize = 64 * 1024;

/// Pulls canonical content from a local file in bounded chunks.
pub struct CanonicalReader {
    source: Source,
    decoder: ContentDecoder,
    pending: Vec<u8>,
    finished: bool,
}

enum Source {
    File(File),
    Literal(Option<Vec<u8>>),
}

impl std::fmt::Debug for CanonicalReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalReader")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl CanonicalReader {
    /// Opens `path` for reading as `spec`.
    pub fn open(path: &Path, spec: &FileTypeSpec, options: &TransformOptions) -> io::Result<Self> {
        let source = if spec.is_symlink() {
            let target = std::fs::read_link(path)?;
            let mut bytes = target.to_string_lossy().into_owned().into_bytes();
            bytes.push(b'\n');
            Source::Literal(Some(bytes))
        } else {
            Source::File(File::open(path)?)
        };
        let decoder = if spec.is_symlink() {
            Transform::identity().decoder()
        } else {
            Transform::for_file(spec, options).decoder()
        };
        Ok(Self {
            source,
            decoder,
            pending: Vec::new(),
            finished: false,
        })
    }

    /// Returns the next chunk of at most `max` canonical bytes, or `None`
    /// at end of file.
    pub fn next_chunk(&mut self, max: usize) -> io::Result<Option<Vec<u8>>> {
        let max = max.max(1);
        let mut buf = vec![0u8; max];
        while self.pending.len() < max && !self.finished {
            let read = match &mut self.source {
                Source::File(file) => file.read(&mut buf)?,
                Source::Literal(bytes) => {
                    let literal = bytes.take().unwrap_or_default();
                    self.pending.extend_from_slice(&literal);
                    0
                }
            };
            if read == 0 {
                self.decoder
                    .finish(&mut self.pending)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                self.finished = true;
            } else {
                self.decoder
                    .decode(&buf[..read], &mut self.pending)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            }
        }

        if self.pending.is_empty() {
            return Ok(None);
        }
        let take = self.pending.len().min(max);
        let rest = self.pending.split_off(take);
        Ok(Some(std::mem::replace(&mut self.pending, rest)))
    }
}

/// Digest and length of the canonical form of a local file.
pub fn canonical_digest(
    path: &Path,
    spec: &FileTypeSpec,
    options: &TransformOptions,
) -> io::Result<(ContentDigest, u64)> {
    let mut reader = CanonicalReader::open(path, spec, options)?;
    let mut digest = DigestAccumulator::new();
    while let Some(chunk) = reader.next_chunk(SEND_CHUNK_LEN)? {
        digest.update(&chunk);
    }
    let len = digest.bytes();
    Ok((digest.finish(), len))
}

/// Whether the canonical digest of `path` equals the hex `expected`.
/// Unreadable or missing files never match.
pub fn matches_digest(
    path: &Path,
    spec: &FileTypeSpec,
    options: &TransformOptions,
    expected: &str,
) -> bool {
    canonical_digest(path, spec, options).is_ok_and(|(digest, _)| digest.matches_hex(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::LineEnding;
    use tempfile::tempdir;

    fn text(ending: LineEnding) -> FileTypeSpec {
        FileTypeSpec::decode(Some("0"))
            .expect("text")
            .with_line_ending(ending)
    }

    #[test]
    fn crlf_file_digests_as_lf() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one\r\ntwo\r\n").expect("write");

        let (digest, len) =
            canonical_digest(&path, &text(LineEnding::CrLf), &TransformOptions::default())
                .expect("digest");
        assert_eq!(digest, DigestAccumulator::digest_of(b"one\ntwo\n"));
        assert_eq!(len, 8);
    }

    #[test]
    fn chunks_are_bounded() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![7u8; 10]).expect("write");
        let binary = FileTypeSpec::decode(Some("1")).expect("binary");

        let mut reader = CanonicalReader::open(&path, &binary, &TransformOptions::default())
            .expect("open");
        let mut sizes = Vec::new();
        while let Some(chunk) = reader.next_chunk(4).expect("read") {
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, [4, 4, 2]);
    }

    #[test]
    fn missing_file_never_matches() {
        let dir = tempdir().expect("tempdir");
        let digest = DigestAccumulator::digest_of(b"").to_hex();
        assert!(!matches_digest(
            &dir.path().join("absent"),
            &text(LineEnding::Lf),
            &TransformOptions::default(),
            &digest
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_content_is_target_plus_newline() {
        let dir = tempdir().expect("tempdir");
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("some/target", &link).expect("symlink");
        let spec = FileTypeSpec::decode(Some("4")).expect("symlink");

        let (digest, len) =
            canonical_digest(&link, &spec, &TransformOptions::default()).expect("digest");
        assert_eq!(digest, DigestAccumulator::digest_of(b"some/target\n"));
        assert_eq!(len, 12);
    }
}
