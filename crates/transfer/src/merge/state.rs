//! Per-handle merge state: the temp files being rebuilt and their digests.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use checksums::{ContentDigest, DigestAccumulator};
use protocol::{ContentEncoder, FileTypeSpec, Transform};

use super::chunk::{Counter, MergeLabels, SelectorBits, classify, marker_visible};
use super::resolve::{MergeCounts, ResolveChoice};
use crate::commit::rename_or_copy;
use crate::temp_guard::{TempFileGuard, open_tmpfile};

fn transform_error(error: protocol::TransformError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error)
}

/// One rebuilt file: a temp file written in local form, with a digest of the
/// canonical bytes routed to it.
#[derive(Debug)]
pub(crate) struct MergeLeg {
    file: File,
    encoder: ContentEncoder,
    digest: DigestAccumulator,
    guard: TempFileGuard,
    scratch: Vec<u8>,
}

impl MergeLeg {
    fn create(
        client_path: &Path,
        temp_dir: Option<&Path>,
        transform: &Transform,
    ) -> io::Result<Self> {
        let (file, guard) = open_tmpfile(client_path, temp_dir)?;
        Ok(Self {
            file,
            encoder: transform.encoder(),
            digest: DigestAccumulator::new(),
            guard,
            scratch: Vec::new(),
        })
    }

    fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.digest.update(data);
        self.write_local(data)
    }

    /// Writes without touching the digest; used for markers.
    fn write_marker(&mut self, text: &[u8]) -> io::Result<()> {
        self.write_local(text)
    }

    fn write_local(&mut self, data: &[u8]) -> io::Result<()> {
        self.scratch.clear();
        self.encoder
            .encode(data, &mut self.scratch)
            .map_err(transform_error)?;
        self.file.write_all(&self.scratch)
    }

    fn finish(&mut self) -> io::Result<ContentDigest> {
        self.scratch.clear();
        self.encoder
            .finish(&mut self.scratch)
            .map_err(transform_error)?;
        self.file.write_all(&self.scratch)?;
        self.file.flush()?;
        Ok(self.digest.snapshot())
    }

    pub(crate) fn path(&self) -> &Path {
        self.guard.path()
    }
}

/// Digests of the rebuilt files, taken when the streams close.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegDigests {
    /// Base revision (three-way only).
    pub base: Option<ContentDigest>,
    /// Incoming revision.
    pub theirs: Option<ContentDigest>,
    /// Working file.
    pub yours: Option<ContentDigest>,
    /// Merge result (three-way only).
    pub result: Option<ContentDigest>,
}

/// State of one merge exchange.
#[derive(Debug)]
pub struct MergeState {
    client_path: PathBuf,
    file_type: FileTypeSpec,
    labels: MergeLabels,
    base: Option<MergeLeg>,
    theirs: Option<MergeLeg>,
    result: Option<MergeLeg>,
    yours: DigestAccumulator,
    old_bits: SelectorBits,
    counts: MergeCounts,
    show_all: bool,
    two_way: bool,
    external: Option<PathBuf>,
    needs_newline: bool,
    base_digest: Option<String>,
}

impl MergeState {
    fn empty(client_path: PathBuf, file_type: FileTypeSpec) -> Self {
        Self {
            client_path,
            file_type,
            labels: MergeLabels::default(),
            base: None,
            theirs: None,
            result: None,
            yours: DigestAccumulator::new(),
            old_bits: SelectorBits::NONE,
            counts: MergeCounts::default(),
            show_all: false,
            two_way: false,
            external: None,
            needs_newline: false,
            base_digest: None,
        }
    }

    /// Three-way merge rebuilding base, theirs and result. `base` is the
    /// transform for the base file, `result` the one for theirs and result.
    pub(crate) fn three_way(
        client_path: PathBuf,
        file_type: FileTypeSpec,
        base: &Transform,
        result: &Transform,
        labels: MergeLabels,
        show_all: bool,
        temp_dir: Option<&Path>,
    ) -> io::Result<Self> {
        let base_leg = MergeLeg::create(&client_path, temp_dir, base)?;
        let theirs_leg = MergeLeg::create(&client_path, temp_dir, result)?;
        let result_leg = MergeLeg::create(&client_path, temp_dir, result)?;
        Ok(Self {
            labels,
            base: Some(base_leg),
            theirs: Some(theirs_leg),
            result: Some(result_leg),
            show_all,
            ..Self::empty(client_path, file_type)
        })
    }

    /// Two-way merge rebuilding only theirs. `base_digest` is the digest of
    /// the revision the working file came from.
    pub(crate) fn two_way(
        client_path: PathBuf,
        file_type: FileTypeSpec,
        theirs: &Transform,
        base_digest: Option<String>,
        temp_dir: Option<&Path>,
    ) -> io::Result<Self> {
        let theirs_leg = MergeLeg::create(&client_path, temp_dir, theirs)?;
        Ok(Self {
            theirs: Some(theirs_leg),
            two_way: true,
            base_digest,
            ..Self::empty(client_path, file_type)
        })
    }

    /// Merge performed by an outside tool into `prepared`.
    pub(crate) fn external(
        client_path: PathBuf,
        file_type: FileTypeSpec,
        prepared: PathBuf,
    ) -> Self {
        Self {
            external: Some(prepared),
            ..Self::empty(client_path, file_type)
        }
    }

    /// Routes one chunk, writing a region marker first when `bits` opens a
    /// new visible region.
    pub(crate) fn write_chunk(&mut self, bits: SelectorBits, data: &[u8]) -> io::Result<()> {
        if self.external.is_some() {
            return Ok(());
        }

        if self.two_way {
            if !data.is_empty()
                && let Some(theirs) = self.theirs.as_mut()
            {
                theirs.write_chunk(data)?;
            }
            return Ok(());
        }

        let old_bits = self.old_bits;
        if !old_bits.is_empty() && old_bits != bits {
            let (marker, counter) = classify(bits);
            match counter {
                Some(Counter::Yours) => self.counts.yours += 1,
                Some(Counter::Theirs) => self.counts.theirs += 1,
                Some(Counter::Both) => self.counts.both += 1,
                Some(Counter::Conflict) => self.counts.conflict += 1,
                None => {}
            }
            if let Some(marker) = marker
                && marker_visible(self.show_all, old_bits, bits)
                && let Some(result) = self.result.as_mut()
            {
                let mut text = String::new();
                if self.needs_newline {
                    text.push('\n');
                    self.needs_newline = false;
                }
                text.push_str(&marker.render(&self.labels));
                logging::trace_merge!("marker {:?} at {:?}", marker, bits);
                result.write_marker(text.as_bytes())?;
            }
        }
        self.old_bits = bits;

        let Some(&last) = data.last() else {
            return Ok(());
        };
        if bits.intersects(SelectorBits::BASE)
            && let Some(base) = self.base.as_mut()
        {
            base.write_chunk(data)?;
        }
        if bits.intersects(SelectorBits::LEG1)
            && let Some(theirs) = self.theirs.as_mut()
        {
            theirs.write_chunk(data)?;
        }
        if bits.intersects(SelectorBits::LEG2) {
            self.yours.update(data);
        }
        if (bits.intersects(SelectorBits::RESULT)
            || bits == (SelectorBits::BASE | SelectorBits::CONFLICT))
            && let Some(result) = self.result.as_mut()
        {
            result.write_chunk(data)?;
            self.needs_newline = last != b'\n';
        }
        Ok(())
    }

    /// Closes the temp file streams and returns their digests.
    pub(crate) fn finish_streams(&mut self) -> io::Result<LegDigests> {
        let mut digests = LegDigests::default();
        if let Some(base) = self.base.as_mut() {
            digests.base = Some(base.finish()?);
        }
        if let Some(theirs) = self.theirs.as_mut() {
            digests.theirs = Some(theirs.finish()?);
        }
        if let Some(result) = self.result.as_mut() {
            digests.result = Some(result.finish()?);
        }
        if !self.two_way {
            digests.yours = Some(self.yours.snapshot());
        }
        Ok(digests)
    }

    /// Applies `choice` to the working file. Temp files are deleted when
    /// the state drops, whatever the outcome; the working file is only ever
    /// replaced, never removed.
    pub(crate) fn finish_merge(&self, choice: ResolveChoice) -> io::Result<()> {
        let source = match choice {
            ResolveChoice::Theirs => self.theirs.as_ref(),
            ResolveChoice::Merged | ResolveChoice::Edit => self.result.as_ref(),
            ResolveChoice::Yours | ResolveChoice::Skip => None,
        };
        if let Some(leg) = source {
            logging::trace_merge!(
                "{:?}: {} -> {}",
                choice,
                leg.path().display(),
                self.client_path.display()
            );
            rename_or_copy(leg.path(), &self.client_path)?;
        }
        Ok(())
    }

    /// Working file being merged.
    pub fn client_path(&self) -> &Path {
        &self.client_path
    }

    /// File type of the working file.
    pub const fn file_type(&self) -> &FileTypeSpec {
        &self.file_type
    }

    /// Region counts so far.
    pub const fn counts(&self) -> MergeCounts {
        self.counts
    }

    /// Overrides the counts; two-way merges derive theirs at close.
    pub(crate) const fn set_counts(&mut self, counts: MergeCounts) {
        self.counts = counts;
    }

    /// Whether this is a two-way merge.
    pub const fn is_two_way(&self) -> bool {
        self.two_way
    }

    /// Prepared file of an external merge.
    pub fn external_file(&self) -> Option<&Path> {
        self.external.as_deref()
    }

    /// Digest of the base revision given at open (two-way only).
    pub fn base_digest(&self) -> Option<&str> {
        self.base_digest.as_deref()
    }

    /// Temp file paths currently held.
    pub fn temp_paths(&self) -> Vec<PathBuf> {
        [&self.base, &self.theirs, &self.result]
            .into_iter()
            .flatten()
            .map(|leg| leg.path().to_path_buf())
            .collect()
    }
}
