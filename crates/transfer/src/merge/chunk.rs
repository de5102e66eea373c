//! Selector bits and chunk classification.
//!
//! Every `writeMerge` packet carries a bit set naming which files the chunk
//! belongs to. A change of bits between consecutive chunks marks a region
//! boundary; [`classify`] maps the incoming bits of such a boundary to the
//! marker that opens the region and the counter it bumps.
//!
//! A conflict arrives as three chunks:
//!
//! ```text
//! CONFLICT | BASE
//! CONFLICT | LEG1 | RESULT
//! CONFLICT | LEG2 | RESULT
//! ```
//!
//! while identical edits on both sides arrive as `BASE` followed by
//! `LEG1 | LEG2 | RESULT`. `ALL` chunks are shared by every file.

use std::fmt;

/// Set of files a merge chunk belongs to.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SelectorBits(u8);

impl SelectorBits {
    /// No file; the state before the first chunk.
    pub const NONE: Self = Self(0);
    /// The common ancestor.
    pub const BASE: Self = Self(0x01);
    /// The incoming revision ("theirs").
    pub const LEG1: Self = Self(0x02);
    /// The working file ("yours").
    pub const LEG2: Self = Self(0x04);
    /// The merge result.
    pub const RESULT: Self = Self(0x08);
    /// Part of a conflict.
    pub const CONFLICT: Self = Self(0x10);
    /// Shared by base, both legs and the result.
    pub const ALL: Self = Self(0x0F);

    /// Wraps raw wire bits.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw wire bits.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Whether any bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for SelectorBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for SelectorBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelectorBits({:#04x})", self.0)
    }
}

/// Region marker written into the result file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    /// `>>>> ORIGINAL <base>`
    Original,
    /// `==== THEIRS <theirs>`
    Theirs,
    /// `==== YOURS <yours>`
    Yours,
    /// `==== BOTH <theirs> <yours>`
    Both,
    /// `<<<<`
    End,
}

/// Chunk counter bumped at a region boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    /// A change only on the working side.
    Yours,
    /// A change only on the incoming side.
    Theirs,
    /// The same change on both sides.
    Both,
    /// Conflicting changes.
    Conflict,
}

/// Labels used in markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeLabels {
    /// Name of the base revision.
    pub base: String,
    /// Name of the incoming revision.
    pub theirs: String,
    /// Name of the working file.
    pub yours: String,
}

impl Default for MergeLabels {
    fn default() -> Self {
        Self {
            base: "original".to_owned(),
            theirs: "theirs".to_owned(),
            yours: "yours".to_owned(),
        }
    }
}

impl MarkerKind {
    /// The marker line, without any leading newline.
    #[must_use]
    pub fn render(self, labels: &MergeLabels) -> String {
        match self {
            Self::Original => format!(">>>> ORIGINAL {}\n", labels.base),
            Self::Theirs => format!("==== THEIRS {}\n", labels.theirs),
            Self::Yours => format!("==== YOURS {}\n", labels.yours),
            Self::Both => format!("==== BOTH {} {}\n", labels.theirs, labels.yours),
            Self::End => "<<<<\n".to_owned(),
        }
    }
}

/// Marker and counter for a region that starts with `bits`.
///
/// | incoming bits                       | marker   | counter  |
/// |-------------------------------------|----------|----------|
/// | `BASE \| CONFLICT`                  | ORIGINAL | conflict |
/// | `BASE`, `BASE \| LEG1`, `BASE \| LEG2`, anything unlisted | ORIGINAL | |
/// | `LEG1 \| RESULT`                    | THEIRS   | theirs   |
/// | `LEG1 \| RESULT \| CONFLICT`        | THEIRS   |          |
/// | `LEG2 \| RESULT`                    | YOURS    | yours    |
/// | `LEG2 \| RESULT \| CONFLICT`        | YOURS    |          |
/// | `LEG1 \| LEG2 \| RESULT`            | BOTH     | both     |
/// | `ALL`                               | END      |          |
#[must_use]
pub const fn classify(bits: SelectorBits) -> (Option<MarkerKind>, Option<Counter>) {
    const BASE_CONFLICT: u8 = 0x01 | 0x10;
    const THEIRS: u8 = 0x02 | 0x08;
    const THEIRS_CONFLICT: u8 = 0x02 | 0x08 | 0x10;
    const YOURS: u8 = 0x04 | 0x08;
    const YOURS_CONFLICT: u8 = 0x04 | 0x08 | 0x10;
    const BOTH: u8 = 0x02 | 0x04 | 0x08;
    const ALL: u8 = 0x0F;

    match bits.0 {
        BASE_CONFLICT => (Some(MarkerKind::Original), Some(Counter::Conflict)),
        THEIRS => (Some(MarkerKind::Theirs), Some(Counter::Theirs)),
        THEIRS_CONFLICT => (Some(MarkerKind::Theirs), None),
        YOURS => (Some(MarkerKind::Yours), Some(Counter::Yours)),
        YOURS_CONFLICT => (Some(MarkerKind::Yours), None),
        BOTH => (Some(MarkerKind::Both), Some(Counter::Both)),
        ALL => (Some(MarkerKind::End), None),
        _ => (Some(MarkerKind::Original), None),
    }
}

/// Whether a boundary into `bits` from `old_bits` writes its marker.
#[must_use]
pub const fn marker_visible(show_all: bool, old_bits: SelectorBits, bits: SelectorBits) -> bool {
    show_all
        || bits.intersects(SelectorBits::CONFLICT)
        || (bits.0 == SelectorBits::ALL.0 && old_bits.intersects(SelectorBits::CONFLICT))
}

#[cfg(test)]
mod tests {
    use super::*;

    const B: SelectorBits = SelectorBits::BASE;
    const L1: SelectorBits = SelectorBits::LEG1;
    const L2: SelectorBits = SelectorBits::LEG2;
    const R: SelectorBits = SelectorBits::RESULT;
    const C: SelectorBits = SelectorBits::CONFLICT;

    #[test]
    fn conflict_sequence() {
        assert_eq!(
            classify(C | B),
            (Some(MarkerKind::Original), Some(Counter::Conflict))
        );
        assert_eq!(classify(C | L1 | R), (Some(MarkerKind::Theirs), None));
        assert_eq!(classify(C | L2 | R), (Some(MarkerKind::Yours), None));
        assert_eq!(classify(SelectorBits::ALL), (Some(MarkerKind::End), None));
    }

    #[test]
    fn one_sided_and_shared_edits() {
        assert_eq!(
            classify(L1 | R),
            (Some(MarkerKind::Theirs), Some(Counter::Theirs))
        );
        assert_eq!(
            classify(L2 | R),
            (Some(MarkerKind::Yours), Some(Counter::Yours))
        );
        assert_eq!(
            classify(L1 | L2 | R),
            (Some(MarkerKind::Both), Some(Counter::Both))
        );
    }

    #[test]
    fn base_variants_and_unknown_bits_open_original() {
        for bits in [
            B,
            B | L1,
            B | L2,
            SelectorBits::from_raw(0x1F),
            SelectorBits::from_raw(0x06),
        ] {
            assert_eq!(classify(bits), (Some(MarkerKind::Original), None), "{bits:?}");
        }
    }

    #[test]
    fn visibility_rules() {
        assert!(!marker_visible(false, B, L1 | R));
        assert!(marker_visible(true, B, L1 | R));
        assert!(marker_visible(false, B, C | L1 | R));
        assert!(marker_visible(false, C | L2 | R, SelectorBits::ALL));
        assert!(!marker_visible(false, L2 | R, SelectorBits::ALL));
    }

    #[test]
    fn markers_render_with_labels() {
        let labels = MergeLabels {
            base: "//depot/a#1".into(),
            theirs: "//depot/a#2".into(),
            yours: "/ws/a".into(),
        };
        assert_eq!(MarkerKind::Original.render(&labels), ">>>> ORIGINAL //depot/a#1\n");
        assert_eq!(
            MarkerKind::Both.render(&labels),
            "==== BOTH //depot/a#2 /ws/a\n"
        );
        assert_eq!(MarkerKind::End.render(&labels), "<<<<\n");
    }
}
