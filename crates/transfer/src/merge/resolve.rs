//! Automatic resolution of a finished merge.

use std::fmt;
use std::str::FromStr;

/// How aggressively a merge may be resolved without the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResolveMode {
    /// Accept only one-sided changes.
    Safe,
    /// Accept anything; conflicts are written with markers for editing.
    Force,
    /// Accept one-sided and non-conflicting merges.
    Auto,
    /// Accept only one-sided changes; everything else is left to the user.
    #[default]
    Manual,
}

impl ResolveMode {
    /// Wire spelling used by `mergeAuto`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Force => "force",
            Self::Auto => "auto",
            Self::Manual => "none",
        }
    }
}

/// Error for an unrecognized resolve mode.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown resolve mode '{0}'")]
pub struct ParseResolveModeError(String);

impl FromStr for ResolveMode {
    type Err = ParseResolveModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(Self::Safe),
            "force" => Ok(Self::Force),
            "auto" => Ok(Self::Auto),
            "none" | "" => Ok(Self::Manual),
            other => Err(ParseResolveModeError(other.to_owned())),
        }
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolveChoice {
    /// Leave the working file alone and decline.
    Skip,
    /// Keep the working file.
    Yours,
    /// Take the incoming revision.
    Theirs,
    /// Take the merge result.
    Merged,
    /// Take the merge result, conflict markers included.
    Edit,
}

impl ResolveChoice {
    /// Value of `mergeHow` in the confirm reply; `None` for a decline.
    #[must_use]
    pub const fn merge_how(self) -> Option<&'static str> {
        match self {
            Self::Skip => None,
            Self::Yours => Some("yours"),
            Self::Theirs => Some("theirs"),
            Self::Merged => Some("merged"),
            Self::Edit => Some("edit"),
        }
    }
}

/// Region counts collected while a merge streams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeCounts {
    /// Changes only in the working file.
    pub yours: u32,
    /// Changes only in the incoming revision.
    pub theirs: u32,
    /// Identical changes on both sides.
    pub both: u32,
    /// Conflicting changes.
    pub conflict: u32,
}

impl MergeCounts {
    /// Counts for a two-way merge, where only whole-file digests are known.
    ///
    /// `base` is the revision the working file was synced from, `yours` the
    /// working file and `theirs` the incoming revision. Without a base
    /// nothing can be attributed to theirs, so the working file counts as
    /// changed. Three identical digests count nothing, which resolves to
    /// theirs.
    #[must_use]
    pub fn two_way(base: Option<&str>, yours: Option<&str>, theirs: Option<&str>) -> Self {
        let same = |a: &str, b: &str| a.eq_ignore_ascii_case(b);
        let mut counts = Self::default();
        match (base, yours, theirs) {
            (Some(base), Some(yours), theirs) if same(base, yours) => {
                if theirs.is_some_and(|theirs| !same(base, theirs)) {
                    counts.theirs = 1;
                }
            }
            (Some(base), yours, Some(theirs)) if !same(base, theirs) => {
                if yours.is_some_and(|yours| !same(yours, theirs)) {
                    counts.conflict = 1;
                } else {
                    counts.both = 1;
                }
            }
            _ => counts.yours = 1,
        }
        counts
    }

    /// The `Diff chunks: ...` summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Diff chunks: {} yours + {} theirs + {} both + {} conflicting",
            self.yours, self.theirs, self.both, self.conflict
        )
    }
}

/// Picks the outcome of a merge.
///
/// Two-way merges cannot merge: a conflict skips, an untouched working file
/// takes theirs, anything else keeps yours. Three-way merges take the single
/// changed side when only one side changed and otherwise defer to `mode`.
#[must_use]
pub const fn auto_resolve(mode: ResolveMode, counts: &MergeCounts, two_way: bool) -> ResolveChoice {
    if two_way {
        return if counts.conflict > 0 {
            ResolveChoice::Skip
        } else if counts.yours == 0 {
            ResolveChoice::Theirs
        } else {
            ResolveChoice::Yours
        };
    }

    if counts.conflict > 0 {
        return match mode {
            ResolveMode::Force => ResolveChoice::Edit,
            _ => ResolveChoice::Skip,
        };
    }
    if counts.theirs == 0 {
        return ResolveChoice::Yours;
    }
    if counts.yours == 0 {
        return ResolveChoice::Theirs;
    }
    match mode {
        ResolveMode::Force | ResolveMode::Auto => ResolveChoice::Merged,
        ResolveMode::Safe | ResolveMode::Manual => ResolveChoice::Skip,
    }
}
