//! Engine subsystems and their tracing targets.

use tracing::level_filters::LevelFilter;

/// Subsystems that emit diagnostics under their own tracing target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subsystem {
    /// open/write/close file materialization.
    Transfer,
    /// Merge chunk routing and resolution.
    Merge,
    /// Outbound file streaming.
    Send,
    /// move/delete/chmod/checkFile.
    Fs,
    /// Argument decoding and reply construction.
    Protocol,
}

impl Subsystem {
    /// Every subsystem, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::Transfer,
        Self::Merge,
        Self::Send,
        Self::Fs,
        Self::Protocol,
    ];

    /// The tracing target used by this subsystem's macros.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Transfer => "client::transfer",
            Self::Merge => "client::merge",
            Self::Send => "client::send",
            Self::Fs => "client::fs",
            Self::Protocol => "client::protocol",
        }
    }

    /// Looks a subsystem up by its short name (`"merge"`) or full target.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.strip_prefix("client::").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|s| s.target().strip_prefix("client::") == Some(short))
    }
}

/// Maps a numeric level (0 = off, 1 = info, 2 = debug, 3+ = trace) to a filter.
#[must_use]
pub const fn level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_both_ways() {
        for subsystem in Subsystem::ALL {
            assert_eq!(Subsystem::from_name(subsystem.target()), Some(subsystem));
        }
        assert_eq!(Subsystem::from_name("merge"), Some(Subsystem::Merge));
        assert_eq!(Subsystem::from_name("unknown"), None);
    }

    #[test]
    fn zero_keeps_warnings() {
        assert_eq!(level_filter(0), LevelFilter::WARN);
        assert_eq!(level_filter(9), LevelFilter::TRACE);
    }
}
