//! Per-subsystem verbosity configuration.

use super::levels::{Subsystem, level_filter};

/// Verbosity level for each engine subsystem.
///
/// Levels follow [`level_filter`]: 0 keeps warnings and errors only, 1 adds
/// info, 2 adds debug and 3 adds trace.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// File transfer level.
    pub transfer: u8,
    /// Merge engine level.
    pub merge: u8,
    /// Send engine level.
    pub send: u8,
    /// Filesystem command level.
    pub fs: u8,
    /// Protocol decoding level.
    pub protocol: u8,
}

impl VerbosityConfig {
    /// Builds a configuration from a global `-v` count.
    #[must_use]
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();

        match level {
            0 => {}
            1 => {
                config.transfer = 1;
                config.merge = 1;
                config.send = 1;
                config.fs = 1;
            }
            2 => {
                config.transfer = 2;
                config.merge = 2;
                config.send = 2;
                config.fs = 1;
                config.protocol = 1;
            }
            3 => {
                config.transfer = 2;
                config.merge = 2;
                config.send = 2;
                config.fs = 2;
                config.protocol = 2;
            }
            _ => {
                config.transfer = 3;
                config.merge = 3;
                config.send = 3;
                config.fs = 3;
                config.protocol = 3;
            }
        }

        config
    }

    /// Level configured for `subsystem`.
    #[must_use]
    pub const fn level(&self, subsystem: Subsystem) -> u8 {
        match subsystem {
            Subsystem::Transfer => self.transfer,
            Subsystem::Merge => self.merge,
            Subsystem::Send => self.send,
            Subsystem::Fs => self.fs,
            Subsystem::Protocol => self.protocol,
        }
    }

    /// Overrides the level for one subsystem.
    pub fn set(&mut self, subsystem: Subsystem, level: u8) {
        let slot = match subsystem {
            Subsystem::Transfer => &mut self.transfer,
            Subsystem::Merge => &mut self.merge,
            Subsystem::Send => &mut self.send,
            Subsystem::Fs => &mut self.fs,
            Subsystem::Protocol => &mut self.protocol,
        };
        *slot = level;
    }

    /// Applies a comma-separated override list such as `merge=3,send=0`.
    ///
    /// Unknown names and unparsable levels are returned as the error value.
    pub fn apply_overrides(&mut self, spec: &str) -> Result<(), String> {
        for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, level) = item.split_once('=').ok_or_else(|| item.to_owned())?;
            let subsystem = Subsystem::from_name(name.trim()).ok_or_else(|| item.to_owned())?;
            let level = level.trim().parse().map_err(|_| item.to_owned())?;
            self.set(subsystem, level);
        }
        Ok(())
    }

    /// Renders the configuration as `tracing_subscriber::EnvFilter` directives.
    #[must_use]
    pub fn directives(&self) -> String {
        let mut out = String::from("warn");
        for subsystem in Subsystem::ALL {
            let filter = level_filter(self.level(subsystem));
            out.push(',');
            out.push_str(subsystem.target());
            out.push('=');
            out.push_str(&filter.to_string().to_ascii_lowercase());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_every_target() {
        let directives = VerbosityConfig::from_verbose_level(2).directives();
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("client::merge=debug"));
        assert!(directives.contains("client::protocol=info"));
        assert!(directives.contains("client::fs=info"));
    }

    #[test]
    fn overrides_replace_levels() {
        let mut config = VerbosityConfig::from_verbose_level(1);
        config.apply_overrides("merge=3, send=0").expect("valid overrides");
        assert_eq!(config.merge, 3);
        assert_eq!(config.send, 0);
        assert_eq!(config.transfer, 1);
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = VerbosityConfig::default();
        assert_eq!(config.apply_overrides("bogus=1"), Err("bogus=1".to_owned()));
        assert_eq!(config.apply_overrides("merge"), Err("merge".to_owned()));
        assert_eq!(config.apply_overrides("merge=x"), Err("merge=x".to_owned()));
    }
}
