
/// What to change on a working file after it has been written.
///
/// Fields left unset are not touched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MetadataOptions {
    mod_time: Option<i64>,
    writable: Option<bool>,
    executable: bool,
}

impl MetadataOptions {
    /// Options that change nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mod_time: None,
            writable: None,
            executable: false,
        }
    }

    /// Sets the modification time, in seconds since the Unix epoch.
    #[must_use]
    pub const fn mod_time(mut self, secs: Option<i64>) -> Self {
        self.mod_time = secs;
        self
    }

    /// Makes the file writable or read-only for its owner.
    #[must_use]
    pub const fn writable(mut self, writable: Option<bool>) -> Self {
        self.writable = writable;
        self
    }

    /// Derives writability from a server `perms` value: `rw` means writable,
    /// anything else read-only. Absent leaves the mode alone.
    #[must_use]
    pub fn perms(self, perms: Option<&str>) -> Self {
        self.writable(perms.map(perms_are_writable))
    }

    /// Adds execute permission where read permission is granted.
    #[must_use]
    #[doc(alias = "+x")]
    pub const fn executable(mut self, executable: bool) -> Self {
        self.executable = executable;
        self
    }

    /// Requested modification time.
    #[must_use]
    pub const fn requested_mod_time(&self) -> Option<i64> {
        self.mod_time
    }

    /// Requested writability.
    #[must_use]
    pub const fn requested_writable(&self) -> Option<bool> {
        self.writable
    }

    /// Whether execute permission is requested.
    #[must_use]
    pub const fn requested_executable(&self) -> bool {
        self.executable
    }
}

/// Whether a server `perms` value asks for a writable file.
#[must_use]
pub fn perms_are_writable(perms: &str) -> bool {
    perms.eq_ignore_ascii_case("rw")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_change_nothing() {
        let options = MetadataOptions::new();
        assert_eq!(options, MetadataOptions::default());
        assert_eq!(options.requested_mod_time(), None);
        assert_eq!(options.requested_writable(), None);
        assert!(!options.requested_executable());
    }

    #[test]
    fn perms_map_to_writability() {
        assert_eq!(MetadataOptions::new().perms(Some("rw")).requested_writable(), Some(true));
        assert_eq!(MetadataOptions::new().perms(Some("ro")).requested_writable(), Some(false));
        assert_eq!(MetadataOptions::new().perms(Some("")).requested_writable(), Some(false));
        assert_eq!(MetadataOptions::new().perms(None).requested_writable(), None);
    }
}
