//! Verbose level to per-subsystem level mapping.

use logging::{Subsystem, VerbosityConfig};

#[test]
fn level_zero_keeps_everything_at_warn() {
    let config = VerbosityConfig::from_verbose_level(0);
    for subsystem in Subsystem::ALL {
        assert_eq!(config.level(subsystem), 0, "{subsystem:?}");
    }
}

#[test]
fn level_one_enables_info_except_protocol() {
    let config = VerbosityConfig::from_verbose_level(1);
    assert_eq!(config.level(Subsystem::Transfer), 1);
    assert_eq!(config.level(Subsystem::Merge), 1);
    assert_eq!(config.level(Subsystem::Send), 1);
    assert_eq!(config.level(Subsystem::Fs), 1);
    assert_eq!(config.level(Subsystem::Protocol), 0);
}

#[test]
fn levels_are_monotonic() {
    for level in 0..5_u8 {
        let lower = VerbosityConfig::from_verbose_level(level);
        let higher = VerbosityConfig::from_verbose_level(level + 1);
        for subsystem in Subsystem::ALL {
            assert!(
                higher.level(subsystem) >= lower.level(subsystem),
                "{subsystem:?} dropped between -v{level} and -v{}",
                level + 1
            );
        }
    }
}

#[test]
fn high_levels_saturate_at_trace() {
    let config = VerbosityConfig::from_verbose_level(9);
    assert!(config.directives().contains("client::protocol=trace"));
}

#[cfg(feature = "serde")]
#[test]
fn config_serializes_as_plain_levels() {
    let config = VerbosityConfig::from_verbose_level(2);
    let json = serde_json::to_value(&config).expect("serialize");
    assert_eq!(json["merge"], 2);
    let back: VerbosityConfig = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, config);
}
