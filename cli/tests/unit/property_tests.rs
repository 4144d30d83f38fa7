//! Property-based tests for port parsing and config validation.

use cloudimg_cli::domain::config::{CliConfig, validate_config_value};
use cloudimg_cli::domain::port::{parse_alternate_ports, parse_port};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_parse_port_roundtrips_valid_ports(port in 1u16..=u16::MAX) {
        prop_assert_eq!(parse_port(&port.to_string()), Some(port));
    }

    #[test]
    fn prop_parse_port_never_yields_zero(raw in "\\PC*") {
        prop_assert_ne!(parse_port(&raw), Some(0));
    }

    #[test]
    fn prop_alternate_ports_preserve_order(ports in prop::collection::vec(1u16..=u16::MAX, 0..8)) {
        let csv = ports.iter().map(u16::to_string).collect::<Vec<_>>().join(",");
        prop_assert_eq!(parse_alternate_ports(&csv), ports);
    }

    #[test]
    fn prop_alternate_ports_skip_garbage(
        ports in prop::collection::vec(1u16..=u16::MAX, 1..6),
        junk in "[a-z]{1,5}",
    ) {
        let mut entries: Vec<String> = ports.iter().map(u16::to_string).collect();
        entries.insert(0, junk.clone());
        entries.push(format!(" {junk} "));
        prop_assert_eq!(parse_alternate_ports(&entries.join(",")), ports);
    }

    #[test]
    fn prop_positive_durations_are_accepted(secs in 1u64..=u64::from(u32::MAX)) {
        prop_assert!(validate_config_value("poll.interval_secs", &secs.to_string()).is_ok());
        let mut config = CliConfig::default();
        prop_assert!(config.set("poll.timeout_secs", &secs.to_string()).is_ok());
        prop_assert_eq!(config.poll.timeout_secs, secs);
    }
}
