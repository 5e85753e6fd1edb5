//! Configuration flows into the store limits, the bus and the logger.

mod common;

use std::sync::Arc;

use configbus_config::BusConfig;
use configbus_core::{ConfigBus, RecordState};
use configbus_storage::{MemoryKvStore, StoreLimits};
use configbus_telemetry::{LogConfig, LogFormat};
use configbus_test::test_document;
use serde::{Deserialize, Serialize};

use common::load;

fn bus_from(config: &BusConfig) -> ConfigBus {
    let store = MemoryKvStore::with_limits(StoreLimits::from(&config.limits));
    ConfigBus::from_config(Arc::new(store), config)
}

#[test]
fn test_defaults_wire_up() {
    let config = BusConfig::from_toml_str("").unwrap();
    let bus = bus_from(&config);
    assert_eq!(bus.namespace(), "appcfg");
    assert!(bus.save("pulsfan", &test_document()));
    assert_eq!(bus.inspect("pulsfan").unwrap(), RecordState::Compact);
}

#[test]
fn test_key_limit_controls_compact_derivation() {
    let config = BusConfig::from_toml_str("[limits]\nmax_key_len = 8\n").unwrap();
    let bus = bus_from(&config);

    // "pulsfan:mp" is 10 bytes, over the configured limit.
    assert!(bus.save("pulsfan", &test_document()));
    assert_eq!(bus.inspect("pulsfan").unwrap(), RecordState::LegacyBytes);
    assert_eq!(load(&bus, "pulsfan"), Some(test_document()));
}

#[test]
fn test_scratch_capacity_bounds_saves() {
    let config =
        BusConfig::from_toml_str("scratch_capacity = 16\nlegacy_scratch_capacity = 16\n").unwrap();
    let bus = bus_from(&config);
    assert!(!bus.save("pulsfan", &test_document()));
    assert!(bus.save("tiny", &serde_json::json!({"a": 1})));
}

#[test]
fn test_namespace_from_config() {
    let config = BusConfig::from_toml_str("namespace = \"blecfg\"").unwrap();
    let store = Arc::new(MemoryKvStore::new());
    let bus = ConfigBus::from_config(store.clone(), &config);
    assert!(bus.save("pulsfan", &test_document()));
    assert_eq!(store.key_count("blecfg"), 1);
    assert_eq!(store.key_count("appcfg"), 0);
}

#[test]
fn test_logging_config_converts() {
    let config = BusConfig::from_toml_str(
        "[logging]\nlevel = \"debug\"\nformat = \"json\"\ndirectives = [\"configbus_core=trace\"]\n",
    )
    .unwrap();
    let log = LogConfig::try_from(&config.logging).unwrap();
    assert_eq!(log.level, "debug");
    assert_eq!(log.format, LogFormat::Json);
    assert_eq!(log.directives, vec!["configbus_core=trace".to_owned()]);
    assert!(log.build_filter().is_ok());
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FanSettings {
    heart_rate_min: u32,
    heart_rate_max: u32,
    fan_mode: String,
    enabled: bool,
}

#[test]
fn test_typed_access_reads_untyped_saves() {
    let bus = bus_from(&BusConfig::default());
    assert!(bus.save("pulsfan", &test_document()));
    let settings: FanSettings = bus.load_as("pulsfan").unwrap();
    assert_eq!(settings.fan_mode, "auto");
    assert!(settings.enabled);

    assert!(bus.save_as("pulsfan", &FanSettings { heart_rate_min: 100, ..settings }));
    assert_eq!(
        bus.load_as::<FanSettings>("pulsfan").map(|s| s.heart_rate_min),
        Some(100)
    );
}
