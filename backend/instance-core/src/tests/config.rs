// Unit tests for instance configuration load/save/validate

use crate::config::{InstanceConfig, ListenerFaultPolicy, TransportStrategy};
use crate::error::config::ConfigError;
use crate::{APP_IDENTIFIER, DEFAULT_INSTANCE_PORT};

use std::time::Duration;

use tempfile::tempdir;

/// **VALUE**: Verifies the defaults reproduce the fixed rendezvous identity.
///
/// **WHY THIS MATTERS**: Independently launched processes agree on the endpoint only
/// because they share these defaults.
///
/// **BUG THIS CATCHES**: Would catch a changed identifier/port or a default that flips
/// the fault policy.
#[test]
fn given_default_config_then_matches_fixed_identity_and_policies() {
    let config = InstanceConfig::default();

    assert_eq!(config.app_identifier, APP_IDENTIFIER);
    assert_eq!(config.loopback_port, DEFAULT_INSTANCE_PORT);
    assert_eq!(config.transport, TransportStrategy::Native);
    assert_eq!(config.fault_policy, ListenerFaultPolicy::StopOnFault);
    assert_eq!(config.notify_timeout(), Duration::from_millis(200));
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies a missing file yields defaults rather than an error.
///
/// **WHY THIS MATTERS**: First launch has no config; startup must not fail.
///
/// **BUG THIS CATCHES**: Would catch if `load()` errors on a missing file.
#[test]
fn given_missing_file_when_loading_then_defaults() {
    let dir = tempdir().unwrap();

    let config = InstanceConfig::load(dir.path()).unwrap();

    assert_eq!(config, InstanceConfig::default());
}

/// **VALUE**: Verifies save then load preserves every field.
///
/// **WHY THIS MATTERS**: Users switch to the loopback strategy through this file.
///
/// **BUG THIS CATCHES**: Would catch a field missing from serialization.
#[test]
fn given_saved_config_when_loading_then_same_values() {
    // GIVEN: A non-default config saved to disk
    let dir = tempdir().unwrap();
    let config = InstanceConfig {
        transport: TransportStrategy::Loopback,
        loopback_port: 40123,
        fault_policy: ListenerFaultPolicy::Resilient,
        notify_timeout_ms: 350,
        ..InstanceConfig::default()
    };
    config.save(dir.path()).unwrap();

    // WHEN: Loading it back
    let loaded = InstanceConfig::load(dir.path()).unwrap();

    // THEN: Identical, and no temp file left behind
    assert_eq!(loaded, config);
    assert!(!dir.path().join("instance.json.tmp").exists());
}

/// **VALUE**: Verifies partial files are completed with defaults.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` on a field.
#[test]
fn given_partial_json_when_loading_then_missing_fields_defaulted() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("instance.json"), r#"{ "transport": "Loopback" }"#).unwrap();

    let config = InstanceConfig::load(dir.path()).unwrap();

    assert_eq!(config.transport, TransportStrategy::Loopback);
    assert_eq!(config.loopback_port, DEFAULT_INSTANCE_PORT);
    assert_eq!(config.app_identifier, APP_IDENTIFIER);
}

/// **VALUE**: Verifies corrupt JSON is reported as a parse error.
///
/// **WHY THIS MATTERS**: The shell logs this and falls back to defaults; it needs to know.
///
/// **BUG THIS CATCHES**: Would catch if parse errors are swallowed into defaults here.
#[test]
fn given_corrupt_json_when_loading_then_parse_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("instance.json"), "{ not json").unwrap();

    let result = InstanceConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies identifiers that cannot be a file or pipe name are rejected.
///
/// **WHY THIS MATTERS**: A `/` in the identifier would place the socket in another
/// directory; an empty one would collide with the temp dir itself.
///
/// **BUG THIS CATCHES**: Would catch if validation only checks length.
#[test]
fn given_invalid_identifiers_when_validating_then_rejected() {
    let too_long = "x".repeat(65);

    for identifier in ["", "../escape", "with space", too_long.as_str()] {
        let config = InstanceConfig {
            app_identifier: identifier.to_string(),
            ..InstanceConfig::default()
        };

        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "Identifier {identifier:?} should be rejected"
        );
    }
}

/// **VALUE**: Verifies zero port and zero timeouts are rejected.
///
/// **BUG THIS CATCHES**: A zero notify timeout would make every notification fail.
#[test]
fn given_zero_port_or_timeout_when_validating_then_rejected() {
    let zero_port = InstanceConfig {
        loopback_port: 0,
        ..InstanceConfig::default()
    };
    let zero_timeout = InstanceConfig {
        notify_timeout_ms: 0,
        ..InstanceConfig::default()
    };
    let future_version = InstanceConfig {
        version: 99,
        ..InstanceConfig::default()
    };

    assert!(zero_port.validate().is_err());
    assert!(zero_timeout.validate().is_err());
    assert!(future_version.validate().is_err());
}
