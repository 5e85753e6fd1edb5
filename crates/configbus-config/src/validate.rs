//! Post-merge configuration validation.
//!
//! Validates that deserialized [`BusConfig`](crate::BusConfig) values are
//! within acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::BusConfig;

/// Largest scratch buffer a bus may allocate per call (64 KiB).
pub const MAX_SCRATCH_CAPACITY: usize = 65_536;

/// Length of the compact-key suffix; keys must leave room for it.
const COMPACT_SUFFIX_LEN: usize = 3;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &BusConfig) -> ConfigResult<()> {
    validate_limits(config)?;
    validate_namespace(config)?;
    validate_scratch(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_limits(config: &BusConfig) -> ConfigResult<()> {
    let l = &config.limits;

    if l.max_key_len <= COMPACT_SUFFIX_LEN {
        return Err(ConfigError::ValidationError {
            field: "limits.max_key_len".to_owned(),
            message: format!(
                "max_key_len {} leaves no room for a module id plus the {COMPACT_SUFFIX_LEN}-character compact suffix",
                l.max_key_len
            ),
        });
    }

    if l.max_namespace_len == 0 {
        return Err(ConfigError::ValidationError {
            field: "limits.max_namespace_len".to_owned(),
            message: "max_namespace_len must be at least 1".to_owned(),
        });
    }

    if l.max_value_len == 0 {
        return Err(ConfigError::ValidationError {
            field: "limits.max_value_len".to_owned(),
            message: "max_value_len must be at least 1".to_owned(),
        });
    }

    Ok(())
}

fn validate_namespace(config: &BusConfig) -> ConfigResult<()> {
    let ns = &config.namespace;

    if ns.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "namespace".to_owned(),
            message: "namespace must not be empty".to_owned(),
        });
    }

    if ns.len() > config.limits.max_namespace_len {
        return Err(ConfigError::ValidationError {
            field: "namespace".to_owned(),
            message: format!(
                "namespace '{ns}' is {} bytes; limit is {}",
                ns.len(),
                config.limits.max_namespace_len
            ),
        });
    }

    Ok(())
}

fn validate_scratch(config: &BusConfig) -> ConfigResult<()> {
    for (field, value) in [
        ("scratch_capacity", config.scratch_capacity),
        ("legacy_scratch_capacity", config.legacy_scratch_capacity),
    ] {
        if value == 0 || value > MAX_SCRATCH_CAPACITY {
            return Err(ConfigError::ValidationError {
                field: field.to_owned(),
                message: format!("{field} must be between 1 and {MAX_SCRATCH_CAPACITY}"),
            });
        }
    }
    Ok(())
}

fn validate_logging(config: &BusConfig) -> ConfigResult<()> {
    let log = &config.logging;

    if !matches!(
        log.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unknown log level '{}'; expected one of: trace, debug, info, warn, error",
                log.level
            ),
        });
    }

    if !matches!(log.format.as_str(), "pretty" | "compact" | "json") {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unknown log format '{}'; expected one of: pretty, compact, json",
                log.format
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&BusConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let mut config = BusConfig::default();
        config.namespace = String::new();
        assert_eq!(field_of(validate(&config)), "namespace");
    }

    #[test]
    fn test_namespace_over_limit_rejected() {
        let mut config = BusConfig::default();
        config.namespace = "much_too_long_namespace".to_owned();
        assert_eq!(field_of(validate(&config)), "namespace");
    }

    #[test]
    fn test_zero_scratch_rejected() {
        let mut config = BusConfig::default();
        config.scratch_capacity = 0;
        assert_eq!(field_of(validate(&config)), "scratch_capacity");
    }

    #[test]
    fn test_oversized_legacy_scratch_rejected() {
        let mut config = BusConfig::default();
        config.legacy_scratch_capacity = MAX_SCRATCH_CAPACITY + 1;
        assert_eq!(field_of(validate(&config)), "legacy_scratch_capacity");
    }

    #[test]
    fn test_key_len_must_fit_suffix() {
        let mut config = BusConfig::default();
        config.limits.max_key_len = 3;
        assert_eq!(field_of(validate(&config)), "limits.max_key_len");
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = BusConfig::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = BusConfig::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }
}
