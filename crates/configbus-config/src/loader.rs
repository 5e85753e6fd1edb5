//! Config file loading.
//!
//! Implements the `BusConfig::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file, if one was given and exists
//! 3. Apply `CONFIGBUS_*` environment overrides
//! 4. Deserialize merged tree → `BusConfig`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::BusConfig;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (64 KiB).
const MAX_CONFIG_FILE_SIZE: u64 = 65_536;

/// Load the configuration: defaults, then `path` (if present), then the
/// process environment.
///
/// A missing file is not an error; the defaults are used.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is malformed, an environment
/// override does not parse, or the merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<BusConfig> {
    load_with_env(path, &collect_env_vars())
}

/// Same as [`load`] with an explicit environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(
    path: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<BusConfig> {
    let mut merged = parse_defaults()?;

    if let Some(path) = path {
        if let Some(overlay) = try_load_file(path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %path.display(), "loaded config file");
        }
    }

    let env_count = apply_env_overrides(&mut merged, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    finish(merged, "<merged config>")
}

/// Load a config from a specific file on top of the defaults, without
/// environment overrides.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<BusConfig> {
    let Some(overlay) = try_load_file(path)? else {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    };
    let mut merged = parse_defaults()?;
    deep_merge(&mut merged, &overlay);
    finish(merged, &path.display().to_string())
}

/// Parse a TOML string on top of the defaults, without environment
/// overrides.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string is malformed or fails validation.
pub fn from_toml_str(content: &str) -> ConfigResult<BusConfig> {
    let overlay: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<string>".to_owned(),
        source: e,
    })?;
    let mut merged = parse_defaults()?;
    deep_merge(&mut merged, &overlay);
    finish(merged, "<string>")
}

fn parse_defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn finish(merged: toml::Value, origin: &str) -> ConfigResult<BusConfig> {
    let config: BusConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: origin.to_owned(),
                source: e,
            })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{ENV_NAMESPACE, ENV_SCRATCH_CAPACITY};

    #[test]
    fn test_defaults_parse() {
        let val: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        assert!(val.as_table().unwrap().contains_key("namespace"));
        assert!(val.as_table().unwrap().contains_key("limits"));
        assert!(val.as_table().unwrap().contains_key("logging"));
    }

    #[test]
    fn test_defaults_match_default_impl() {
        let config: BusConfig = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, BusConfig::default());
    }

    #[test]
    fn test_load_without_file() {
        let config = load_with_env(None, &HashMap::new()).unwrap();
        assert_eq!(config.namespace, "appcfg");
        assert_eq!(config.scratch_capacity, 2048);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_with_env(
            Some(Path::new("/nonexistent/configbus.toml")),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(config, BusConfig::default());
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/configbus.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configbus.toml");
        std::fs::write(
            &path,
            "namespace = \"filecfg\"\nscratch_capacity = 1024\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert(ENV_NAMESPACE.to_owned(), "envcfg".to_owned());

        let config = load_with_env(Some(&path), &env).unwrap();
        assert_eq!(config.namespace, "envcfg");
        assert_eq!(config.scratch_capacity, 1024);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_override_is_validated() {
        let mut env = HashMap::new();
        env.insert(ENV_SCRATCH_CAPACITY.to_owned(), "0".to_owned());
        let result = load_with_env(None, &env);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_from_toml_str() {
        let config = from_toml_str("namespace = \"blecfg\"").unwrap();
        assert_eq!(config.namespace, "blecfg");
        assert!(from_toml_str("namespace = ").is_err());
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let result = from_toml_str("scratch_capacity = \"big\"");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(70_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }
}
