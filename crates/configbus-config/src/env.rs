//! Environment variable overrides.
//!
//! Overrides are applied to the merged TOML tree before deserialization, so
//! they take precedence over both the embedded defaults and any config file.

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};

/// Overrides `namespace`.
pub const ENV_NAMESPACE: &str = "CONFIGBUS_NAMESPACE";
/// Overrides `scratch_capacity`.
pub const ENV_SCRATCH_CAPACITY: &str = "CONFIGBUS_SCRATCH_CAPACITY";
/// Overrides `logging.level`.
pub const ENV_LOG_LEVEL: &str = "CONFIGBUS_LOG_LEVEL";
/// Overrides `logging.format`.
pub const ENV_LOG_FORMAT: &str = "CONFIGBUS_LOG_FORMAT";

/// Snapshot the `CONFIGBUS_*` environment variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("CONFIGBUS_"))
        .collect()
}

/// Apply overrides from `env_vars` onto the merged tree.
///
/// Returns the number of overrides applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric override does not parse.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied = 0usize;

    if let Some(ns) = env_vars.get(ENV_NAMESPACE) {
        set_path(merged, &["namespace"], toml::Value::String(ns.clone()));
        applied = applied.saturating_add(1);
    }

    if let Some(raw) = env_vars.get(ENV_SCRATCH_CAPACITY) {
        let capacity: i64 = raw.trim().parse().map_err(|e| ConfigError::EnvError {
            var: ENV_SCRATCH_CAPACITY.to_owned(),
            message: format!("'{raw}' is not an integer: {e}"),
        })?;
        set_path(merged, &["scratch_capacity"], toml::Value::Integer(capacity));
        applied = applied.saturating_add(1);
    }

    if let Some(level) = env_vars.get(ENV_LOG_LEVEL) {
        set_path(
            merged,
            &["logging", "level"],
            toml::Value::String(level.to_lowercase()),
        );
        applied = applied.saturating_add(1);
    }

    if let Some(format) = env_vars.get(ENV_LOG_FORMAT) {
        set_path(
            merged,
            &["logging", "format"],
            toml::Value::String(format.to_lowercase()),
        );
        applied = applied.saturating_add(1);
    }

    Ok(applied)
}

/// Set a dotted path in a TOML tree, creating intermediate tables.
fn set_path(root: &mut toml::Value, path: &[&str], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for key in parents {
        let toml::Value::Table(table) = node else {
            return;
        };
        node = table
            .entry((*key).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let toml::Value::Table(table) = node {
        table.insert((*last).to_owned(), value);
    }
}
