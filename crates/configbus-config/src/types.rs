//! Configuration types for configbus.
//!
//! Every struct implements [`Default`] with the embedded defaults so that a
//! partial TOML file (or none at all) still produces a working configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level BusConfig
// ---------------------------------------------------------------------------

/// Root configuration for a [`ConfigBus`](https://docs.rs/configbus-core).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Store namespace all module records live in.
    pub namespace: String,
    /// Scratch buffer size, in bytes, for compact encoding and reads.
    pub scratch_capacity: usize,
    /// Scratch buffer size, in bytes, for the legacy fallback path.
    pub legacy_scratch_capacity: usize,
    /// Limits of the underlying key-value store.
    pub limits: LimitsConfig,
    /// Logging level and format.
    pub logging: LoggingConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            namespace: "appcfg".to_owned(),
            scratch_capacity: 2048,
            legacy_scratch_capacity: 2048,
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// LimitsConfig
// ---------------------------------------------------------------------------

/// Key, namespace and value limits of the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum key length in bytes.
    pub max_key_len: usize,
    /// Maximum namespace length in bytes.
    pub max_namespace_len: usize,
    /// Maximum size of one stored value in bytes.
    pub max_value_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_key_len: 15,
            max_namespace_len: 15,
            max_value_len: 4000,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["configbus_core=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
