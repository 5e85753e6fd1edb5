//! Configbus Core - per-module configuration persistence over a small
//! key-value store.
//!
//! Each module's configuration is a JSON-shaped [`Document`] stored under
//! keys derived from the module id:
//!
//! | Key | Contents | Written by |
//! |-----|----------|------------|
//! | `{module_id}:mp` | MessagePack blob | [`ConfigBus::save`], promotion on load |
//! | `{module_id}` | MessagePack blob or legacy JSON text | save fallback, upgrade on load |
//!
//! Loading prefers the compact record and falls back to the legacy one,
//! migrating legacy records forward as a side effect. Saving always targets
//! the compact record and only falls back to the bare key when that fails.
//!
//! All encoding happens into bounded scratch buffers; an oversized document
//! is rejected before the store is touched.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use configbus_core::ConfigBus;
//! use configbus_storage::MemoryKvStore;
//! use serde_json::json;
//!
//! let bus = ConfigBus::with_default_namespace(Arc::new(MemoryKvStore::new()));
//! assert!(bus.save("pulsfan", &json!({"heartRateMin": 120})));
//!
//! let mut doc = serde_json::Value::Null;
//! assert!(bus.load("pulsfan", &mut doc));
//! assert_eq!(doc["heartRateMin"], 120);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod codec;
pub mod engine;
pub mod error;
pub mod keys;
pub mod state;

pub use codec::{BinaryCodec, Codec, TextCodec};
pub use engine::{ConfigBus, DEFAULT_NAMESPACE, DEFAULT_SCRATCH_CAPACITY};
pub use error::{BusError, BusResult};
pub use keys::{COMPACT_SUFFIX, RecordKeys, derive_compact_key, validate_module_id};
pub use state::RecordState;

/// A module's configuration: any JSON-shaped value, usually an object.
pub type Document = serde_json::Value;
