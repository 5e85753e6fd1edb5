//! Configbus Storage - Namespaced key-value stores for module records.
//!
//! Provides the store interface the persistence engine is written against,
//! plus two backends:
//!
//! # [`MemoryKvStore`]
//!
//! Namespaced in-memory store. Enforces the same key, namespace and value
//! limits as a constrained embedded store, and can be given a total capacity
//! to simulate exhausted storage.
//!
//! # [`FileKvStore`]
//!
//! One JSON file per namespace under a root directory, rewritten atomically
//! on every mutation.
//!
//! # Model
//!
//! | Concept | Type |
//! |---------|------|
//! | Store | [`KvStore`] (`Send + Sync`, shared as `Arc<dyn KvStore>`) |
//! | Open namespace | [`KvHandle`] (closed on drop) |
//! | Value | [`StoredValue`]: bytes or native text |
//! | Limits | [`StoreLimits`]: 15-character keys and namespaces by default |
//!
//! The `config` feature adds `From<&configbus_config::LimitsConfig>` for
//! [`StoreLimits`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod file;
pub mod kv;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileKvStore;
pub use kv::{
    DEFAULT_MAX_KEY_LEN, DEFAULT_MAX_NAMESPACE_LEN, DEFAULT_MAX_VALUE_LEN, KvHandle, KvStore,
    OpenMode, StoreLimits, StoredValue,
};
pub use memory::MemoryKvStore;
