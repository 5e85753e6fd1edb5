//! Test fixtures: documents, buses and pre-seeded legacy records.

use std::sync::Arc;

use configbus_core::{BinaryCodec, Codec, ConfigBus, Document};
use configbus_storage::{KvStore, MemoryKvStore, OpenMode};
use serde_json::json;

/// Namespace every fixture bus is bound to.
pub const TEST_NAMESPACE: &str = "appcfg";

/// Module id with room for a compact key.
pub const TEST_MODULE: &str = "pulsfan";

/// Module id too long for a compact key under the default 15-byte limit.
pub const LONG_MODULE: &str = "a_long_module";

/// A small, flat module document.
#[must_use]
pub fn test_document() -> Document {
    json!({
        "heartRateMin": 120,
        "heartRateMax": 180,
        "fanMode": "auto",
        "enabled": true
    })
}

/// A document with nesting, arrays, floats and negative numbers.
#[must_use]
pub fn test_nested_document() -> Document {
    json!({
        "ble": {"name": "band-7", "txPower": -4, "channels": [37, 38, 39]},
        "zones": [
            {"min": 0, "max": 110, "speed": 0.0},
            {"min": 110, "max": 150, "speed": 0.5},
            {"min": 150, "max": 220, "speed": 1.0}
        ],
        "note": null
    })
}

/// A document whose binary encoding is larger than `bytes`.
#[must_use]
pub fn test_large_document(bytes: usize) -> Document {
    json!({"payload": "x".repeat(bytes)})
}

/// A bus over a fresh in-memory store, plus the store for inspection.
#[must_use]
pub fn test_bus() -> (Arc<MemoryKvStore>, ConfigBus) {
    let store = Arc::new(MemoryKvStore::new());
    let bus = test_bus_over(store.clone());
    (store, bus)
}

/// A bus over `store`, bound to [`TEST_NAMESPACE`].
#[must_use]
pub fn test_bus_over(store: Arc<dyn KvStore>) -> ConfigBus {
    ConfigBus::new(store, TEST_NAMESPACE)
}

/// Binary encoding of `doc`, as the bus would store it.
///
/// # Panics
///
/// Panics if `doc` does not encode within 64 KiB.
#[must_use]
pub fn encode_binary(doc: &Document) -> Vec<u8> {
    let mut buf = vec![0u8; 65_536];
    let len = BinaryCodec.encode(doc, &mut buf).unwrap();
    buf.truncate(len);
    buf
}

/// Store `doc` as native JSON text under the bare module id, the way the
/// legacy firmware wrote it.
///
/// # Panics
///
/// Panics if the store rejects the write.
pub fn seed_legacy_text(store: &dyn KvStore, module_id: &str, doc: &Document) {
    let mut handle = store.open(TEST_NAMESPACE, OpenMode::ReadWrite).unwrap();
    handle.put_string(module_id, &doc.to_string()).unwrap();
}

/// Store `bytes` verbatim under the bare module id.
///
/// # Panics
///
/// Panics if the store rejects the write.
pub fn seed_legacy_bytes(store: &dyn KvStore, module_id: &str, bytes: &[u8]) {
    let mut handle = store.open(TEST_NAMESPACE, OpenMode::ReadWrite).unwrap();
    handle.put_bytes(module_id, bytes).unwrap();
}

/// Store `bytes` verbatim under `key`.
///
/// # Panics
///
/// Panics if the store rejects the write.
pub fn seed_raw(store: &dyn KvStore, key: &str, bytes: &[u8]) {
    let mut handle = store.open(TEST_NAMESPACE, OpenMode::ReadWrite).unwrap();
    handle.put_bytes(key, bytes).unwrap();
}

/// Whether `key` exists in [`TEST_NAMESPACE`].
#[must_use]
pub fn key_exists(store: &dyn KvStore, key: &str) -> bool {
    store
        .open(TEST_NAMESPACE, OpenMode::ReadOnly)
        .is_ok_and(|handle| handle.exists(key))
}

/// Byte length of the blob under `key`, 0 for text or absent keys.
#[must_use]
pub fn blob_len(store: &dyn KvStore, key: &str) -> usize {
    store
        .open(TEST_NAMESPACE, OpenMode::ReadOnly)
        .map_or(0, |handle| handle.bytes_len(key))
}
