use std::sync::Arc;

use configbus_storage::{KvStore, MemoryKvStore, OpenMode, StoreLimits};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::*;
use crate::codec::{BinaryCodec, Codec};

const NS: &str = "appcfg";

fn setup() -> (Arc<MemoryKvStore>, ConfigBus) {
    let store = Arc::new(MemoryKvStore::new());
    let bus = ConfigBus::new(store.clone(), NS);
    (store, bus)
}

fn sample() -> Document {
    json!({"heartRateMin": 120, "heartRateMax": 180, "fanMode": "auto"})
}

fn encode(doc: &Document) -> Vec<u8> {
    let mut buf = vec![0u8; 512];
    let n = BinaryCodec.encode(doc, &mut buf).unwrap();
    buf.truncate(n);
    buf
}

fn put_text(store: &MemoryKvStore, key: &str, text: &str) {
    let mut h = store.open(NS, OpenMode::ReadWrite).unwrap();
    h.put_string(key, text).unwrap();
}

fn put_bytes(store: &MemoryKvStore, key: &str, bytes: &[u8]) {
    let mut h = store.open(NS, OpenMode::ReadWrite).unwrap();
    h.put_bytes(key, bytes).unwrap();
}

fn exists(store: &MemoryKvStore, key: &str) -> bool {
    store
        .open(NS, OpenMode::ReadOnly)
        .is_ok_and(|h| h.exists(key))
}

#[test]
fn test_save_then_load() {
    let (store, bus) = setup();
    assert!(bus.save("pulsfan", &sample()));
    assert!(exists(&store, "pulsfan:mp"));
    assert!(!exists(&store, "pulsfan"));

    let mut doc = Document::Null;
    assert!(bus.load("pulsfan", &mut doc));
    assert_eq!(doc, sample());
    assert_eq!(bus.inspect("pulsfan").unwrap(), RecordState::Compact);
}

#[test]
fn test_load_absent_clears_document() {
    let (_store, bus) = setup();
    let mut doc = json!({"stale": true});
    assert!(!bus.load("pulsfan", &mut doc));
    assert!(doc.is_null());
}

#[test]
fn test_load_absent_in_existing_namespace() {
    let (store, bus) = setup();
    put_text(&store, "other", "{}");
    let mut doc = json!(1);
    assert!(!bus.load("pulsfan", &mut doc));
    assert!(doc.is_null());
}

#[test]
fn test_legacy_text_is_upgraded_and_promoted() {
    let (store, bus) = setup();
    put_text(&store, "pulsfan", r#"{"heartRateMin":120,"heartRateMax":180,"fanMode":"auto"}"#);
    assert_eq!(bus.inspect("pulsfan").unwrap(), RecordState::LegacyText);

    let mut doc = Document::Null;
    let outcome = bus.try_load("pulsfan", &mut doc, &mut [0u8; 256]).unwrap().unwrap();
    assert_eq!(doc, sample());
    assert_eq!(outcome.source, RecordState::LegacyText);
    assert!(outcome.upgraded);
    assert!(outcome.promoted);

    let h = store.open(NS, OpenMode::ReadOnly).unwrap();
    assert!(h.bytes_len("pulsfan") > 0, "legacy text rewritten as binary");
    assert!(h.bytes_len("pulsfan:mp") > 0);
    drop(h);
    assert_eq!(bus.inspect("pulsfan").unwrap(), RecordState::Compact);
}

#[test]
fn test_legacy_bytes_promoted_without_rewrite() {
    let (store, bus) = setup();
    let blob = encode(&sample());
    put_bytes(&store, "pulsfan", &blob);

    let mut doc = Document::Null;
    let outcome = bus.try_load("pulsfan", &mut doc, &mut [0u8; 256]).unwrap().unwrap();
    assert_eq!(doc, sample());
    assert_eq!(outcome.source, RecordState::LegacyBytes);
    assert!(!outcome.upgraded);
    assert!(outcome.promoted);

    let h = store.open(NS, OpenMode::ReadOnly).unwrap();
    let mut buf = [0u8; 256];
    let n = h.get_bytes("pulsfan", &mut buf).unwrap();
    assert_eq!(&buf[..n], blob.as_slice());
}

#[test]
fn test_compact_takes_precedence() {
    let (store, bus) = setup();
    put_text(&store, "pulsfan", r#"{"heartRateMin":90}"#);
    assert!(bus.save("pulsfan", &json!({"heartRateMin": 130})));

    let mut doc = Document::Null;
    let outcome = bus.try_load("pulsfan", &mut doc, &mut [0u8; 256]).unwrap().unwrap();
    assert_eq!(doc["heartRateMin"], 130);
    assert_eq!(outcome.source, RecordState::Compact);

    // Compact hits never rewrite the legacy entry.
    let h = store.open(NS, OpenMode::ReadOnly).unwrap();
    assert_eq!(h.get_string("pulsfan").unwrap().as_deref(), Some(r#"{"heartRateMin":90}"#));
}

#[test]
fn test_corrupt_compact_falls_back_without_repromoting() {
    let (store, bus) = setup();
    put_bytes(&store, "pulsfan:mp", &[0xc1]);
    put_bytes(&store, "pulsfan", &encode(&sample()));

    let mut doc = Document::Null;
    let outcome = bus.try_load("pulsfan", &mut doc, &mut [0u8; 256]).unwrap().unwrap();
    assert_eq!(doc, sample());
    assert_eq!(outcome.source, RecordState::LegacyBytes);
    assert!(!outcome.promoted);

    let h = store.open(NS, OpenMode::ReadOnly).unwrap();
    assert_eq!(h.bytes_len("pulsfan:mp"), 1);
}

#[test]
fn test_corrupt_legacy_bytes_fail() {
    let (store, bus) = setup();
    put_bytes(&store, "pulsfan", br#"{"heartRateMin":120}"#);
    let mut doc = json!({});
    assert!(!bus.load("pulsfan", &mut doc));
    assert!(doc.is_null());
    assert!(!exists(&store, "pulsfan:mp"));
}

#[test]
fn test_corrupt_legacy_text_fails() {
    let (store, bus) = setup();
    put_text(&store, "pulsfan", "{broken");
    let mut doc = Document::Null;
    assert!(!bus.load("pulsfan", &mut doc));
    assert!(doc.is_null());
}

#[test]
fn test_oversized_stored_blob_rejected() {
    let (store, bus) = setup();
    let bus = bus.with_scratch_capacity(4);
    put_bytes(&store, "pulsfan", &encode(&sample()));
    let mut doc = Document::Null;
    assert!(!bus.load("pulsfan", &mut doc));
}

#[test]
fn test_long_module_id_uses_legacy_key() {
    let (store, bus) = setup();
    let id = "a_long_module";
    let mut scratch = [0u8; 256];
    let state = bus
        .try_save(id, &sample(), &mut scratch, FallbackScratch::Reuse)
        .unwrap();
    assert_eq!(state, RecordState::LegacyBytes);
    assert!(exists(&store, id));
    assert_eq!(bus.inspect(id).unwrap(), RecordState::LegacyBytes);

    let mut doc = Document::Null;
    assert!(bus.load(id, &mut doc));
    assert_eq!(doc, sample());
}

#[test]
fn test_compact_overflow_falls_back_to_larger_legacy_buffer() {
    let (_store, bus) = setup();
    let bus = bus.with_scratch_capacity(8);
    assert!(bus.save("pulsfan", &sample()));
    assert_eq!(bus.inspect("pulsfan").unwrap(), RecordState::LegacyBytes);
}

#[test]
fn test_overflow_writes_nothing() {
    let (store, bus) = setup();
    let bus = bus
        .with_scratch_capacity(8)
        .with_legacy_scratch_capacity(8);
    assert!(!bus.save("pulsfan", &sample()));
    assert_eq!(store.key_count(NS), 0);
    assert_eq!(store.used_bytes(), 0);
}

#[test]
fn test_exhausted_store_keeps_previous_value() {
    let limits = StoreLimits::default().with_capacity(64);
    let store = Arc::new(MemoryKvStore::with_limits(limits));
    let bus = ConfigBus::new(store.clone(), NS);

    assert!(bus.save("pulsfan", &json!({"v": 1})));
    let big = json!({"blob": "x".repeat(100)});
    assert!(!bus.save("pulsfan", &big));

    let mut doc = Document::Null;
    assert!(bus.load("pulsfan", &mut doc));
    assert_eq!(doc, json!({"v": 1}));
}

#[test]
fn test_clear_module_idempotent_and_isolated() {
    let (_store, bus) = setup();
    assert!(bus.save("pulsfan", &sample()));
    assert!(bus.save("blecfg", &json!({"name": "band"})));

    assert!(bus.clear_module("pulsfan"));
    assert!(!bus.clear_module("pulsfan"));

    let mut doc = Document::Null;
    assert!(!bus.load("pulsfan", &mut doc));
    assert!(bus.load("blecfg", &mut doc));
    assert_eq!(doc["name"], "band");
}

#[test]
fn test_clear_module_removes_both_keys() {
    let (store, bus) = setup();
    put_text(&store, "pulsfan", "{}");
    put_bytes(&store, "pulsfan:mp", &encode(&json!({})));
    assert!(bus.clear_module("pulsfan"));
    assert!(!exists(&store, "pulsfan"));
    assert!(!exists(&store, "pulsfan:mp"));
}

#[test]
fn test_clear_all() {
    let (_store, bus) = setup();
    assert!(bus.save("pulsfan", &sample()));
    assert!(bus.save("a_long_module", &sample()));
    assert!(bus.clear_all());

    let mut doc = Document::Null;
    assert!(!bus.load("pulsfan", &mut doc));
    assert!(!bus.load("a_long_module", &mut doc));
}

#[test]
fn test_empty_module_id_rejected_everywhere() {
    let (store, bus) = setup();
    let mut doc = json!({});
    assert!(!bus.save("", &sample()));
    assert!(!bus.load("", &mut doc));
    assert!(doc.is_null());
    assert!(!bus.clear_module(""));
    assert!(matches!(bus.inspect(""), Err(BusError::InvalidArgument(_))));
    assert_eq!(store.used_bytes(), 0);
}

#[test]
fn test_explicit_buffer_tier() {
    let (_store, bus) = setup();
    let mut buf = [0u8; 128];
    assert!(bus.save_compact("pulsfan", &sample(), &mut buf));

    let mut doc = Document::Null;
    let mut read_buf = [0u8; 128];
    assert!(bus.load_compact("pulsfan", &mut doc, &mut read_buf));
    assert_eq!(doc, sample());
}

#[test]
fn test_explicit_tier_rejects_empty_buffer() {
    let (store, bus) = setup();
    assert!(!bus.save_compact("pulsfan", &sample(), &mut []));
    assert!(bus.save("pulsfan", &sample()));

    let mut doc = json!({});
    assert!(!bus.load_compact("pulsfan", &mut doc, &mut []));
    assert!(doc.is_null());
    assert!(exists(&store, "pulsfan:mp"));
}

#[test]
fn test_explicit_tier_too_small_writes_nothing() {
    let (store, bus) = setup();
    let mut buf = [0u8; 4];
    assert!(!bus.save_compact("pulsfan", &sample(), &mut buf));
    assert_eq!(store.key_count(NS), 0);
}

#[test]
fn test_bufferless_load_reads_text_only() {
    let (store, bus) = setup();
    put_text(&store, "pulsfan", r#"{"heartRateMin":120}"#);

    let mut doc = Document::Null;
    let outcome = bus.try_load("pulsfan", &mut doc, &mut []).unwrap().unwrap();
    assert_eq!(doc["heartRateMin"], 120);
    assert!(!outcome.upgraded);
    assert!(!outcome.promoted);
    assert_eq!(bus.inspect("pulsfan").unwrap(), RecordState::LegacyText);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FanConfig {
    heart_rate_min: u32,
    heart_rate_max: u32,
}

#[test]
fn test_typed_round_trip() {
    let (_store, bus) = setup();
    let cfg = FanConfig {
        heart_rate_min: 100,
        heart_rate_max: 170,
    };
    assert!(bus.save_as("pulsfan", &cfg));
    assert_eq!(bus.load_as::<FanConfig>("pulsfan"), Some(cfg));
}

#[test]
fn test_typed_mismatch_is_none() {
    let (_store, bus) = setup();
    assert!(bus.save("pulsfan", &json!({"heartRateMin": "fast"})));
    assert_eq!(bus.load_as::<FanConfig>("pulsfan"), None);
    assert_eq!(bus.load_as::<FanConfig>("absent"), None);
}

#[test]
fn test_from_config() {
    let config = BusConfig {
        namespace: "devcfg".to_owned(),
        scratch_capacity: 512,
        ..BusConfig::default()
    };
    let bus = ConfigBus::from_config(Arc::new(MemoryKvStore::new()), &config);
    assert_eq!(bus.namespace(), "devcfg");
    assert_eq!(bus.scratch_capacity(), 512);
}

#[test]
fn test_default_namespace() {
    let bus = ConfigBus::with_default_namespace(Arc::new(MemoryKvStore::new()));
    assert_eq!(bus.namespace(), DEFAULT_NAMESPACE);
}

#[test]
fn test_namespaces_isolated() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let a = ConfigBus::new(store.clone(), "appcfg");
    let b = ConfigBus::new(store, "devcfg");
    assert!(a.save("pulsfan", &sample()));
    let mut doc = Document::Null;
    assert!(!b.load("pulsfan", &mut doc));
    assert!(b.clear_all());
    assert!(a.load("pulsfan", &mut doc));
}
