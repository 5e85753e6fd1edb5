//! Shared setup for integration tests.

use std::sync::Arc;

use configbus_core::{ConfigBus, Document};
use configbus_test::{FaultyKvStore, init_test_tracing, test_bus_over};

/// A bus over a fault-injecting store, with tracing routed to the test
/// output.
#[allow(dead_code)]
pub fn faulty_bus() -> (Arc<FaultyKvStore>, ConfigBus) {
    init_test_tracing();
    let store = FaultyKvStore::shared();
    let bus = test_bus_over(store.clone());
    (store, bus)
}

/// Load `module_id`, returning the document on success.
#[allow(dead_code)]
pub fn load(bus: &ConfigBus, module_id: &str) -> Option<Document> {
    let mut doc = Document::Null;
    if bus.load(module_id, &mut doc) {
        Some(doc)
    } else {
        assert!(doc.is_null(), "failed load must leave the document cleared");
        None
    }
}
