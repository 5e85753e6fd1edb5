//! In-memory [`KvStore`] backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvHandle, KvStore, OpenMode, StoreLimits, StoredValue};

type Namespaces = HashMap<String, BTreeMap<String, StoredValue>>;

/// Namespaced in-memory store.
///
/// Enforces the same [`StoreLimits`] as a persistent backend, including an
/// optional total capacity so tests can exercise exhausted storage.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    limits: StoreLimits,
    namespaces: RwLock<Namespaces>,
}

impl MemoryKvStore {
    /// Create an empty store with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given limits.
    #[must_use]
    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            limits,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Total value bytes currently held across all namespaces.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        used_bytes(&self.read_namespaces())
    }

    /// Number of keys in `namespace`, or 0 if it does not exist.
    #[must_use]
    pub fn key_count(&self, namespace: &str) -> usize {
        self.read_namespaces()
            .get(namespace)
            .map(BTreeMap::len)
            .unwrap_or_default()
    }

    // Every mutation is a single map operation, so a poisoned lock still
    // guards a consistent map.
    fn read_namespaces(&self) -> RwLockReadGuard<'_, Namespaces> {
        self.namespaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_namespaces(&self) -> RwLockWriteGuard<'_, Namespaces> {
        self.namespaces.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn used_bytes(namespaces: &Namespaces) -> usize {
    namespaces
        .values()
        .flat_map(BTreeMap::values)
        .fold(0usize, |acc, v| acc.saturating_add(v.len()))
}

impl KvStore for MemoryKvStore {
    fn open(&self, namespace: &str, mode: OpenMode) -> StorageResult<Box<dyn KvHandle + '_>> {
        self.limits.check_namespace(namespace)?;

        let mut namespaces = self.write_namespaces();
        if !namespaces.contains_key(namespace) {
            if !mode.is_writable() {
                return Err(StorageError::NamespaceNotFound(namespace.to_owned()));
            }
            namespaces.insert(namespace.to_owned(), BTreeMap::new());
        }

        Ok(Box::new(MemoryHandle {
            store: self,
            namespace: namespace.to_owned(),
            mode,
        }))
    }

    fn limits(&self) -> &StoreLimits {
        &self.limits
    }
}

struct MemoryHandle<'a> {
    store: &'a MemoryKvStore,
    namespace: String,
    mode: OpenMode,
}

impl MemoryHandle<'_> {
    fn with_value<R>(&self, key: &str, f: impl FnOnce(Option<&StoredValue>) -> R) -> R {
        let ns = self.store.read_namespaces();
        f(ns.get(&self.namespace).and_then(|entries| entries.get(key)))
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(StorageError::ReadOnly(self.namespace.clone()))
        }
    }

    fn put(&mut self, key: &str, value: StoredValue) -> StorageResult<usize> {
        self.ensure_writable()?;
        let limits = &self.store.limits;
        limits.check_key(key)?;
        limits.check_value(key, value.len())?;

        let mut namespaces = self.store.write_namespaces();

        if let Some(capacity) = limits.capacity {
            let replaced = namespaces
                .get(&self.namespace)
                .and_then(|entries| entries.get(key))
                .map_or(0, StoredValue::len);
            let used = used_bytes(&namespaces).saturating_sub(replaced);
            let available = capacity.saturating_sub(used);
            if value.len() > available {
                return Err(StorageError::StorageFull {
                    needed: value.len(),
                    available,
                });
            }
        }

        let written = value.len();
        namespaces
            .entry(self.namespace.clone())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(written)
    }
}

impl KvHandle for MemoryHandle<'_> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn exists(&self, key: &str) -> bool {
        self.with_value(key, |v| v.is_some())
    }

    fn bytes_len(&self, key: &str) -> usize {
        self.with_value(key, |v| v.map_or(0, StoredValue::blob_len))
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> StorageResult<usize> {
        self.with_value(key, |v| match v {
            Some(value) => value.copy_bytes_into(key, buf),
            None => Err(StorageError::NotFound(key.to_owned())),
        })
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        let namespaces = self.store.read_namespaces();
        Ok(namespaces
            .get(&self.namespace)
            .and_then(|entries| entries.get(key))
            .and_then(|v| match v {
                StoredValue::Text(s) => Some(s.clone()),
                StoredValue::Bytes(_) => None,
            }))
    }

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> StorageResult<usize> {
        self.put(key, StoredValue::Bytes(value.to_vec()))
    }

    fn put_string(&mut self, key: &str, value: &str) -> StorageResult<usize> {
        self.put(key, StoredValue::Text(value.to_owned()))
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        self.ensure_writable()?;
        let mut namespaces = self.store.write_namespaces();
        Ok(namespaces
            .get_mut(&self.namespace)
            .is_some_and(|entries| entries.remove(key).is_some()))
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.ensure_writable()?;
        let mut namespaces = self.store.write_namespaces();
        if let Some(entries) = namespaces.get_mut(&self.namespace) {
            entries.clear();
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHandle")
            .field("namespace", &self.namespace)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
