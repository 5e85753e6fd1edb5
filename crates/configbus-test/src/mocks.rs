//! Mock implementations for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use configbus_storage::{
    KvHandle, KvStore, MemoryKvStore, OpenMode, StorageError, StorageResult, StoreLimits,
};

/// A failure [`FaultyKvStore`] can be told to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFault {
    /// Opening a namespace in this mode fails.
    OpenFails(OpenMode),
    /// Every write fails with [`StorageError::StorageFull`].
    WritesFail,
    /// Writes to this key fail with [`StorageError::StorageFull`].
    WriteFailsFor(String),
    /// Writes store nothing and report 0 bytes written.
    ShortWrites,
    /// Reads copy the value but report one byte fewer.
    ShortReads,
    /// Removes and clears fail.
    RemovesFail,
}

/// An in-memory store that fails on demand.
///
/// Wraps a [`MemoryKvStore`]; with no faults injected it behaves exactly
/// like it. Faults can be added and cleared while the store is shared.
#[derive(Debug, Default)]
pub struct FaultyKvStore {
    inner: MemoryKvStore,
    faults: Mutex<Vec<StoreFault>>,
    write_attempts: AtomicUsize,
}

impl FaultyKvStore {
    /// Create a store with default limits and no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with explicit limits.
    #[must_use]
    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            inner: MemoryKvStore::with_limits(limits),
            ..Self::default()
        }
    }

    /// Create a store ready to be shared with a bus.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// The wrapped store, bypassing every fault.
    #[must_use]
    pub fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }

    /// Add a fault.
    pub fn inject(&self, fault: StoreFault) {
        self.lock().push(fault);
    }

    /// Make writes to `key` fail.
    pub fn fail_writes_to(&self, key: &str) {
        self.inject(StoreFault::WriteFailsFor(key.to_owned()));
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        self.lock().clear();
    }

    /// Number of `put_bytes`/`put_string` calls made through this store,
    /// including failed ones.
    #[must_use]
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoreFault>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has(&self, pred: impl Fn(&StoreFault) -> bool) -> bool {
        self.lock().iter().any(pred)
    }

    fn check_write(&self, key: &str, len: usize) -> StorageResult<bool> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let fails = self.has(|f| match f {
            StoreFault::WritesFail => true,
            StoreFault::WriteFailsFor(k) => k == key,
            _ => false,
        });
        if fails {
            return Err(StorageError::StorageFull {
                needed: len,
                available: 0,
            });
        }
        Ok(self.has(|f| *f == StoreFault::ShortWrites))
    }

    fn check_remove(&self) -> StorageResult<()> {
        if self.has(|f| *f == StoreFault::RemovesFail) {
            return Err(StorageError::Internal("injected remove failure".to_owned()));
        }
        Ok(())
    }
}

impl KvStore for FaultyKvStore {
    fn open(&self, namespace: &str, mode: OpenMode) -> StorageResult<Box<dyn KvHandle + '_>> {
        if self.has(|f| *f == StoreFault::OpenFails(mode)) {
            return Err(StorageError::Internal(format!(
                "injected open failure for {namespace}"
            )));
        }
        let inner = self.inner.open(namespace, mode)?;
        Ok(Box::new(FaultyHandle { store: self, inner }))
    }

    fn limits(&self) -> &StoreLimits {
        self.inner.limits()
    }
}

struct FaultyHandle<'a> {
    store: &'a FaultyKvStore,
    inner: Box<dyn KvHandle + 'a>,
}

impl KvHandle for FaultyHandle<'_> {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn mode(&self) -> OpenMode {
        self.inner.mode()
    }

    fn exists(&self, key: &str) -> bool {
        self.inner.exists(key)
    }

    fn bytes_len(&self, key: &str) -> usize {
        self.inner.bytes_len(key)
    }

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> StorageResult<usize> {
        let read = self.inner.get_bytes(key, buf)?;
        if self.store.has(|f| *f == StoreFault::ShortReads) {
            return Ok(read.saturating_sub(1));
        }
        Ok(read)
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get_string(key)
    }

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> StorageResult<usize> {
        if self.store.check_write(key, value.len())? {
            return Ok(0);
        }
        self.inner.put_bytes(key, value)
    }

    fn put_string(&mut self, key: &str, value: &str) -> StorageResult<usize> {
        if self.store.check_write(key, value.len())? {
            return Ok(0);
        }
        self.inner.put_string(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        self.store.check_remove()?;
        self.inner.remove(key)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.store.check_remove()?;
        self.inner.clear()
    }
}
