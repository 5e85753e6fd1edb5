//! The format-negotiating persistence engine.
//!
//! A [`ConfigBus`] is bound to one store namespace. Every operation opens
//! and drops its own store handle, and every buffer it needs is allocated
//! per call with a fallible reservation capped at the configured scratch
//! capacity.
//!
//! Public operations return `bool`. Failures are reported as `tracing`
//! events carrying the module id and the [`BusError`](crate::BusError).

mod load;
mod save;

use std::fmt;
use std::sync::Arc;

use configbus_config::BusConfig;
use configbus_storage::{KvHandle, KvStore, OpenMode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::Document;
use crate::error::{BusError, BusResult};
use crate::keys::RecordKeys;
use crate::state::RecordState;

use self::save::FallbackScratch;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "appcfg";

/// Default per-call scratch buffer size in bytes.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 2048;

/// Loads, saves and clears per-module configuration documents in one
/// namespace of a [`KvStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct ConfigBus {
    namespace: String,
    store: Arc<dyn KvStore>,
    scratch_capacity: usize,
    legacy_scratch_capacity: usize,
}

impl ConfigBus {
    /// Create a bus over `store`, bound to `namespace`.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
            legacy_scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
        }
    }

    /// Create a bus bound to [`DEFAULT_NAMESPACE`].
    pub fn with_default_namespace(store: Arc<dyn KvStore>) -> Self {
        Self::new(store, DEFAULT_NAMESPACE)
    }

    /// Create a bus from a loaded configuration.
    pub fn from_config(store: Arc<dyn KvStore>, config: &BusConfig) -> Self {
        Self::new(store, config.namespace.clone())
            .with_scratch_capacity(config.scratch_capacity)
            .with_legacy_scratch_capacity(config.legacy_scratch_capacity)
    }

    /// Set the scratch size used by [`load`](Self::load) and the compact
    /// half of [`save`](Self::save).
    #[must_use]
    pub fn with_scratch_capacity(mut self, capacity: usize) -> Self {
        self.scratch_capacity = capacity;
        self
    }

    /// Set the scratch size used when [`save`](Self::save) falls back to the
    /// legacy key.
    #[must_use]
    pub fn with_legacy_scratch_capacity(mut self, capacity: usize) -> Self {
        self.legacy_scratch_capacity = capacity;
        self
    }

    /// The namespace this bus is bound to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Scratch capacity of the convenience operations.
    #[must_use]
    pub fn scratch_capacity(&self) -> usize {
        self.scratch_capacity
    }

    fn max_key_len(&self) -> usize {
        self.store.limits().max_key_len
    }

    fn open(&self, mode: OpenMode) -> BusResult<Box<dyn KvHandle + '_>> {
        self.store
            .open(&self.namespace, mode)
            .map_err(|source| BusError::StoreOpenFailed {
                namespace: self.namespace.clone(),
                source,
            })
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Load the stored document for `module_id` into `doc`.
    ///
    /// Prefers the compact record, then the legacy one. A legacy text record
    /// is rewritten as binary, and any legacy record is copied to the compact
    /// key; neither write affects the result.
    ///
    /// Returns `false` and leaves `doc` as `null` if nothing could be loaded.
    pub fn load(&self, module_id: &str, doc: &mut Document) -> bool {
        let mut scratch = alloc_scratch(self.scratch_capacity);
        self.report_load(module_id, doc, &mut scratch)
    }

    /// [`load`](Self::load) using a caller-provided buffer for reads and
    /// re-encoding.
    pub fn load_compact(&self, module_id: &str, doc: &mut Document, buf: &mut [u8]) -> bool {
        if buf.is_empty() {
            *doc = Document::Null;
            let e = BusError::InvalidArgument("buffer is empty".to_owned());
            warn!(namespace = %self.namespace, module = module_id, error = %e, "load failed");
            return false;
        }
        self.report_load(module_id, doc, buf)
    }

    fn report_load(&self, module_id: &str, doc: &mut Document, scratch: &mut [u8]) -> bool {
        match self.try_load(module_id, doc, scratch) {
            Ok(Some(outcome)) => {
                debug!(
                    namespace = %self.namespace,
                    module = module_id,
                    source = %outcome.source,
                    upgraded = outcome.upgraded,
                    promoted = outcome.promoted,
                    "loaded module config"
                );
                true
            },
            Ok(None) => {
                *doc = Document::Null;
                debug!(namespace = %self.namespace, module = module_id, "no stored config");
                false
            },
            Err(e) => {
                *doc = Document::Null;
                warn!(namespace = %self.namespace, module = module_id, error = %e, "load failed");
                false
            },
        }
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Persist `doc` for `module_id`, preferring the compact key.
    ///
    /// Returns `true` if the document was durably written under either key.
    pub fn save(&self, module_id: &str, doc: &Document) -> bool {
        let mut scratch = alloc_scratch(self.scratch_capacity);
        let result = self.try_save(
            module_id,
            doc,
            &mut scratch,
            FallbackScratch::Allocate(self.legacy_scratch_capacity),
        );
        self.report_save(module_id, result)
    }

    /// [`save`](Self::save) using a caller-provided buffer for both the
    /// compact write and the fallback.
    pub fn save_compact(&self, module_id: &str, doc: &Document, buf: &mut [u8]) -> bool {
        let result = if buf.is_empty() {
            Err(BusError::InvalidArgument("buffer is empty".to_owned()))
        } else {
            self.try_save(module_id, doc, buf, FallbackScratch::Reuse)
        };
        self.report_save(module_id, result)
    }

    fn report_save(&self, module_id: &str, result: BusResult<RecordState>) -> bool {
        match result {
            Ok(state) => {
                debug!(namespace = %self.namespace, module = module_id, state = %state, "saved module config");
                true
            },
            Err(e) => {
                warn!(namespace = %self.namespace, module = module_id, error = %e, "save failed");
                false
            },
        }
    }

    // -----------------------------------------------------------------------
    // Clear
    // -----------------------------------------------------------------------

    /// Remove both records of `module_id`.
    ///
    /// Returns `true` iff at least one of them existed and was removed.
    pub fn clear_module(&self, module_id: &str) -> bool {
        match self.try_clear_module(module_id) {
            Ok(existed) => {
                debug!(namespace = %self.namespace, module = module_id, existed, "cleared module config");
                existed
            },
            Err(e) => {
                warn!(namespace = %self.namespace, module = module_id, error = %e, "clear failed");
                false
            },
        }
    }

    fn try_clear_module(&self, module_id: &str) -> BusResult<bool> {
        let keys = RecordKeys::derive(module_id, self.max_key_len())?;
        let mut handle = self.open(OpenMode::ReadWrite)?;

        let mut existed = false;
        for key in [Some(keys.legacy), keys.compact()].into_iter().flatten() {
            if handle.exists(key) {
                handle
                    .remove(key)
                    .map_err(|e| BusError::io(key, e.to_string()))?;
                existed = true;
            }
        }
        Ok(existed)
    }

    /// Remove every record in the namespace.
    pub fn clear_all(&self) -> bool {
        let result = self.open(OpenMode::ReadWrite).and_then(|mut handle| {
            handle
                .clear()
                .map_err(|e| BusError::io("*", e.to_string()))
        });
        match result {
            Ok(()) => {
                debug!(namespace = %self.namespace, "cleared namespace");
                true
            },
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "clear all failed");
                false
            },
        }
    }

    // -----------------------------------------------------------------------
    // Inspection and typed access
    // -----------------------------------------------------------------------

    /// Report which record [`load`](Self::load) would try first, without
    /// decoding or writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidArgument`] for an empty module id and
    /// [`BusError::StoreOpenFailed`] if the namespace exists but cannot be
    /// opened.
    pub fn inspect(&self, module_id: &str) -> BusResult<RecordState> {
        let keys = RecordKeys::derive(module_id, self.max_key_len())?;
        let handle = match self.open(OpenMode::ReadOnly) {
            Ok(handle) => handle,
            Err(e) if e.is_missing_namespace() => return Ok(RecordState::Absent),
            Err(e) => return Err(e),
        };

        if let Some(compact) = keys.compact()
            && handle.bytes_len(compact) > 0
        {
            return Ok(RecordState::Compact);
        }

        Ok(if handle.bytes_len(keys.legacy) > 0 {
            RecordState::LegacyBytes
        } else if handle.exists(keys.legacy) {
            RecordState::LegacyText
        } else {
            RecordState::Absent
        })
    }

    /// Load and deserialize into `T`.
    ///
    /// Returns `None` if nothing is stored or the stored document does not
    /// fit `T`.
    pub fn load_as<T: DeserializeOwned>(&self, module_id: &str) -> Option<T> {
        let mut doc = Document::Null;
        if !self.load(module_id, &mut doc) {
            return None;
        }
        match serde_json::from_value(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(namespace = %self.namespace, module = module_id, error = %e, "stored config does not match requested type");
                None
            },
        }
    }

    /// Serialize `value` and [`save`](Self::save) it.
    pub fn save_as<T: Serialize>(&self, module_id: &str, value: &T) -> bool {
        match serde_json::to_value(value) {
            Ok(doc) => self.save(module_id, &doc),
            Err(e) => {
                warn!(namespace = %self.namespace, module = module_id, error = %e, "config value is not serializable");
                false
            },
        }
    }
}

impl fmt::Debug for ConfigBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBus")
            .field("namespace", &self.namespace)
            .field("scratch_capacity", &self.scratch_capacity)
            .field("legacy_scratch_capacity", &self.legacy_scratch_capacity)
            .finish_non_exhaustive()
    }
}

/// Allocate a zeroed scratch buffer, or an empty one if the reservation
/// fails.
fn alloc_scratch(capacity: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = buf.try_reserve_exact(capacity) {
        warn!(capacity, error = %e, "scratch allocation failed, continuing without a buffer");
        return buf;
    }
    buf.resize(capacity, 0);
    buf
}

#[cfg(test)]
mod tests;
