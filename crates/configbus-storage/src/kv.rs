//! Namespaced key-value store interface.
//!
//! The store is modelled after small embedded preference stores: values live
//! inside a named namespace, keys and namespace names have a short length
//! limit, and a value is either a raw byte blob or a native text string.
//! A namespace is opened for a single operation and closed again by dropping
//! the returned [`KvHandle`]; no handle is meant to outlive one call.

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Default maximum key length, in bytes.
pub const DEFAULT_MAX_KEY_LEN: usize = 15;

/// Default maximum namespace name length, in bytes.
pub const DEFAULT_MAX_NAMESPACE_LEN: usize = 15;

/// Default maximum size of a single stored value, in bytes.
pub const DEFAULT_MAX_VALUE_LEN: usize = 4000;

/// How a namespace is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only. Opening a namespace that was never written fails.
    ReadOnly,
    /// Reads and writes. The namespace is created on demand.
    ReadWrite,
}

impl OpenMode {
    /// Whether mutations are allowed through a handle opened in this mode.
    #[must_use]
    pub fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Size limits enforced by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum key length in bytes.
    pub max_key_len: usize,
    /// Maximum namespace name length in bytes.
    pub max_namespace_len: usize,
    /// Maximum size of one value in bytes.
    pub max_value_len: usize,
    /// Bytes of stored values allowed, if bounded.
    ///
    /// [`MemoryKvStore`](crate::MemoryKvStore) counts every namespace
    /// together; [`FileKvStore`](crate::FileKvStore) counts each namespace
    /// file separately.
    pub capacity: Option<usize>,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_key_len: DEFAULT_MAX_KEY_LEN,
            max_namespace_len: DEFAULT_MAX_NAMESPACE_LEN,
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            capacity: None,
        }
    }
}

#[cfg(feature = "config")]
impl From<&configbus_config::LimitsConfig> for StoreLimits {
    fn from(cfg: &configbus_config::LimitsConfig) -> Self {
        Self {
            max_key_len: cfg.max_key_len,
            max_namespace_len: cfg.max_namespace_len,
            max_value_len: cfg.max_value_len,
            capacity: None,
        }
    }
}

impl StoreLimits {
    /// Bound the total number of value bytes the store may hold.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Check a key against the key-length limit.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for empty or over-long keys.
    pub fn check_key(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".to_owned()));
        }
        if key.len() > self.max_key_len {
            return Err(StorageError::InvalidKey(format!(
                "{key} is {} bytes, limit is {}",
                key.len(),
                self.max_key_len
            )));
        }
        Ok(())
    }

    /// Check a namespace name against the namespace-length limit.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidNamespace`] for empty or over-long names.
    pub fn check_namespace(&self, namespace: &str) -> StorageResult<()> {
        if namespace.is_empty() {
            return Err(StorageError::InvalidNamespace(
                "namespace is empty".to_owned(),
            ));
        }
        if namespace.len() > self.max_namespace_len {
            return Err(StorageError::InvalidNamespace(format!(
                "{namespace} is {} bytes, limit is {}",
                namespace.len(),
                self.max_namespace_len
            )));
        }
        Ok(())
    }

    /// Check a value length against the per-key limit.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ValueTooLarge`] if the value does not fit.
    pub fn check_value(&self, key: &str, len: usize) -> StorageResult<()> {
        if len > self.max_value_len {
            return Err(StorageError::ValueTooLarge {
                key: key.to_owned(),
                len,
                max: self.max_value_len,
            });
        }
        Ok(())
    }
}

/// A stored value: a byte blob or the store's native text type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Native text string.
    Text(String),
}

impl StoredValue {
    /// Number of bytes the value occupies.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len(),
            Self::Text(s) => s.len(),
        }
    }

    /// Whether the value occupies no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte length as reported by a blob-length query.
    ///
    /// Text values and empty blobs both report 0.
    #[must_use]
    pub fn blob_len(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len(),
            Self::Text(_) => 0,
        }
    }

    /// Copy a blob into `buf`, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BufferTooSmall`] if the blob does not fit and
    /// [`StorageError::NotFound`] if the value is text rather than bytes.
    pub fn copy_bytes_into(&self, key: &str, buf: &mut [u8]) -> StorageResult<usize> {
        let Self::Bytes(bytes) = self else {
            return Err(StorageError::NotFound(format!("{key} holds text, not bytes")));
        };
        let Some(dest) = buf.get_mut(..bytes.len()) else {
            return Err(StorageError::BufferTooSmall {
                key: key.to_owned(),
                len: bytes.len(),
                capacity: buf.len(),
            });
        };
        dest.copy_from_slice(bytes);
        Ok(bytes.len())
    }
}

/// A key-value store partitioned into namespaces.
///
/// Implementations must be thread-safe so a store can be shared behind an
/// `Arc<dyn KvStore>`; concurrent writers are not arbitrated beyond that.
pub trait KvStore: Send + Sync {
    /// Open a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidNamespace`] if the name violates the
    /// store's limits, [`StorageError::NamespaceNotFound`] for a read-only
    /// open of a namespace that does not exist, or a backend error.
    fn open(&self, namespace: &str, mode: OpenMode) -> StorageResult<Box<dyn KvHandle + '_>>;

    /// Limits this store enforces.
    fn limits(&self) -> &StoreLimits;
}

/// An open namespace. Dropping the handle closes it.
pub trait KvHandle {
    /// The namespace this handle was opened on.
    fn namespace(&self) -> &str;

    /// The mode this handle was opened with.
    fn mode(&self) -> OpenMode;

    /// Whether `key` holds any value.
    fn exists(&self, key: &str) -> bool;

    /// Length of the blob stored at `key`; 0 if absent or stored as text.
    fn bytes_len(&self, key: &str) -> usize;

    /// Copy the blob stored at `key` into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `key` holds no blob and
    /// [`StorageError::BufferTooSmall`] if `buf` cannot hold it.
    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> StorageResult<usize>;

    /// Read the text stored at `key`; `None` if absent or stored as bytes.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the namespace cannot be read.
    fn get_string(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store a blob at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`], [`StorageError::InvalidKey`],
    /// [`StorageError::ValueTooLarge`], [`StorageError::StorageFull`] or a
    /// backend error. A failed write leaves the previous value in place.
    fn put_bytes(&mut self, key: &str, value: &[u8]) -> StorageResult<usize>;

    /// Store text at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Same as [`KvHandle::put_bytes`].
    fn put_string(&mut self, key: &str, value: &str) -> StorageResult<usize>;

    /// Remove `key`, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] or a backend error.
    fn remove(&mut self, key: &str) -> StorageResult<bool>;

    /// Remove every key in the namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] or a backend error.
    fn clear(&mut self) -> StorageResult<()>;
}
