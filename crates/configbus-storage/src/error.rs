//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A read-only open was attempted on a namespace that has never been written.
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// The key is empty or exceeds the store's key-length limit.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The namespace is empty or exceeds the store's namespace-length limit.
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// A mutation was attempted through a read-only handle.
    #[error("namespace opened read-only: {0}")]
    ReadOnly(String),

    /// The value exceeds the per-key size limit.
    #[error("value too large for key {key}: {len} bytes (max {max})")]
    ValueTooLarge {
        /// The key being written.
        key: String,
        /// Size of the rejected value.
        len: usize,
        /// Configured per-key maximum.
        max: usize,
    },

    /// The store has no room left for the write.
    #[error("storage full: {needed} bytes needed, {available} available")]
    StorageFull {
        /// Bytes the write would have consumed.
        needed: usize,
        /// Bytes still free.
        available: usize,
    },

    /// The destination buffer cannot hold the stored value.
    #[error("buffer too small for key {key}: value is {len} bytes, buffer holds {capacity}")]
    BufferTooSmall {
        /// The key being read.
        key: String,
        /// Stored value length.
        len: usize,
        /// Buffer capacity.
        capacity: usize,
    },

    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted namespace file could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
