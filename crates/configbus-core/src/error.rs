//! Error types for the persistence engine.
//!
//! These never cross the public `bool` boundary of [`ConfigBus`]; they are
//! reported through `tracing` and used internally to drive fallbacks.
//!
//! [`ConfigBus`]: crate::ConfigBus

use configbus_storage::StorageError;
use thiserror::Error;

/// Errors raised while deriving keys, encoding, decoding or touching the store.
#[derive(Debug, Error)]
pub enum BusError {
    /// Empty module id, empty buffer, or similar caller mistake.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The derived compact key exceeds the store's key-length limit.
    #[error("key too long: {key} is {len} bytes, limit is {max}")]
    KeyTooLong {
        /// The derived key.
        key: String,
        /// Its length.
        len: usize,
        /// The store's key-length limit.
        max: usize,
    },

    /// The encoded document does not fit the buffer.
    #[error("encoded document needs {needed} bytes, buffer holds {capacity}")]
    EncodeOverflow {
        /// Bytes the encoding requires.
        needed: usize,
        /// Buffer capacity.
        capacity: usize,
    },

    /// The codec failed for a reason other than buffer size.
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// The stored bytes are not a valid encoding.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// The namespace could not be opened.
    #[error("failed to open namespace {namespace}: {source}")]
    StoreOpenFailed {
        /// Namespace being opened.
        namespace: String,
        /// Underlying store error.
        source: StorageError,
    },

    /// A read or write failed or moved an unexpected number of bytes.
    #[error("store i/o failed for key {key}: {message}")]
    StoreIoFailed {
        /// Key being accessed.
        key: String,
        /// What went wrong.
        message: String,
    },
}

impl BusError {
    pub(crate) fn io(key: &str, message: impl Into<String>) -> Self {
        Self::StoreIoFailed {
            key: key.to_owned(),
            message: message.into(),
        }
    }

    /// Whether this is a read-only open of a namespace that has never been
    /// written, i.e. nothing is stored yet.
    #[must_use]
    pub fn is_missing_namespace(&self) -> bool {
        matches!(
            self,
            Self::StoreOpenFailed {
                source: StorageError::NamespaceNotFound(_),
                ..
            }
        )
    }
}

/// Result type for engine operations.
pub type BusResult<T> = Result<T, BusError>;
