//! Module id → store key derivation.
//!
//! A module's legacy record lives under the bare module id; its compact
//! record lives under the module id plus [`COMPACT_SUFFIX`]. With a 15-byte
//! key limit this leaves 12 bytes for module ids that want a compact record.

use crate::error::{BusError, BusResult};

/// Suffix appended to a module id to form its compact-record key.
pub const COMPACT_SUFFIX: &str = ":mp";

/// Reject empty module ids.
///
/// # Errors
///
/// Returns [`BusError::InvalidArgument`] for an empty id.
pub fn validate_module_id(module_id: &str) -> BusResult<()> {
    if module_id.is_empty() {
        return Err(BusError::InvalidArgument("module id is empty".to_owned()));
    }
    Ok(())
}

/// Derive the compact-record key for `module_id`.
///
/// # Errors
///
/// Returns [`BusError::InvalidArgument`] for an empty id and
/// [`BusError::KeyTooLong`] if the derived key exceeds `max_key_len`.
pub fn derive_compact_key(module_id: &str, max_key_len: usize) -> BusResult<String> {
    validate_module_id(module_id)?;

    let len = module_id.len().saturating_add(COMPACT_SUFFIX.len());
    let key = format!("{module_id}{COMPACT_SUFFIX}");
    if len > max_key_len {
        return Err(BusError::KeyTooLong {
            key,
            len,
            max: max_key_len,
        });
    }
    Ok(key)
}

/// The keys one operation works with.
#[derive(Debug)]
pub struct RecordKeys<'a> {
    /// Legacy key: the bare module id.
    pub legacy: &'a str,
    /// Compact key, or why it could not be derived.
    pub compact: BusResult<String>,
}

impl<'a> RecordKeys<'a> {
    /// Derive both keys for `module_id`.
    ///
    /// An underivable compact key is not an error here; the legacy key is
    /// still usable.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::InvalidArgument`] for an empty id.
    pub fn derive(module_id: &'a str, max_key_len: usize) -> BusResult<Self> {
        validate_module_id(module_id)?;
        Ok(Self {
            legacy: module_id,
            compact: derive_compact_key(module_id, max_key_len),
        })
    }

    /// The compact key, if derivable.
    #[must_use]
    pub fn compact(&self) -> Option<&str> {
        self.compact.as_deref().ok()
    }
}
