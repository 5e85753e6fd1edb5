//! Save pipeline: compact key first, binary under the bare key as fallback.

use configbus_storage::{KvHandle, OpenMode};
use tracing::{debug, warn};

use super::{ConfigBus, alloc_scratch};
use crate::Document;
use crate::codec::{BinaryCodec, Codec};
use crate::error::{BusError, BusResult};
use crate::keys::RecordKeys;
use crate::state::RecordState;

/// Buffer the legacy fallback encodes into.
#[derive(Debug, Clone, Copy)]
pub(super) enum FallbackScratch {
    /// Reuse the compact scratch buffer.
    Reuse,
    /// Allocate a fresh buffer of this many bytes.
    Allocate(usize),
}

impl ConfigBus {
    /// Run the save pipeline, returning the state the record ended up in.
    pub(super) fn try_save(
        &self,
        module_id: &str,
        doc: &Document,
        scratch: &mut [u8],
        fallback: FallbackScratch,
    ) -> BusResult<RecordState> {
        let keys = RecordKeys::derive(module_id, self.max_key_len())?;

        match &keys.compact {
            Ok(key) => match self.write_blob(key, doc, scratch) {
                Ok(len) => {
                    debug!(module = module_id, key = %key, bytes = len, "wrote compact record");
                    return Ok(RecordState::Compact);
                },
                Err(e) => {
                    warn!(module = module_id, key = %key, error = %e, "compact save failed, falling back to legacy key");
                },
            },
            Err(e) => {
                debug!(module = module_id, error = %e, "no compact key, saving under legacy key");
            },
        }

        let mut owned: Vec<u8>;
        let buf: &mut [u8] = match fallback {
            FallbackScratch::Reuse => scratch,
            FallbackScratch::Allocate(capacity) => {
                owned = alloc_scratch(capacity);
                owned.as_mut_slice()
            },
        };
        let len = self.write_blob(keys.legacy, doc, buf)?;
        debug!(module = module_id, bytes = len, "wrote legacy binary record");

        if let Some(compact) = keys.compact() {
            self.drop_stale_compact(compact)?;
        }
        Ok(RecordState::LegacyBytes)
    }

    /// Remove a compact record left over from an earlier save.
    ///
    /// It would shadow the legacy record just written.
    fn drop_stale_compact(&self, key: &str) -> BusResult<()> {
        let mut handle = self.open(OpenMode::ReadWrite)?;
        if handle.exists(key) {
            handle
                .remove(key)
                .map_err(|e| BusError::io(key, e.to_string()))?;
            debug!(key = %key, "removed stale compact record");
        }
        Ok(())
    }

    /// Encode `doc` into `scratch` and store it under `key`.
    ///
    /// Nothing is written unless the whole encoding fits.
    pub(super) fn write_blob(
        &self,
        key: &str,
        doc: &Document,
        scratch: &mut [u8],
    ) -> BusResult<usize> {
        let len = BinaryCodec.encode(doc, scratch)?;
        let bytes = scratch
            .get(..len)
            .ok_or_else(|| BusError::EncodeFailed(format!("encoder reported {len} bytes")))?;

        let mut handle = self.open(OpenMode::ReadWrite)?;
        put_exact(&mut *handle, key, bytes)?;
        Ok(len)
    }
}

fn put_exact<H: KvHandle + ?Sized>(handle: &mut H, key: &str, bytes: &[u8]) -> BusResult<()> {
    let written = handle
        .put_bytes(key, bytes)
        .map_err(|e| BusError::io(key, e.to_string()))?;
    if written != bytes.len() {
        return Err(BusError::io(
            key,
            format!("short write: {written} of {} bytes", bytes.len()),
        ));
    }
    Ok(())
}
