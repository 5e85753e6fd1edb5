//! Load pipeline: compact record first, then the legacy record, then
//! best-effort migration of whatever legacy record was found.

use configbus_storage::{KvHandle, OpenMode};
use tracing::{debug, info, warn};

use super::ConfigBus;
use crate::Document;
use crate::codec::{BinaryCodec, Codec, TextCodec};
use crate::error::{BusError, BusResult};
use crate::keys::RecordKeys;
use crate::state::RecordState;

/// One way of finding a module's document in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LoadAttempt {
    Compact,
    LegacyBytes,
    LegacyText,
}

/// Order in which attempts run; the first decoded document wins.
const LOAD_ORDER: [LoadAttempt; 3] = [
    LoadAttempt::Compact,
    LoadAttempt::LegacyBytes,
    LoadAttempt::LegacyText,
];

/// What a successful load found and changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LoadOutcome {
    pub(super) source: RecordState,
    pub(super) upgraded: bool,
    pub(super) promoted: bool,
}

impl LoadAttempt {
    fn state(self) -> RecordState {
        match self {
            Self::Compact => RecordState::Compact,
            Self::LegacyBytes => RecordState::LegacyBytes,
            Self::LegacyText => RecordState::LegacyText,
        }
    }

    /// A failure in a terminal attempt ends the load.
    fn is_terminal(self) -> bool {
        !matches!(self, Self::Compact)
    }

    fn key<'k>(self, keys: &'k RecordKeys<'_>) -> Option<&'k str> {
        match self {
            Self::Compact => keys.compact(),
            Self::LegacyBytes | Self::LegacyText => Some(keys.legacy),
        }
    }

    fn detect<H: KvHandle + ?Sized>(self, handle: &H, key: &str) -> bool {
        match self {
            Self::Compact => handle.exists(key),
            Self::LegacyBytes => handle.bytes_len(key) > 0,
            Self::LegacyText => handle.exists(key) && handle.bytes_len(key) == 0,
        }
    }

    fn decode<H: KvHandle + ?Sized>(
        self,
        handle: &H,
        key: &str,
        scratch: &mut [u8],
    ) -> BusResult<Document> {
        match self {
            Self::Compact | Self::LegacyBytes => BinaryCodec.decode(read_blob(handle, key, scratch)?),
            Self::LegacyText => {
                let text = handle
                    .get_string(key)
                    .map_err(|e| BusError::io(key, e.to_string()))?
                    .ok_or_else(|| BusError::io(key, "text record disappeared"))?;
                TextCodec.decode(text.as_bytes())
            },
        }
    }
}

/// Read the blob under `key` into the front of `scratch`.
fn read_blob<'s, H: KvHandle + ?Sized>(
    handle: &H,
    key: &str,
    scratch: &'s mut [u8],
) -> BusResult<&'s [u8]> {
    let len = handle.bytes_len(key);
    if len == 0 {
        return Err(BusError::io(key, "stored blob is empty"));
    }

    let capacity = scratch.len();
    let Some(dest) = scratch.get_mut(..len) else {
        return Err(BusError::io(
            key,
            format!("stored blob is {len} bytes, scratch holds {capacity}"),
        ));
    };

    let read = handle
        .get_bytes(key, dest)
        .map_err(|e| BusError::io(key, e.to_string()))?;
    if read != len {
        return Err(BusError::io(key, format!("short read: {read} of {len} bytes")));
    }
    Ok(dest)
}

impl ConfigBus {
    /// Run the load pipeline. `Ok(None)` means nothing is stored.
    pub(super) fn try_load(
        &self,
        module_id: &str,
        doc: &mut Document,
        scratch: &mut [u8],
    ) -> BusResult<Option<LoadOutcome>> {
        let keys = RecordKeys::derive(module_id, self.max_key_len())?;
        if let Err(e) = &keys.compact {
            debug!(module = module_id, error = %e, "no compact key, reading legacy key only");
        }

        for attempt in LOAD_ORDER {
            let Some(key) = attempt.key(&keys) else {
                continue;
            };
            match self.run_attempt(attempt, key, scratch) {
                Ok(Some(decoded)) => {
                    *doc = decoded;
                    return Ok(Some(self.migrate(attempt, &keys, doc, scratch)));
                },
                Ok(None) => {},
                Err(e) if attempt.is_terminal() => return Err(e),
                Err(e) => {
                    debug!(module = module_id, key, error = %e, "compact record unreadable, trying legacy key");
                },
            }
        }
        Ok(None)
    }

    /// `Ok(None)` if the attempt's record is not there.
    fn run_attempt(
        &self,
        attempt: LoadAttempt,
        key: &str,
        scratch: &mut [u8],
    ) -> BusResult<Option<Document>> {
        let handle = match self.open(OpenMode::ReadOnly) {
            Ok(handle) => handle,
            Err(e) if e.is_missing_namespace() => return Ok(None),
            Err(e) => return Err(e),
        };
        if !attempt.detect(&*handle, key) {
            return Ok(None);
        }
        attempt.decode(&*handle, key, scratch).map(Some)
    }

    /// Upgrade and promote a record found by `attempt`. Failures are logged
    /// and retried by the next load.
    fn migrate(
        &self,
        attempt: LoadAttempt,
        keys: &RecordKeys<'_>,
        doc: &Document,
        scratch: &mut [u8],
    ) -> LoadOutcome {
        let mut outcome = LoadOutcome {
            source: attempt.state(),
            upgraded: false,
            promoted: false,
        };

        if attempt == LoadAttempt::LegacyText {
            match self.upgrade_legacy(keys.legacy, doc, scratch) {
                Ok(len) => {
                    info!(module = keys.legacy, bytes = len, "rewrote legacy text record as binary");
                    outcome.upgraded = true;
                },
                Err(e) => {
                    warn!(module = keys.legacy, error = %e, "legacy upgrade failed");
                },
            }
        }

        if attempt != LoadAttempt::Compact
            && let Some(compact) = keys.compact()
        {
            match self.promote(compact, doc, scratch) {
                Ok(true) => {
                    info!(module = keys.legacy, key = compact, "promoted legacy record to compact key");
                    outcome.promoted = true;
                },
                Ok(false) => {
                    debug!(module = keys.legacy, key = compact, "compact key already present, not promoting");
                },
                Err(e) => {
                    warn!(module = keys.legacy, key = compact, error = %e, "promotion to compact key failed");
                },
            }
        }

        outcome
    }

    /// Replace the text record under the bare key with its binary encoding.
    fn upgrade_legacy(&self, key: &str, doc: &Document, scratch: &mut [u8]) -> BusResult<usize> {
        self.write_blob(key, doc, scratch)
    }

    /// Write `doc` under `compact` unless that key already exists.
    fn promote(&self, compact: &str, doc: &Document, scratch: &mut [u8]) -> BusResult<bool> {
        if self.open(OpenMode::ReadOnly)?.exists(compact) {
            return Ok(false);
        }
        self.write_blob(compact, doc, scratch)?;
        Ok(true)
    }
}
