//! Per-module record states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which representation of a module's configuration is stored.
///
/// `load` moves a record towards [`RecordState::Compact`]; `save` lands there
/// directly and only falls back to [`RecordState::LegacyBytes`]. Nothing moves
/// a record out of `Compact` except clearing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Neither key exists.
    Absent,
    /// Native text under the bare module id.
    LegacyText,
    /// A binary blob under the bare module id.
    LegacyBytes,
    /// A binary blob under the compact key.
    Compact,
}

impl RecordState {
    /// Whether a record of any kind is stored.
    #[must_use]
    pub fn is_present(self) -> bool {
        self != Self::Absent
    }

    /// Whether the record lives under the bare module id.
    #[must_use]
    pub fn is_legacy(self) -> bool {
        matches!(self, Self::LegacyText | Self::LegacyBytes)
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::LegacyText => "legacy_text",
            Self::LegacyBytes => "legacy_bytes",
            Self::Compact => "compact",
        })
    }
}
