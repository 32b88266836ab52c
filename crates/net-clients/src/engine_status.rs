//! Engine-API status as a sum type (spec.md §4.10, §9: "treat as a sum type
//! at the cache boundary; never expose the wire numeric values beyond the
//! client layer").

use crate::remote::EngineStatus as WireEngineStatus;

/// Textual status required by the JSON-RPC surface for
/// `engine_newPayloadV1` / `engine_forkchoiceUpdatedV1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Valid,
    Invalid,
    Syncing,
    Accepted,
    InvalidBlockHash,
    InvalidTerminalBlock,
}

impl EngineStatus {
    /// The exact textual token the JSON-RPC surface emits.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Syncing => "SYNCING",
            Self::Accepted => "ACCEPTED",
            Self::InvalidBlockHash => "INVALID_BLOCK_HASH",
            Self::InvalidTerminalBlock => "INVALID_TERMINAL_BLOCK",
        }
    }
}

impl EngineStatus {
    /// Convert the raw `i32` carried in a generated message's `status`
    /// field. Unknown/out-of-range values degrade to `Syncing`, mirroring
    /// how an unrecognized wire status should never be mistaken for a
    /// terminal one.
    pub fn from_wire(raw: i32) -> Self {
        WireEngineStatus::try_from(raw).unwrap_or(WireEngineStatus::Syncing).into()
    }
}

impl From<WireEngineStatus> for EngineStatus {
    fn from(value: WireEngineStatus) -> Self {
        match value {
            WireEngineStatus::Valid => Self::Valid,
            WireEngineStatus::Invalid => Self::Invalid,
            WireEngineStatus::Syncing => Self::Syncing,
            WireEngineStatus::Accepted => Self::Accepted,
            WireEngineStatus::InvalidBlockHash => Self::InvalidBlockHash,
            WireEngineStatus::InvalidTerminalBlock => Self::InvalidTerminalBlock,
        }
    }
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
