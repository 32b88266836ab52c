use crate::DbError;

/// Errors surfaced by the cached database facade (C8), state reader (C9) and
/// block/receipt/chain accessors (C10).
///
/// Follows the teacher's `reth-storage-errors::ProviderError` layering: a
/// thin enum that wraps the lower-level `DbError` plus the two
/// domain-specific classes spec §4.9 calls out explicitly ("empty value" vs
/// "decode failed").
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Propagated from the remote transaction / cursor layer.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Data that must exist for the request to make sense was absent, e.g. a
    /// canonical hash for a block number, a header for a hash.
    #[error("empty value for {0}")]
    EmptyValue(&'static str),

    /// Data was present but failed to decode (malformed RLP/CBOR).
    #[error("decode failed ({tag}): {message}")]
    Decode {
        /// Which codec/table produced the failure, e.g. `"rlp:Header"`.
        tag: &'static str,
        /// Underlying decode error message.
        message: String,
    },

    /// A block identifier resolved to a block that does not exist (spec
    /// §3: numeric/hash/tag resolution).
    #[error("block not found: {0}")]
    BlockNotFound(String),

    /// A requested transaction hash / index could not be located.
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// The coherent state cache's `get_view` timed out waiting for a root
    /// to become ready and the caller chose to surface rather than fall
    /// back (spec §4.6).
    #[error("state cache view not ready within timeout")]
    ViewNotReady,
}

impl ProviderError {
    /// Construct a [`ProviderError::Decode`] from any displayable decode
    /// error, tagging it with the codec/table name.
    pub fn decode(tag: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode { tag, message: err.to_string() }
    }
}
