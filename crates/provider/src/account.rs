//! Account/storage value codec (spec.md §3 "Account").
//!
//! The wire schema (spec.md §6) leaves the exact `PlainState` account
//! encoding to the remote node; this reimplementation settles on a plain
//! RLP list, recorded as an Open Question resolution in `DESIGN.md`.

use alloy_primitives::{B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use rpcdaemon_errors::ProviderError;

/// `(nonce, balance, code_hash, incarnation)` (spec.md §3 "Account").
#[derive(Debug, Clone, Copy, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: B256,
    pub incarnation: u64,
}

impl Account {
    /// A zero `code_hash` with non-zero `incarnation` means the code hash
    /// must be looked up from `PlainContractCode` (spec.md §3).
    pub fn code_hash_is_deferred(&self) -> bool {
        self.code_hash.is_zero() && self.incarnation != 0
    }

    pub fn encode(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProviderError> {
        let mut buf = bytes;
        alloy_rlp::Decodable::decode(&mut buf).map_err(|err| ProviderError::decode("rlp:Account", err))
    }
}
