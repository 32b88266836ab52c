//! KV table name constants and composite-key codecs (spec.md §6 "Table /
//! key schema").
//!
//! Keys are represented as owned `Vec<u8>`/`Bytes`, never pointer graphs
//! (spec.md §9 "Composite keys. Represent them as values, not pointer
//! graphs").

use alloy_primitives::{Address, B256};

/// Table names exactly as exposed by the remote KV service.
pub mod table {
    pub const HEADERS: &str = "Headers";
    pub const BLOCK_BODIES: &str = "BlockBodies";
    pub const BLOCK_RECEIPTS: &str = "BlockReceipts";
    pub const LOGS: &str = "Logs";
    pub const HEADER_NUMBERS: &str = "HeaderNumbers";
    pub const CANONICAL_HASHES: &str = "CanonicalHashes";
    pub const DIFFICULTY: &str = "Difficulty";
    pub const SENDERS: &str = "Senders";
    pub const ETH_TX: &str = "EthTx";
    pub const CONFIG: &str = "Config";
    pub const SYNC_STAGE_PROGRESS: &str = "SyncStageProgress";
    pub const PLAIN_STATE: &str = "PlainState";
    pub const PLAIN_CONTRACT_CODE: &str = "PlainContractCode";
    pub const CODE: &str = "Code";
    pub const ACCOUNT_HISTORY: &str = "AccountHistory";
    pub const STORAGE_HISTORY: &str = "StorageHistory";
    pub const PLAIN_ACCOUNT_CHANGE_SET: &str = "PlainAccountChangeSet";
    pub const PLAIN_STORAGE_CHANGE_SET: &str = "PlainStorageChangeSet";
    pub const LOG_TOPIC_INDEX: &str = "LogTopicIndex";
    pub const LOG_ADDRESS_INDEX: &str = "LogAddressIndex";
}

/// `block-number (8B BE) || block-hash (32B)` — keys Headers, BlockBodies,
/// Difficulty, Senders.
pub fn make_key(block_number: u64, block_hash: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(&block_number.to_be_bytes());
    key.extend_from_slice(block_hash.as_slice());
    key
}

/// Split a `block-number || block-hash` key back into its parts.
pub fn decode_block_key(key: &[u8]) -> Option<(u64, B256)> {
    if key.len() != 40 {
        return None;
    }
    let number = u64::from_be_bytes(key[..8].try_into().ok()?);
    let hash = B256::from_slice(&key[8..]);
    Some((number, hash))
}

/// `address || location-hash` — PlainState storage key with zero
/// incarnation elided isn't used by this schema; storage keys always carry
/// an explicit incarnation (see [`make_storage_key`]). This helper covers
/// the bare-account form of `PlainState`.
pub fn make_key_address(address: Address) -> Vec<u8> {
    address.as_slice().to_vec()
}

/// `address || incarnation (8B BE) || location-hash (32B)` — PlainState
/// storage key, PlainStorageChangeSet suffix, StorageHistory prefix.
pub fn make_storage_key(address: Address, incarnation: u64, location: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + 8 + 32);
    key.extend_from_slice(address.as_slice());
    key.extend_from_slice(&incarnation.to_be_bytes());
    key.extend_from_slice(location.as_slice());
    key
}

/// `address || incarnation (8B BE)` — PlainContractCode key.
pub fn make_contract_code_key(address: Address, incarnation: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(28);
    key.extend_from_slice(address.as_slice());
    key.extend_from_slice(&incarnation.to_be_bytes());
    key
}

/// `change-block (8B BE) || address` — PlainAccountChangeSet key.
pub fn make_change_set_key(block_number: u64, address: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(28);
    key.extend_from_slice(&block_number.to_be_bytes());
    key.extend_from_slice(address.as_slice());
    key
}

/// `change-block || address || incarnation || location-hash` —
/// PlainStorageChangeSet key.
pub fn make_storage_change_set_key(block_number: u64, address: Address, incarnation: u64, location: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 20 + 8 + 32);
    key.extend_from_slice(&block_number.to_be_bytes());
    key.extend_from_slice(address.as_slice());
    key.extend_from_slice(&incarnation.to_be_bytes());
    key.extend_from_slice(location.as_slice());
    key
}

/// `address || target-block (8B BE)` — AccountHistory key.
pub fn make_history_key(address: Address, target_block: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(28);
    key.extend_from_slice(address.as_slice());
    key.extend_from_slice(&target_block.to_be_bytes());
    key
}

/// `address || location-hash || target-block` — StorageHistory key.
pub fn make_storage_history_key(address: Address, location: B256, target_block: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + 32 + 8);
    key.extend_from_slice(address.as_slice());
    key.extend_from_slice(location.as_slice());
    key.extend_from_slice(&target_block.to_be_bytes());
    key
}

/// `block-number (8B BE) || tx-index (4B BE)` — Logs key.
pub fn make_log_key(block_number: u64, tx_index: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(12);
    key.extend_from_slice(&block_number.to_be_bytes());
    key.extend_from_slice(&tx_index.to_be_bytes());
    key
}

/// 8-byte big-endian block number, used as a bare key (CanonicalHashes,
/// BlockReceipts, SyncStageProgress) or value (HeaderNumbers).
pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Inverse of [`encode_u64`].
pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn block_key_round_trips() {
        let addr_bytes = address!("0a6b3b5c9e6a0b5f1c7d2a4e8f9b1c2d3e4f5a6b");
        let hash = B256::from_slice(&[7u8; 32]);
        let _ = addr_bytes;
        let key = make_key(0x0ddf12121212, hash);
        let (number, decoded_hash) = decode_block_key(&key).unwrap();
        assert_eq!(number, 0x0ddf12121212);
        assert_eq!(decoded_hash, hash);
    }

    #[test]
    fn storage_key_layout() {
        let addr = address!("0a6b3b5c9e6a0b5f1c7d2a4e8f9b1c2d3e4f5a6b");
        let location = B256::from_slice(&[9u8; 32]);
        let key = make_storage_key(addr, 3, location);
        assert_eq!(key.len(), 60);
        assert_eq!(&key[..20], addr.as_slice());
        assert_eq!(u64::from_be_bytes(key[20..28].try_into().unwrap()), 3);
        assert_eq!(&key[28..], location.as_slice());
    }
}
