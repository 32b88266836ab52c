//! Conversions between the wire's fixed-width message pairs and
//! `alloy_primitives` native types (spec.md §6 "Bigint encoding... Byte
//! order is big-endian").

use crate::types::{H128, H160, H2048, H256};
use alloy_primitives::{Address, Bloom, B256, U256};

fn h128_to_bytes(h: &H128, out: &mut [u8]) {
    out[..8].copy_from_slice(&h.hi.to_be_bytes());
    out[8..].copy_from_slice(&h.lo.to_be_bytes());
}

fn bytes_to_h128(bytes: &[u8]) -> H128 {
    H128 { hi: u64::from_be_bytes(bytes[..8].try_into().unwrap()), lo: u64::from_be_bytes(bytes[8..].try_into().unwrap()) }
}

/// `types::H256` (two `H128` halves) -> `B256`, big-endian.
pub fn b256_from_h256(h: &H256) -> B256 {
    let mut bytes = [0u8; 32];
    if let Some(hi) = &h.hi {
        h128_to_bytes(hi, &mut bytes[..16]);
    }
    if let Some(lo) = &h.lo {
        h128_to_bytes(lo, &mut bytes[16..]);
    }
    B256::from(bytes)
}

/// `B256` -> `types::H256`.
pub fn b256_to_h256(value: &B256) -> H256 {
    let bytes = value.as_slice();
    H256 { hi: Some(bytes_to_h128(&bytes[..16])), lo: Some(bytes_to_h128(&bytes[16..])) }
}

/// `types::H256` -> `U256`, reusing the `B256` conversion (same 32 bytes).
pub fn u256_from_h256(h: &H256) -> U256 {
    U256::from_be_bytes(b256_from_h256(h).0)
}

/// `U256` -> `types::H256`.
pub fn u256_to_h256(value: &U256) -> H256 {
    b256_to_h256(&B256::from(value.to_be_bytes()))
}

/// `types::H160` (one `H128` plus a 32-bit tail) -> `Address`
/// (spec.md §6: "a 160-bit address is a 128-bit message plus a 32-bit
/// tail").
pub fn address_from_h160(h: &H160) -> Address {
    let mut bytes = [0u8; 20];
    if let Some(hi) = &h.hi {
        h128_to_bytes(hi, &mut bytes[..16]);
    }
    bytes[16..].copy_from_slice(&h.lo.to_be_bytes());
    Address::from(bytes)
}

/// `Address` -> `types::H160`.
pub fn address_to_h160(value: &Address) -> H160 {
    let bytes = value.as_slice();
    H160 { hi: Some(bytes_to_h128(&bytes[..16])), lo: u32::from_be_bytes(bytes[16..].try_into().unwrap()) }
}

/// `types::H2048` (eight `H256` chunks) -> `Bloom` (spec.md §6: "a 2048-bit
/// bloom is eight 256-bit messages").
pub fn bloom_from_h2048(h: &H2048) -> Bloom {
    let mut bytes = [0u8; 256];
    for (i, chunk) in h.chunks.iter().take(8).enumerate() {
        bytes[i * 32..(i + 1) * 32].copy_from_slice(b256_from_h256(chunk).as_slice());
    }
    Bloom::from(bytes)
}

/// `Bloom` -> `types::H2048`.
pub fn bloom_to_h2048(value: &Bloom) -> H2048 {
    let bytes = value.as_slice();
    let chunks = bytes.chunks_exact(32).map(|c| b256_to_h256(&B256::from_slice(c))).collect();
    H2048 { chunks }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn address_round_trips() {
        let mut raw = [0u8; 20];
        raw[0] = 0x0a;
        raw[19] = 0x7f;
        let addr = Address::from(raw);
        assert_eq!(address_from_h160(&address_to_h160(&addr)), addr);
    }

    #[test]
    fn b256_round_trips() {
        let mut raw = [0u8; 32];
        raw[0] = 0x66;
        raw[31] = 0xb1;
        let value = B256::from(raw);
        assert_eq!(b256_from_h256(&b256_to_h256(&value)), value);
    }

    #[test]
    fn bloom_round_trips() {
        let mut raw = [0u8; 256];
        raw[0] = 0xAB;
        raw[255] = 0xCD;
        let bloom = Bloom::from(raw);
        assert_eq!(bloom_from_h2048(&bloom_to_h2048(&bloom)), bloom);
    }
}
