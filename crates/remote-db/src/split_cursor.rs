//! Prefix-bounded view over a [`RemoteCursor`] that parses composite keys
//! into labeled parts (spec.md §4.4, C5). This is the engine behind history
//! walks that scan `(address || location || inverted-block-number)`
//! composite keys (spec.md glossary "Split cursor").

use crate::transaction::RemoteCursor;
use bytes::Bytes;
use rpcdaemon_errors::DbResult;

/// One logical tuple produced by a [`SplitCursor`]: the raw key split into
/// its three labeled segments, plus the associated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitKeyValue {
    /// First `len1` bytes of the key (e.g. address).
    pub part1: Vec<u8>,
    /// Next `len2` bytes (e.g. incarnation or location).
    pub part2: Vec<u8>,
    /// Remaining `len3` bytes (e.g. inverted block number).
    pub part3: Vec<u8>,
    /// The value stored at this key.
    pub value: Bytes,
}

/// `true` if `key`'s first `match_bits` bits equal `seek_key`'s first
/// `match_bits` bits (spec.md §8 "Prefix bound on walk").
pub fn prefix_matches(key: &[u8], seek_key: &[u8], match_bits: usize) -> bool {
    let full_bytes = match_bits / 8;
    let remaining_bits = match_bits % 8;
    let needed = full_bytes + usize::from(remaining_bits > 0);
    if key.len() < needed || seek_key.len() < needed {
        return false;
    }
    if key[..full_bytes] != seek_key[..full_bytes] {
        return false;
    }
    if remaining_bits > 0 {
        let mask: u8 = 0xFFu8 << (8 - remaining_bits);
        if (key[full_bytes] & mask) != (seek_key[full_bytes] & mask) {
            return false;
        }
    }
    true
}

/// Split `key` into its three labeled segments of lengths `(len1, len2,
/// len3)`.
pub fn split_key(key: &[u8], len1: usize, len2: usize, len3: usize) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let part1 = key[..len1].to_vec();
    let part2 = key[len1..len1 + len2].to_vec();
    let part3 = key[len1 + len2..len1 + len2 + len3].to_vec();
    (part1, part2, part3)
}

/// Wraps a raw cursor plus a composite key schema `(len1, len2, len3)` with
/// match-bits `m` (spec.md §4.4). Every returned key is split into three
/// sub-slices; an empty raw result or a prefix mismatch both surface as
/// `Ok(None)` from [`Self::seek`]/[`Self::next`].
#[derive(Debug)]
pub struct SplitCursor {
    cursor: RemoteCursor,
    len1: usize,
    len2: usize,
    len3: usize,
    match_bits: usize,
    seek_key: Vec<u8>,
}

impl SplitCursor {
    /// `seek_key` is the prefix used for the initial [`Self::seek`]; the
    /// per-byte mask covering the first `⌈match_bits/8⌉` bytes of it is
    /// computed lazily on each comparison rather than stored, since the
    /// mask only ever applies to `seek_key` itself.
    pub fn new(cursor: RemoteCursor, len1: usize, len2: usize, len3: usize, match_bits: usize, seek_key: Vec<u8>) -> Self {
        Self { cursor, len1, len2, len3, match_bits, seek_key }
    }

    /// Issue a raw `seek(seek_key)` and split/match the result.
    pub async fn seek(&self) -> DbResult<Option<SplitKeyValue>> {
        let seek_key = self.seek_key.clone();
        let kv = self.cursor.seek(&seek_key).await?;
        Ok(self.match_and_split(kv))
    }

    /// Advance with a raw `next()` and split/match the result. The matcher
    /// returns `None` (signaling stop) the moment the masked prefix no
    /// longer matches `seek_key`, even if the underlying cursor still has
    /// further entries.
    pub async fn next(&self) -> DbResult<Option<SplitKeyValue>> {
        let kv = self.cursor.next().await?;
        Ok(self.match_and_split(kv))
    }

    fn match_and_split(&self, kv: Option<(Bytes, Bytes)>) -> Option<SplitKeyValue> {
        let (key, value) = kv?;
        if !prefix_matches(&key, &self.seek_key, self.match_bits) {
            return None;
        }
        let (part1, part2, part3) = split_key(&key, self.len1, self.len2, self.len3);
        Some(SplitKeyValue { part1, part2, part3, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(address: u8, location: u8, inv_block: u32) -> Vec<u8> {
        let mut k = vec![address; 20];
        k.extend(std::iter::repeat(location).take(32));
        k.extend_from_slice(&inv_block.to_be_bytes());
        k
    }

    #[test]
    fn prefix_mask_rejects_partial_byte_mismatch() {
        let seek_key = key(0xAA, 0, 0);
        let full_match = key(0xAA, 0x11, 0);
        let mismatch = key(0xAB, 0x11, 0);

        let match_bits = 20 * 8; // match the full address only
        assert!(prefix_matches(&full_match, &seek_key, match_bits));
        assert!(!prefix_matches(&mismatch, &seek_key, match_bits));
    }

    #[test]
    fn partial_byte_match_bits_are_honored() {
        // match_bits covers only the top 4 bits of byte 0.
        let seek_key = vec![0b1010_0000; 1];
        let same_high_nibble = vec![0b1010_1111; 1];
        let different_high_nibble = vec![0b0101_0000; 1];
        assert!(prefix_matches(&same_high_nibble, &seek_key, 4));
        assert!(!prefix_matches(&different_high_nibble, &seek_key, 4));
    }

    #[test]
    fn split_respects_segment_lengths() {
        let full = key(0xAA, 0x22, 7);
        let (part1, part2, part3) = split_key(&full, 20, 32, 4);
        assert_eq!(part1, vec![0xAA; 20]);
        assert_eq!(part2, vec![0x22; 32]);
        assert_eq!(part3, 7u32.to_be_bytes().to_vec());
    }
}
