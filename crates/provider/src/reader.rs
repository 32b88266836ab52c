//! `DatabaseReader` (spec.md §4.7 table): the reader surface every consumer
//! of C8/C4 programs against. Kept `auto_impl`-friendly so both
//! `Arc<dyn DatabaseReader>` and `&impl DatabaseReader` work at call sites,
//! matching the teacher's `EthApiSpec`/`BlockReaderIdExt` trait pattern in
//! `crates/rpc/rpc/src/eth/api/mod.rs`.

use async_trait::async_trait;
use bytes::Bytes;
use rpcdaemon_errors::DbResult;

/// A key/value pair as returned by [`DatabaseReader::get`].
pub type KeyValue = (Bytes, Bytes);

/// Callback invoked by [`DatabaseReader::walk`]/[`DatabaseReader::for_prefix`]
/// for each matching pair; returning `false` stops the walk early.
pub type WalkFn<'a> = dyn FnMut(&[u8], &[u8]) -> bool + Send + 'a;

#[async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait DatabaseReader: Send + Sync {
    /// `get(table, key)` — a seek (not an exact match) that always
    /// delegates to the transaction; callers that need an exact-key
    /// guarantee use [`Self::get_one`] instead (spec.md §4.7,
    /// `original_source/silkrpc/core/state_reader.cpp`'s `get` usage over
    /// history-bitmap shard keys).
    async fn get(&self, table: &str, key: &[u8]) -> DbResult<Option<KeyValue>>;

    /// `get_one(table, key)` — consults the coherent state cache first when
    /// the facade is bound to the chain tip and the table is cacheable;
    /// otherwise delegates directly (spec.md §4.7).
    async fn get_one(&self, table: &str, key: &[u8]) -> DbResult<Bytes>;

    /// `get_both_range(table, key, subkey)` — always delegates (spec.md
    /// §4.7).
    async fn get_both_range(&self, table: &str, key: &[u8], subkey: &[u8]) -> DbResult<Option<Bytes>>;

    /// `walk(table, start, fixed_bits, fn)` — iterate via a raw cursor,
    /// invoking `fn(k, v)` until it returns `false` or the fixed-bit prefix
    /// is exhausted (spec.md §4.7, §8 "Prefix bound on walk").
    async fn walk(&self, table: &str, start: &[u8], fixed_bits: usize, f: &mut WalkFn<'_>) -> DbResult<()>;

    /// `for_prefix(table, prefix, fn)` — like `walk`, bounded by
    /// lexicographic prefix match (spec.md §4.7).
    async fn for_prefix(&self, table: &str, prefix: &[u8], f: &mut WalkFn<'_>) -> DbResult<()>;
}
