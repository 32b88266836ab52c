//! Cached database facade (spec.md §4.7, C8): makes the coherent state
//! cache and the remote transaction look like one [`DatabaseReader`],
//! choosing between them per request based on whether the facade is bound
//! to the chain tip.

use crate::reader::{DatabaseReader, KeyValue, WalkFn};
use alloy_primitives::B256;
use async_trait::async_trait;
use bytes::Bytes;
use rpcdaemon_errors::DbResult;
use rpcdaemon_remote_db::table as tables;
use rpcdaemon_remote_db::{prefix_matches, RemoteTransaction};
use rpcdaemon_state_cache::CoherentStateCache;
use std::sync::Arc;

use crate::block_id::BlockId;

/// `get_one` consults the cache only for these two tables (spec.md §4.7:
/// "the account/storage table or the code table").
fn is_cacheable_table(table: &str) -> bool {
    table == tables::PLAIN_STATE || table == tables::CODE
}

/// A reader bound at construction to a block identifier and an open
/// transaction (spec.md §4.7). The "bound to chain tip" decision is
/// resolved once in [`Self::new`] and frozen for the facade's whole
/// lifetime, to preserve view consistency across every read it serves.
pub struct CachedDatabase {
    tx: RemoteTransaction,
    cache: Arc<CoherentStateCache>,
    bound_to_tip: bool,
}

impl std::fmt::Debug for CachedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedDatabase").field("bound_to_tip", &self.bound_to_tip).finish()
    }
}

impl CachedDatabase {
    /// `block` is the identifier this facade was opened for; `tip` is the
    /// highest executed block number at transaction-open time. A hash
    /// identifier never binds to the tip (spec.md §4.7: "if the identifier
    /// is a hash ... cache consultation is skipped"); a numeric identifier
    /// binds only when it equals the tip exactly.
    pub fn new(tx: RemoteTransaction, cache: Arc<CoherentStateCache>, block: BlockId, tip: u64) -> Self {
        let bound_to_tip = match block {
            BlockId::Hash(_) => false,
            BlockId::Number(number) => number == tip,
            BlockId::Earliest => tip == 0,
            BlockId::Latest | BlockId::Pending => true,
        };
        Self { tx, cache, bound_to_tip }
    }

    /// Whether this facade resolved to the chain tip at construction.
    pub fn bound_to_tip(&self) -> bool {
        self.bound_to_tip
    }

    /// The underlying remote transaction, for callers (C9/C10) that need
    /// direct cursor access beyond the `DatabaseReader` surface.
    pub fn transaction(&self) -> &RemoteTransaction {
        &self.tx
    }
}

#[async_trait]
impl DatabaseReader for CachedDatabase {
    async fn get(&self, table: &str, key: &[u8]) -> DbResult<Option<KeyValue>> {
        let cursor = self.tx.cursor(table).await?;
        cursor.seek(key).await
    }

    async fn get_one(&self, table: &str, key: &[u8]) -> DbResult<Bytes> {
        if self.bound_to_tip && is_cacheable_table(table) {
            if let Some(view) = self.cache.get_view(&self.tx).await {
                return if table == tables::CODE {
                    view.get_code(B256::from_slice(key)).await
                } else {
                    view.get(key).await
                };
            }
        }
        let cursor = self.tx.cursor(table).await?;
        Ok(cursor.seek_exact(key).await?.map(|(_, v)| v).unwrap_or_default())
    }

    async fn get_both_range(&self, table: &str, key: &[u8], subkey: &[u8]) -> DbResult<Option<Bytes>> {
        let cursor = self.tx.cursor_dup_sort(table).await?;
        cursor.seek_both(key, subkey).await
    }

    async fn walk(&self, table: &str, start: &[u8], fixed_bits: usize, f: &mut WalkFn<'_>) -> DbResult<()> {
        let cursor = self.tx.cursor(table).await?;
        let mut current = cursor.seek(start).await?;
        while let Some((k, v)) = current {
            if !prefix_matches(&k, start, fixed_bits) {
                break;
            }
            if !f(&k, &v) {
                break;
            }
            current = cursor.next().await?;
        }
        Ok(())
    }

    async fn for_prefix(&self, table: &str, prefix: &[u8], f: &mut WalkFn<'_>) -> DbResult<()> {
        self.walk(table, prefix, prefix.len() * 8, f).await
    }
}
