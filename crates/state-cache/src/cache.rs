//! Coherent state cache (spec.md §4.6, C7): a view-versioned, per-view LRU
//! cache of accounts/storage/code, read-through to a remote cursor on miss.

use alloy_primitives::B256;
use bytes::Bytes;
use parking_lot::RwLock;
use rpcdaemon_errors::DbResult;
use rpcdaemon_metrics::StateCacheMetrics;
use rpcdaemon_net_clients::remote::{Action, Direction, StateChangeBatch};
use rpcdaemon_remote_db::{make_key_address, make_storage_key, table, RemoteTransaction};
use schnellru::{ByLength, LruMap};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Configuration for one [`CoherentStateCache`] instance (spec.md §4.6
/// table).
#[derive(Debug, Clone)]
pub struct CoherentCacheConfig {
    /// Hard cap on retained view roots (LRU over view id).
    pub max_views: usize,
    /// Apply storage sub-changes into the cache.
    pub with_storage: bool,
    /// LRU cap on account/storage entries per root.
    pub max_state_keys: u32,
    /// LRU cap on code entries per root.
    pub max_code_keys: u32,
    /// How long `get_view` waits for the matching root to become `ready`.
    pub new_block_timeout: Duration,
    /// Used only in metrics.
    pub label: String,
}

impl Default for CoherentCacheConfig {
    fn default() -> Self {
        Self {
            max_views: 5,
            with_storage: true,
            max_state_keys: 1_000_000,
            max_code_keys: 10_000,
            new_block_timeout: Duration::from_millis(50),
            label: "default".to_owned(),
        }
    }
}

struct CacheRoot {
    state: LruMap<Vec<u8>, Bytes, ByLength>,
    code: LruMap<B256, Bytes, ByLength>,
    ready: bool,
    canonical: bool,
}

impl CacheRoot {
    fn new(config: &CoherentCacheConfig, canonical: bool) -> Self {
        Self {
            state: LruMap::new(ByLength::new(config.max_state_keys)),
            code: LruMap::new(ByLength::new(config.max_code_keys)),
            ready: false,
            canonical,
        }
    }
}

/// Versioned, per-view cache of accounts/storage/code entries (spec.md
/// §3 "Coherent state root", §4.6). Shared across every context (spec.md
/// §5 "Shared-resource policy"): internal locking makes it safe under
/// concurrent readers with the ingester as the sole writer.
pub struct CoherentStateCache {
    config: CoherentCacheConfig,
    roots: RwLock<BTreeMap<u64, Arc<RwLock<CacheRoot>>>>,
    ready_notify: Notify,
    metrics: StateCacheMetrics,
}

impl std::fmt::Debug for CoherentStateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoherentStateCache").field("label", &self.config.label).finish()
    }
}

impl CoherentStateCache {
    /// Build a cache with the given configuration.
    pub fn new(config: CoherentCacheConfig) -> Self {
        let metrics = StateCacheMetrics::new(&config.label);
        Self { config, roots: RwLock::new(BTreeMap::new()), ready_notify: Notify::new(), metrics }
    }

    /// Total resident entries across all roots (spec.md `size()`, used only
    /// for metrics).
    pub fn size(&self) -> usize {
        let roots = self.roots.read();
        roots.values().map(|root| { let r = root.read(); r.state.len() + r.code.len() }).sum()
    }

    /// Apply one state-change batch: create/extend the root for its view
    /// id, apply every account change, evict roots beyond `max_views`, and
    /// mark the new root ready (spec.md §4.6 `on_new_block`).
    pub fn on_new_block(&self, batch: &StateChangeBatch) {
        let view_id = batch.database_view_id;
        let root = {
            let mut roots = self.roots.write();
            roots
                .entry(view_id)
                .or_insert_with(|| {
                    let canonical = batch.change_batch.first().map(|c| c.direction() == Direction::Forward).unwrap_or(true);
                    Arc::new(RwLock::new(CacheRoot::new(&self.config, canonical)))
                })
                .clone()
        };

        {
            let mut root = root.write();
            for change in &batch.change_batch {
                for account in &change.changes {
                    self.apply_account_change(&mut root, account);
                }
            }
            root.ready = true;
        }

        self.evict_old_views();
        self.ready_notify.notify_waiters();
    }

    fn apply_account_change(&self, root: &mut CacheRoot, account: &rpcdaemon_net_clients::remote::AccountChange) {
        let address = alloy_primitives::Address::from_slice(&account.address);
        match account.action() {
            Action::Upsert => {
                self.insert_state(root, make_key_address(address), Bytes::from(account.data.clone()));
            }
            Action::UpsertCode => {
                self.insert_state(root, make_key_address(address), Bytes::from(account.data.clone()));
                let code = Bytes::from(account.code.clone());
                let hash = B256::from_slice(Keccak256::digest(&code).as_slice());
                self.insert_code(root, hash, code);
            }
            Action::Delete => {
                self.insert_state(root, make_key_address(address), Bytes::new());
            }
            Action::Storage => {}
            Action::Code => {
                let code = Bytes::from(account.code.clone());
                let hash = B256::from_slice(Keccak256::digest(&code).as_slice());
                self.insert_code(root, hash, code);
            }
        }
        if self.config.with_storage {
            for storage in &account.storage_changes {
                let location = B256::from_slice(&storage.location);
                let key = make_storage_key(address, account.incarnation, location);
                self.insert_state(root, key, Bytes::from(storage.data.clone()));
            }
        }
    }

    fn insert_state(&self, root: &mut CacheRoot, key: Vec<u8>, value: Bytes) {
        if root.state.len() as u32 >= root.state.limiter().max_length() && root.state.peek(&key).is_none() {
            self.metrics.evictions.increment(1);
        }
        root.state.insert(key, value);
    }

    fn insert_code(&self, root: &mut CacheRoot, key: B256, value: Bytes) {
        if root.code.len() as u32 >= root.code.limiter().max_length() && root.code.peek(&key).is_none() {
            self.metrics.evictions.increment(1);
        }
        root.code.insert(key, value);
    }

    fn evict_old_views(&self) {
        let mut roots = self.roots.write();
        while roots.len() > self.config.max_views {
            if let Some(&oldest) = roots.keys().next() {
                roots.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// Locate the root matching `tx`'s view id, waiting up to
    /// `new_block_timeout` for it to become `ready`. Returns `None` if no
    /// matching root ever appears or it is never readied in time; the
    /// caller must then fall back to reading through the transaction
    /// directly (spec.md §4.6 `get_view`).
    pub async fn get_view(&self, tx: &RemoteTransaction) -> Option<CacheView> {
        let view_id = tx.view_id();
        let deadline = tokio::time::Instant::now() + self.config.new_block_timeout;
        loop {
            // Register for the next notification *before* checking the
            // condition, so a notify_waiters() racing with our check is
            // never missed (spec.md §4.6/§9: "bounded wait... condition
            // variable signaled by the ingester when a root's ready flag
            // is set").
            let notified = self.ready_notify.notified();
            tokio::pin!(notified);
            if let Some(root) = self.ready_root(view_id) {
                return Some(CacheView { view_id, root, tx: tx.clone(), metrics: self.metrics.clone() });
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    fn ready_root(&self, view_id: u64) -> Option<Arc<RwLock<CacheRoot>>> {
        let roots = self.roots.read();
        let root = roots.get(&view_id)?;
        if root.read().ready {
            Some(root.clone())
        } else {
            None
        }
    }
}

/// A cache root bound to one view id, offering transactional read-through
/// (spec.md §4.6 "Returns a view object bound to V").
pub struct CacheView {
    #[allow(dead_code)]
    view_id: u64,
    root: Arc<RwLock<CacheRoot>>,
    tx: RemoteTransaction,
    metrics: StateCacheMetrics,
}

impl CacheView {
    /// `view.get(key)`: cache hit promotes the entry in the LRU list; a
    /// miss reads through the transaction's `PlainState` cursor, inserts
    /// the result, and returns it. An empty result means the key does not
    /// exist in the store either (spec.md §4.6).
    pub async fn get(&self, key: &[u8]) -> DbResult<Bytes> {
        if let Some(value) = self.root.write().state.get(&key.to_vec()).cloned() {
            self.metrics.state_hit.increment(1);
            return Ok(value);
        }
        self.metrics.state_miss.increment(1);
        let cursor = self.tx.cursor(table::PLAIN_STATE).await?;
        let found = cursor.seek_exact(key).await?;
        let value = found.map(|(_, v)| v).unwrap_or_default();
        self.insert(key.to_vec(), value.clone());
        Ok(value)
    }

    /// `view.get_code(hash)`: identical to [`Self::get`] but keyed by code
    /// hash and using the code cache.
    pub async fn get_code(&self, hash: B256) -> DbResult<Bytes> {
        if let Some(value) = self.root.write().code.get(&hash).cloned() {
            self.metrics.code_hit.increment(1);
            return Ok(value);
        }
        self.metrics.code_miss.increment(1);
        let cursor = self.tx.cursor(table::CODE).await?;
        let found = cursor.seek_exact(hash.as_slice()).await?;
        let value = found.map(|(_, v)| v).unwrap_or_default();
        self.insert_code(hash, value.clone());
        Ok(value)
    }

    fn insert(&self, key: Vec<u8>, value: Bytes) {
        self.root.write().state.insert(key, value);
    }

    fn insert_code(&self, hash: B256, value: Bytes) {
        self.root.write().code.insert(hash, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpcdaemon_net_clients::remote::{AccountChange, StateChange, StorageChange};

    fn batch(view_id: u64, address: [u8; 20], incarnation: u64, location: [u8; 32], data: Vec<u8>) -> StateChangeBatch {
        StateChangeBatch {
            database_view_id: view_id,
            change_batch: vec![StateChange {
                block_height: 1,
                block_hash: vec![0; 32],
                direction: Direction::Forward as i32,
                changes: vec![AccountChange {
                    address: address.to_vec(),
                    action: Action::Storage as i32,
                    incarnation,
                    data: Vec::new(),
                    code: Vec::new(),
                    storage_changes: vec![StorageChange { location: location.to_vec(), data }],
                }],
            }],
        }
    }

    #[test]
    fn on_new_block_marks_root_ready_and_bounds_views() {
        let cache = CoherentStateCache::new(CoherentCacheConfig { max_views: 2, ..Default::default() });
        for view_id in 1..=3u64 {
            cache.on_new_block(&batch(view_id, [0xAA; 20], 3, [0x11; 32], vec![0x60, 0x00, 0x35, 0x60, 0x00, 0x55]));
        }
        let roots = cache.roots.read();
        assert_eq!(roots.len(), 2);
        assert!(roots.contains_key(&2));
        assert!(roots.contains_key(&3));
        assert!(!roots.contains_key(&1));
    }

    #[test]
    fn monotone_view_ids_supersede() {
        let cache = CoherentStateCache::new(CoherentCacheConfig::default());
        cache.on_new_block(&batch(1, [0xAA; 20], 3, [0x11; 32], vec![1]));
        cache.on_new_block(&batch(2, [0xAA; 20], 3, [0x11; 32], vec![2]));
        let roots = cache.roots.read();
        assert!(roots.get(&1).unwrap().read().ready);
        assert!(roots.get(&2).unwrap().read().ready);
    }

    /// spec.md §8 scenario 6: after the ingester applies a storage change
    /// for (addr, incarnation 3, location) at a given view id, `view.get`
    /// for that composite key returns the stored value straight from the
    /// cache root -- no read-through, since `RemoteTransaction::for_test`
    /// has no live stream and would error if `view.get` ever fell through
    /// to it.
    #[tokio::test]
    async fn cache_hit_after_state_change_batch_returns_stored_storage_value() {
        let address = [0x0a; 20];
        let incarnation = 3u64;
        let location = [0x66; 32];
        let value = vec![0x60, 0x00, 0x35, 0x60, 0x00, 0x55];

        let cache = CoherentStateCache::new(CoherentCacheConfig::default());
        cache.on_new_block(&batch(42, address, incarnation, location, value.clone()));

        let tx = RemoteTransaction::for_test(42);
        let view = cache.get_view(&tx).await.expect("root for view 42 is ready");

        let key = make_storage_key(alloy_primitives::Address::from(address), incarnation, B256::from(location));
        let stored = view.get(&key).await.expect("cache hit must not read through the stream-less fake transaction");
        assert_eq!(stored.as_ref(), value.as_slice());
    }
}
