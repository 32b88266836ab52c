//! Shared application state every namespace handler is built against, plus
//! the two pieces of plumbing spec.md §4.11/§5 require of every handler:
//! dispatch onto a context (C3) and guaranteed transaction closure (C4).

use alloy_primitives::B256;
use futures_util::FutureExt;
use rpcdaemon_concurrency::ContextPool;
use rpcdaemon_errors::JsonRpcError;
use rpcdaemon_net_clients::BackendClient;
use rpcdaemon_provider::{BlockCache, CachedDatabase, ChainAccessors};
use rpcdaemon_remote_db::RemoteTransaction;
use rpcdaemon_state_cache::CoherentStateCache;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex as AsyncMutex};

use rpcdaemon_provider::BlockId;

/// Everything a namespace handler needs: a way to open transactions, the
/// shared caches, the unary backend client, and the context pool every
/// request is dispatched onto.
#[derive(Clone)]
pub struct AppContext {
    kv_client: rpcdaemon_net_clients::KvRawClient,
    backend_client: Arc<AsyncMutex<BackendClient>>,
    state_cache: Arc<CoherentStateCache>,
    block_cache: Arc<BlockCache>,
    context_pool: Arc<ContextPool>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn new(
        kv_client: rpcdaemon_net_clients::KvRawClient,
        backend_client: BackendClient,
        state_cache: Arc<CoherentStateCache>,
        block_cache: Arc<BlockCache>,
        context_pool: Arc<ContextPool>,
    ) -> Self {
        Self {
            kv_client,
            backend_client: Arc::new(AsyncMutex::new(backend_client)),
            state_cache,
            block_cache,
            context_pool,
        }
    }

    pub fn block_cache(&self) -> &BlockCache {
        &self.block_cache
    }

    pub fn backend_client(&self) -> &AsyncMutex<BackendClient> {
        &self.backend_client
    }

    /// Open a remote transaction, resolve the chain tip (spec.md §3:
    /// "`latest` resolves to the progress of the `Execution` sync stage"),
    /// and bind a cached database facade (C8) to `block`.
    ///
    /// Returns the facade wrapped in a [`TxGuard`] so the caller's only
    /// remaining obligation is to call [`TxGuard::close`] on every exit
    /// path (spec.md §5 "Resource acquisition", §8 "Transaction hygiene");
    /// the guard's `Drop` impl is a safety net if that is skipped.
    pub async fn open(&self, block: BlockId) -> Result<(TxGuard, u64), JsonRpcError> {
        let tx = RemoteTransaction::open(self.kv_client.clone()).await.map_err(JsonRpcError::from)?;

        // Bootstrap facade: SyncStageProgress is not a cacheable table, so
        // the tip/block arguments used here only affect `bound_to_tip`
        // bookkeeping, never correctness of this read.
        let bootstrap = CachedDatabase::new(tx.clone(), self.state_cache.clone(), BlockId::Number(0), 0);
        let accessors = ChainAccessors::new(&bootstrap, &self.block_cache);
        let tip = accessors.sync_stage_progress("Execution").await.map_err(JsonRpcError::from)?;

        let db = CachedDatabase::new(tx.clone(), self.state_cache.clone(), block, tip);
        Ok((TxGuard::new(tx, db), tip))
    }

    /// Resolve a [`BlockId`] to a concrete block number given the tip
    /// already computed by [`Self::open`] (spec.md §3).
    pub fn resolve_number(block: BlockId, tip: u64) -> u64 {
        match block {
            BlockId::Number(number) => number,
            BlockId::Earliest => 0,
            BlockId::Latest | BlockId::Pending => tip,
            BlockId::Hash(_) => tip,
        }
    }

    /// Dispatch `fut` onto the next context in the pool (spec.md §4.2/§4.11:
    /// "scheduled on the next context's reactor") and guard it against a
    /// panic escaping into the reactor loop, converting one into `code 100`
    /// "unexpected exception" (spec.md §7) rather than letting it propagate.
    pub async fn dispatch<F, T>(&self, fut: F) -> Result<T, JsonRpcError>
    where
        F: Future<Output = Result<T, JsonRpcError>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let guarded = async move {
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(JsonRpcError::unexpected_exception()),
            };
            let _ = reply_tx.send(outcome);
        };
        self.context_pool.next_context().spawn(guarded);
        reply_rx.await.map_err(|_| JsonRpcError::cancelled())?
    }
}

/// RAII wrapper around an open [`RemoteTransaction`] and the [`CachedDatabase`]
/// facade bound to it (spec.md §5 "Resource acquisition": "Every transaction
/// opened inside a handler must be closed on every exit path").
///
/// [`Self::close`] is the primary path; `Drop` fires a best-effort
/// fire-and-forget close if a handler exits without calling it (e.g. a panic
/// unwinding through [`AppContext::dispatch`]'s `catch_unwind` boundary).
/// `RemoteTransaction::close` is idempotent, so the two never race
/// destructively.
pub struct TxGuard {
    tx: Option<RemoteTransaction>,
    db: CachedDatabase,
}

impl std::fmt::Debug for TxGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxGuard").field("db", &self.db).finish()
    }
}

impl TxGuard {
    fn new(tx: RemoteTransaction, db: CachedDatabase) -> Self {
        Self { tx: Some(tx), db }
    }

    /// The cached database facade (C8) bound to this transaction.
    pub fn db(&self) -> &CachedDatabase {
        &self.db
    }

    /// `ChainAccessors` (C10) bound to this transaction and the shared
    /// block cache.
    pub fn chain<'a>(&'a self, block_cache: &'a BlockCache) -> ChainAccessors<'a, CachedDatabase> {
        ChainAccessors::new(&self.db, block_cache)
    }

    /// Close the transaction, consuming the guard so `Drop` has nothing left
    /// to do.
    pub async fn close(mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(err) = tx.close().await {
                tracing::warn!(%err, "failed to close transaction");
            }
        }
    }
}

impl Drop for TxGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tokio::spawn(async move {
                if let Err(err) = tx.close().await {
                    tracing::warn!(%err, "failed to close transaction in drop guard");
                }
            });
        }
    }
}

/// Genesis hash (`CanonicalHashes[0]`), used by the engine-API handlers to
/// look up the chain config keyed by it (spec.md §4.9 `chain_config`).
pub async fn genesis_hash(guard: &TxGuard, block_cache: &BlockCache) -> Result<B256, JsonRpcError> {
    guard.chain(block_cache).canonical_hash(0).await.map_err(JsonRpcError::from)
}
