//! Remote transaction / cursor client (spec.md §4.3, C4): the client half
//! of the `remote.Kv/Tx` bidirectional stream, acting as a remote read
//! transaction that multiplexes many named cursors over one stream.

use bytes::Bytes;
use rpcdaemon_errors::{DbError, DbResult};
use rpcdaemon_net_clients::remote::{Cursor as WireCursor, Op, Pair};
use rpcdaemon_net_clients::KvRawClient;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_stream::wrappers::ReceiverStream;
use tonic::Streaming;

/// A key/value pair read from a cursor, or `None` for end-of-range (spec.md
/// §3: "Results with empty key denote end-of-iteration").
pub type KeyValue = (Bytes, Bytes);

struct TxInner {
    view_id: u64,
    sender: mpsc::Sender<WireCursor>,
    /// `None` only for [`RemoteTransaction::for_test`] fakes, which are
    /// always constructed already `closed` so this is never unwrapped.
    stream: Option<AsyncMutex<Streaming<Pair>>>,
    cursors: AsyncMutex<HashMap<String, u32>>,
    closed: AtomicBool,
}

impl TxInner {
    /// Send one command and await its matching reply. The transaction-wide
    /// `stream` lock is held for the whole round trip, which is exactly
    /// the serialization spec.md §4.3/§5 requires: "cursor operations
    /// issued on one transaction are fully serialized; callers must not
    /// issue a second operation before the first completes."
    async fn do_op(&self, cmd: WireCursor) -> DbResult<Pair> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::AlreadyClosed);
        }
        let mut stream = self.stream.as_ref().expect("live transaction always has a stream").lock().await;
        self.sender.send(cmd).await.map_err(|_| DbError::Transport("tx command channel closed".into()))?;
        let pair = stream.message().await?;
        pair.ok_or_else(|| DbError::Transport("tx stream closed before reply".into()))
    }
}

/// A server-allocated read view with a monotonically increasing view id
/// (spec.md §3 "Remote transaction"). Opened on demand per handler
/// invocation; must be [`Self::close`]d on every exit path.
#[derive(Clone)]
pub struct RemoteTransaction {
    inner: Arc<TxInner>,
}

impl std::fmt::Debug for RemoteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTransaction").field("view_id", &self.inner.view_id).finish()
    }
}

impl RemoteTransaction {
    /// Open the `Tx` bidi stream and read the view id the server sends as
    /// its first message (spec.md §4.3: "The first server message after
    /// stream start carries the view id").
    pub async fn open(mut client: KvRawClient) -> DbResult<Self> {
        let (tx, rx) = mpsc::channel::<WireCursor>(32);
        let response = client.tx(ReceiverStream::new(rx)).await?;
        let mut stream = response.into_inner();
        let first = stream.message().await?.ok_or_else(|| DbError::Transport("tx stream closed before view id".into()))?;
        let view_id = first.tx_id;
        tracing::trace!(view_id, "remote transaction opened");
        Ok(Self {
            inner: Arc::new(TxInner {
                view_id,
                sender: tx,
                stream: Some(AsyncMutex::new(stream)),
                cursors: AsyncMutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// A transaction with no live stream, pre-marked closed (spec.md §9
    /// "Test seams"). `do_op` rejects every call with `AlreadyClosed`
    /// before ever touching the stream, so this is sound for tests that
    /// only exercise a cache hit and never issue a cursor op — such as the
    /// coherent-cache's view-id plumbing (spec.md §8 scenario 6).
    #[cfg(feature = "test-util")]
    pub fn for_test(view_id: u64) -> Self {
        let (sender, _rx) = mpsc::channel(1);
        Self {
            inner: Arc::new(TxInner {
                view_id,
                sender,
                stream: None,
                cursors: AsyncMutex::new(HashMap::new()),
                closed: AtomicBool::new(true),
            }),
        }
    }

    /// The view id assigned by the server when this transaction opened.
    pub fn view_id(&self) -> u64 {
        self.inner.view_id
    }

    /// Open (or reuse a memoized) cursor over `table` (spec.md §4.3:
    /// "repeated opens for the same table on the same transaction return
    /// the same cursor").
    pub async fn cursor(&self, table: &str) -> DbResult<RemoteCursor> {
        let mut cursors = self.inner.cursors.lock().await;
        if let Some(&id) = cursors.get(table) {
            return Ok(RemoteCursor { id, inner: self.inner.clone() });
        }
        let cmd = WireCursor { op: Op::Open as i32, cursor: 0, bucket_name: table.to_owned(), k: Vec::new(), v: Vec::new() };
        let pair = self.inner.do_op(cmd).await?;
        cursors.insert(table.to_owned(), pair.cursor_id);
        tracing::trace!(table, cursor_id = pair.cursor_id, "opened cursor");
        Ok(RemoteCursor { id: pair.cursor_id, inner: self.inner.clone() })
    }

    /// Like [`Self::cursor`] for a duplicate-sort table. The wire protocol
    /// distinguishes cursors only by the ops issued against them (`SEEK_*`
    /// vs `SEEK_BOTH*`), not by how they are opened, so this reuses the
    /// same memoized-cursor machinery; every [`RemoteCursor`] exposes the
    /// dup-sort operations regardless of how it was obtained.
    pub async fn cursor_dup_sort(&self, table: &str) -> DbResult<RemoteCursor> {
        self.cursor(table).await
    }

    /// Send `CLOSE` for every live cursor and mark the transaction unusable.
    /// Idempotent. Spec.md §4.3: "closing it releases [the cursors]";
    /// §3 lifecycle: "must be closed on every exit path, success or
    /// failure."
    pub async fn close(&self) -> DbResult<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let ids: Vec<u32> = {
            let cursors = self.inner.cursors.lock().await;
            cursors.values().copied().collect()
        };
        for id in ids {
            let cmd = WireCursor { op: Op::Close as i32, cursor: id, bucket_name: String::new(), k: Vec::new(), v: Vec::new() };
            if let Err(err) = self.inner.do_op(cmd).await {
                tracing::warn!(cursor_id = id, %err, "failed to close cursor cleanly");
            }
        }
        tracing::trace!(view_id = self.inner.view_id, "remote transaction closed");
        Ok(())
    }
}

/// A stateful cursor handle identified by a server-assigned id (spec.md
/// §3). Cheap to clone; every clone shares the same underlying transaction
/// stream and is therefore itself subject to the transaction-wide
/// serialization rule.
#[derive(Clone)]
pub struct RemoteCursor {
    id: u32,
    inner: Arc<TxInner>,
}

impl std::fmt::Debug for RemoteCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCursor").field("id", &self.id).finish()
    }
}

fn pair_to_kv(pair: Pair) -> Option<KeyValue> {
    if pair.k.is_empty() {
        None
    } else {
        Some((Bytes::from(pair.k), Bytes::from(pair.v)))
    }
}

impl RemoteCursor {
    /// Server-assigned cursor id, valid only for this transaction's
    /// lifetime (spec.md §3).
    pub fn id(&self) -> u32 {
        self.id
    }

    async fn op(&self, op: Op, k: Vec<u8>, v: Vec<u8>) -> DbResult<Option<KeyValue>> {
        let cmd = WireCursor { op: op as i32, cursor: self.id, bucket_name: String::new(), k, v };
        let pair = self.inner.do_op(cmd).await?;
        Ok(pair_to_kv(pair))
    }

    /// `seek(key) -> (key, value)`.
    pub async fn seek(&self, key: &[u8]) -> DbResult<Option<KeyValue>> {
        self.op(Op::Seek, key.to_vec(), Vec::new()).await
    }

    /// `seek_exact(key) -> (key, value)`.
    pub async fn seek_exact(&self, key: &[u8]) -> DbResult<Option<KeyValue>> {
        self.op(Op::SeekExact, key.to_vec(), Vec::new()).await
    }

    /// `next -> (key, value)`.
    pub async fn next(&self) -> DbResult<Option<KeyValue>> {
        self.op(Op::Next, Vec::new(), Vec::new()).await
    }

    /// `seek_both(key, subkey) -> value` (duplicate-sort cursors only).
    pub async fn seek_both(&self, key: &[u8], subkey: &[u8]) -> DbResult<Option<Bytes>> {
        Ok(self.op(Op::SeekBoth, key.to_vec(), subkey.to_vec()).await?.map(|(_, v)| v))
    }

    /// `seek_both_exact(key, subkey) -> (key, value)` (duplicate-sort
    /// cursors only).
    pub async fn seek_both_exact(&self, key: &[u8], subkey: &[u8]) -> DbResult<Option<KeyValue>> {
        self.op(Op::SeekBothExact, key.to_vec(), subkey.to_vec()).await
    }
}
