//! A single execution loop (spec §4.2, C2): one OS thread, one async
//! executor, and the client handles a handler needs to talk to the remote
//! node.
//!
//! The spec's "I/O reactor fused with a gRPC completion queue" maps onto
//! Tokio as follows: Tokio's own I/O/timer driver *is* the reactor, and is
//! never exposed directly. What the spec calls "posting a completion
//! handler onto the reactor" is, here, pushing a boxed future onto the
//! context's dispatch inbox; draining that inbox and driving it to the next
//! suspension point is this module's `poll_dispatch_queue` analogue of
//! `poll_completion_queue()` + `poll_reactor()`. In `blocking` wait mode
//! (spec: "not used in single-threaded mode") this module steps aside
//! entirely and lets a 2-worker Tokio runtime schedule everything, matching
//! "one thread runs the reactor, another drains the completion queue".

use crate::wait_strategy::WaitMode;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A boxed unit of work posted onto a context: a handler invocation that
/// will itself suspend at its outbound RPCs.
pub type Work = Box<dyn FnOnce() -> futures_util::future::BoxFuture<'static, ()> + Send>;

/// Handle shared by callers who want to post work onto a context without
/// owning its run loop. Cheap to clone; every clone posts to the same
/// inbox.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    id: usize,
    runtime: Arc<tokio::runtime::Runtime>,
    inbox: mpsc::UnboundedSender<Work>,
}

impl ContextHandle {
    /// Build a handle wrapping the inbox half of a freshly created context.
    /// Called only by [`crate::context_pool::ContextPool`].
    pub(crate) fn new(id: usize, runtime: Arc<tokio::runtime::Runtime>, inbox: mpsc::UnboundedSender<Work>) -> Self {
        Self { id, runtime, inbox }
    }

    /// This context's position in the pool, `0..pool_size`.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Post a handler invocation onto this context's thread. Work posted
    /// onto the same context is always started in the order it was posted
    /// (spec §4.2: "work posted into a given context is serialized on that
    /// context's thread" -- serialized in *start* order; suspension at an
    /// `.await` can interleave multiple in-flight handlers on the same
    /// thread, exactly like any other cooperatively scheduled executor).
    pub fn spawn(&self, fut: impl std::future::Future<Output = ()> + Send + 'static) {
        let boxed: futures_util::future::BoxFuture<'static, ()> = Box::pin(fut);
        if self.inbox.send(Box::new(move || boxed)).is_err() {
            tracing::warn!(context_id = self.id, "posting work to a stopped context");
        }
    }

    /// The Tokio runtime handle backing this context, for spawning
    /// background tasks that must live on this context's thread (e.g. the
    /// state-changes ingester, spec §4.5: "runs on its own context").
    pub fn tokio_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }
}

/// Owns the run loop for one context. Built by
/// [`crate::context_pool::ContextPool`]; not constructed directly by
/// handler code.
pub(crate) struct ContextRunner {
    pub(crate) id: usize,
    pub(crate) wait_mode: WaitMode,
    pub(crate) runtime: Arc<tokio::runtime::Runtime>,
    pub(crate) inbox_rx: mpsc::UnboundedReceiver<Work>,
    pub(crate) shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

impl ContextRunner {
    /// Drive this context's run loop until `stop()` is signalled. Blocks
    /// the calling (dedicated) OS thread for the context's whole lifetime.
    pub(crate) fn run(self) {
        let Self { id, wait_mode, runtime, mut inbox_rx, mut shutdown_rx } = self;

        if wait_mode.is_blocking() {
            // Multi-threaded loop (spec §4.2): let Tokio's own
            // multi-worker scheduler act as both reactor and completion
            // queue drainer; we just keep the runtime alive until shutdown.
            runtime.block_on(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut shutdown_rx => break,
                        work = inbox_rx.recv() => {
                            match work {
                                Some(work) => { tokio::spawn(work()); }
                                None => break,
                            }
                        }
                    }
                }
            });
            tracing::debug!(context_id = id, "context stopped (blocking mode)");
            return;
        }

        // Single-threaded loop (spec §4.2): alternate draining the dispatch
        // inbox and letting the local runtime make progress, calling
        // `idle()` with the tick's completion count.
        let mut strategy = wait_mode.make_wait_strategy();
        runtime.block_on(async move {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }
                let mut executed = 0u32;
                while let Ok(work) = inbox_rx.try_recv() {
                    tokio::spawn(work());
                    executed += 1;
                }
                // Give the runtime a chance to advance already-spawned
                // futures to their next suspension point (their own
                // `.await`s are the reactor-driven part).
                tokio::task::yield_now().await;
                strategy.idle(executed);
            }
        });
        tracing::debug!(context_id = id, "context stopped");
    }
}
