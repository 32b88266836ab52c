//! Fixed bank of [`ContextHandle`]s dispatched round-robin (spec §4.2, C3).

use crate::context::{ContextHandle, ContextRunner};
use crate::wait_strategy::WaitMode;
use rpcdaemon_metrics::ContextPoolMetrics;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Errors constructing or operating a [`ContextPool`].
#[derive(Debug, thiserror::Error)]
pub enum ContextPoolError {
    /// `size` passed to [`ContextPool::new`] was `0`.
    #[error("context pool size must be greater than zero")]
    EmptyPool,
    /// An operation was attempted on a pool whose `stop()` already ran.
    #[error("context pool already stopped")]
    AlreadyStopped,
}

/// A fixed-size bank of [`Context`](crate::context)s, each running on its
/// own dedicated OS thread. Round-robin is the only selection policy (spec
/// §4.2): "Selection is strict round-robin."
#[derive(Debug)]
pub struct ContextPool {
    handles: Vec<ContextHandle>,
    shutdown_txs: Vec<oneshot::Sender<()>>,
    threads: Vec<std::thread::JoinHandle<()>>,
    next: AtomicUsize,
    stopped: AtomicBool,
    metrics: ContextPoolMetrics,
}

impl ContextPool {
    /// Start `size` contexts, one dedicated OS thread each, all sharing the
    /// same [`WaitMode`]. Returns [`ContextPoolError::EmptyPool`] if `size`
    /// is zero (spec §4.2: "fixed-size, size>0 (error otherwise)").
    pub fn new(size: usize, wait_mode: WaitMode) -> Result<Self, ContextPoolError> {
        if size == 0 {
            return Err(ContextPoolError::EmptyPool);
        }

        let mut handles = Vec::with_capacity(size);
        let mut shutdown_txs = Vec::with_capacity(size);
        let mut threads = Vec::with_capacity(size);

        for id in 0..size {
            let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
            let (shutdown_tx, shutdown_rx) = oneshot::channel();

            let runtime = Arc::new(if wait_mode.is_blocking() {
                tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .thread_name(format!("rpcdaemon-ctx-{id}"))
                    .build()
                    .expect("failed to build context runtime")
            } else {
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to build context runtime")
            });

            let handle = ContextHandle::new(id, runtime.clone(), inbox_tx);
            let runner = ContextRunner { id, wait_mode, runtime, inbox_rx, shutdown_rx };

            let thread = std::thread::Builder::new()
                .name(format!("rpcdaemon-ctx-{id}"))
                .spawn(move || runner.run())
                .expect("failed to spawn context thread");

            handles.push(handle);
            shutdown_txs.push(shutdown_tx);
            threads.push(thread);
        }

        let metrics = ContextPoolMetrics::default();
        metrics.active_contexts.set(size as f64);

        tracing::debug!(size, "context pool started");
        Ok(Self { handles, shutdown_txs, threads, next: AtomicUsize::new(0), stopped: AtomicBool::new(false), metrics })
    }

    /// Number of contexts in the pool.
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Select the next context in strict round-robin order. Wraps modulo
    /// pool size; `N` consecutive calls visit every context exactly once
    /// (spec §8 "round-robin fairness").
    pub fn next_context(&self) -> &ContextHandle {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.handles.len();
        self.metrics.next_index.set(idx as f64);
        &self.handles[idx]
    }

    /// Alias for [`Self::next_context`]: in this single-reactor-per-context
    /// design, the context that accepts a request is also the one that
    /// performs its I/O (spec §4.2 exposes both names).
    pub fn next_io_context(&self) -> &ContextHandle {
        self.next_context()
    }

    /// Signal every context's reactor to halt. Idempotent; a second call
    /// (or any subsequent `next_context`/`join`) errors.
    ///
    /// The pool cannot be restarted after this (spec §4.2).
    pub fn stop(&mut self) -> Result<(), ContextPoolError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(ContextPoolError::AlreadyStopped);
        }
        for tx in self.shutdown_txs.drain(..) {
            let _ = tx.send(());
        }
        tracing::debug!("context pool stop signalled");
        Ok(())
    }

    /// Wait for every context's dedicated thread to exit. Call after
    /// [`Self::stop`].
    pub fn join(&mut self) {
        for thread in self.threads.drain(..) {
            if let Err(err) = thread.join() {
                tracing::error!(?err, "context thread panicked");
            }
        }
        self.metrics.active_contexts.set(0.0);
    }
}

impl Drop for ContextPool {
    fn drop(&mut self) {
        if !self.stopped.load(Ordering::SeqCst) {
            let _ = self.stop();
        }
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_pool() {
        assert!(matches!(ContextPool::new(0, WaitMode::BusySpin), Err(ContextPoolError::EmptyPool)));
    }

    #[test]
    fn round_robin_visits_each_context_once() {
        let pool = ContextPool::new(4, WaitMode::BusySpin).unwrap();
        let mut seen: Vec<usize> = (0..4).map(|_| pool.next_context().id()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn stop_is_not_reentrant() {
        let mut pool = ContextPool::new(2, WaitMode::BusySpin).unwrap();
        assert!(pool.stop().is_ok());
        assert!(matches!(pool.stop(), Err(ContextPoolError::AlreadyStopped)));
        pool.join();
    }
}
