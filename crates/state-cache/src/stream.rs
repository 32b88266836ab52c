//! State-changes stream (spec.md §4.5, C6): a server-streaming subscription
//! that feeds committed state diffs into the [`CoherentStateCache`].

use crate::cache::CoherentStateCache;
use backoff::backoff::Backoff;
use rpcdaemon_errors::DbResult;
use rpcdaemon_metrics::StateStreamMetrics;
use rpcdaemon_net_clients::remote::StateChangeRequest;
use rpcdaemon_net_clients::KvRawClient;
use std::sync::Arc;
use std::time::Duration;
use tonic::Request;

/// Subscribes to `remote.Kv/StateChanges` and pushes every batch into a
/// [`CoherentStateCache`]. On transport error it reconnects with
/// exponential backoff (spec.md §4.5: "On transport error, the ingester
/// reconnects with backoff"); intended to run as its own `tokio::task` on a
/// dedicated context so cache updates never share a reactor with request
/// handlers (spec.md §4.2, §4.5).
pub struct StateChangesIngester {
    endpoint: String,
    cache: Arc<CoherentStateCache>,
    metrics: StateStreamMetrics,
}

impl StateChangesIngester {
    /// `endpoint` is the remote node's single gRPC endpoint (spec.md §6).
    pub fn new(endpoint: impl Into<String>, cache: Arc<CoherentStateCache>) -> Self {
        Self { endpoint: endpoint.into(), cache, metrics: StateStreamMetrics::default() }
    }

    /// Drive the reconnect loop forever. Never returns under normal
    /// operation; exits only if the enclosing task is aborted (e.g. by
    /// [`rpcdaemon_concurrency::ContextPool::stop`]).
    pub async fn run(self) {
        let mut backoff = backoff::ExponentialBackoff { max_elapsed_time: None, ..Default::default() };
        loop {
            match self.run_once().await {
                Ok(ingested) => {
                    tracing::warn!(ingested, "state-changes stream ended, reconnecting");
                    if ingested > 0 {
                        backoff.reset();
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "state-changes stream failed, reconnecting");
                }
            }
            self.metrics.reconnects.increment(1);
            let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(30));
            tokio::time::sleep(delay).await;
        }
    }

    /// Connect once and ingest batches until the stream ends or errors.
    /// Returns the number of batches successfully ingested this session.
    async fn run_once(&self) -> DbResult<u64> {
        let channel = rpcdaemon_net_clients::connect(self.endpoint.clone()).await?;
        let mut client = KvRawClient::new(channel);
        let mut stream = client.state_changes(Request::new(StateChangeRequest {})).await?.into_inner();

        let mut ingested = 0u64;
        while let Some(batch) = stream.message().await? {
            self.cache.on_new_block(&batch);
            self.metrics.batches_ingested.increment(1);
            ingested += 1;
        }
        Ok(ingested)
    }
}
