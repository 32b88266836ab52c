//! Thin `metrics` crate wrappers for the rpcdaemon gateway.
//!
//! The teacher (`reth-metrics`) pairs a derive macro with hand-rolled
//! structs for the cases a derive can't express (label-keyed counter sets).
//! The state cache's metrics are exactly that case -- each cache instance
//! carries a `label` (spec §4.6) that becomes a metric label rather than a
//! fixed field -- so this crate exposes small constructors instead of a
//! derive.

use metrics::{Counter, Gauge};

/// Counters for one [`rpcdaemon_state_cache::CoherentStateCache`] instance,
/// keyed by its configured `label` (spec §4.6 table).
#[derive(Debug, Clone)]
pub struct StateCacheMetrics {
    /// `view.get` resolved from the cache.
    pub state_hit: Counter,
    /// `view.get` fell through to the transaction.
    pub state_miss: Counter,
    /// `view.get_code` resolved from the cache.
    pub code_hit: Counter,
    /// `view.get_code` fell through to the transaction.
    pub code_miss: Counter,
    /// Entries evicted by the per-root LRU policy.
    pub evictions: Counter,
    /// Total resident entries across all roots (spec `size()`).
    pub resident_entries: Gauge,
}

impl StateCacheMetrics {
    /// Build a metric set scoped to `label`.
    pub fn new(label: &str) -> Self {
        Self {
            state_hit: metrics::counter!("rpcdaemon_state_cache_hit_total", "label" => label.to_owned()),
            state_miss: metrics::counter!("rpcdaemon_state_cache_miss_total", "label" => label.to_owned()),
            code_hit: metrics::counter!("rpcdaemon_code_cache_hit_total", "label" => label.to_owned()),
            code_miss: metrics::counter!("rpcdaemon_code_cache_miss_total", "label" => label.to_owned()),
            evictions: metrics::counter!("rpcdaemon_state_cache_eviction_total", "label" => label.to_owned()),
            resident_entries: metrics::gauge!("rpcdaemon_state_cache_resident_entries", "label" => label.to_owned()),
        }
    }
}

/// Counters for the state-changes ingester (spec §4.5).
#[derive(Debug, Clone)]
pub struct StateStreamMetrics {
    /// Number of reconnect attempts after a transport error.
    pub reconnects: Counter,
    /// Number of state-change batches successfully ingested.
    pub batches_ingested: Counter,
}

impl Default for StateStreamMetrics {
    fn default() -> Self {
        Self {
            reconnects: metrics::counter!("rpcdaemon_state_stream_reconnect_total"),
            batches_ingested: metrics::counter!("rpcdaemon_state_stream_batches_total"),
        }
    }
}

/// Counters/gauges for the context pool (spec §4.2).
#[derive(Debug, Clone)]
pub struct ContextPoolMetrics {
    /// Number of contexts currently running.
    pub active_contexts: Gauge,
    /// Current round-robin cursor position.
    pub next_index: Gauge,
}

impl Default for ContextPoolMetrics {
    fn default() -> Self {
        Self {
            active_contexts: metrics::gauge!("rpcdaemon_context_pool_active_contexts"),
            next_index: metrics::gauge!("rpcdaemon_context_pool_next_index"),
        }
    }
}
