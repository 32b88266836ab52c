//! The method table (spec.md §4.11): "a static map from method name to
//! handler function pointer, built at construction from a comma-separated
//! list of namespaces. Unknown namespaces log a warning and are skipped."

use crate::namespaces::{debug, engine, erigon, eth, net, parity, trace, txpool, web3};
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;
use std::str::FromStr;

use crate::context::AppContext;

/// One of the method namespaces this gateway implements (spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Eth,
    Debug,
    Trace,
    Erigon,
    Net,
    Web3,
    TxPool,
    Parity,
    Engine,
}

impl FromStr for Namespace {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "eth" => Ok(Self::Eth),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            "erigon" => Ok(Self::Erigon),
            "net" => Ok(Self::Net),
            "web3" => Ok(Self::Web3),
            "txpool" => Ok(Self::TxPool),
            "parity" => Ok(Self::Parity),
            "engine" => Ok(Self::Engine),
            _ => Err(()),
        }
    }
}

/// Parse the comma-separated `--api` value (spec.md §6 CLI surface).
/// Unknown tokens are logged and skipped rather than rejected, per spec.md
/// §4.11 "Unknown namespaces log a warning and are skipped."
pub fn parse_namespaces(spec: &str) -> Vec<Namespace> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|token| match Namespace::from_str(token) {
            Ok(namespace) => Some(namespace),
            Err(()) => {
                tracing::warn!(namespace = token, "unknown API namespace, skipping");
                None
            }
        })
        .collect()
}

/// One entry in the static method table: a namespace tag (used only to
/// decide whether this entry participates, per the requested `--api` list)
/// paired with a function pointer that performs the actual
/// `RpcModule::register_*` call (spec.md §4.11: "a static map from method
/// name to handler function pointer").
struct MethodEntry {
    namespace: Namespace,
    name: &'static str,
    register: fn(&mut RpcModule<AppContext>) -> Result<(), RegisterMethodError>,
}

/// The complete static table, one entry per method this gateway exposes.
/// Namespaces not requested on the CLI simply have none of their entries
/// registered (spec.md §4.11).
const METHOD_TABLE: &[MethodEntry] = &[
    MethodEntry { namespace: Namespace::Eth, name: "eth_blockNumber", register: eth::register_block_number },
    MethodEntry { namespace: Namespace::Eth, name: "eth_chainId", register: eth::register_chain_id },
    MethodEntry { namespace: Namespace::Eth, name: "eth_getBlockByNumber", register: eth::register_get_block_by_number },
    MethodEntry { namespace: Namespace::Eth, name: "eth_getBalance", register: eth::register_get_balance },
    MethodEntry { namespace: Namespace::Eth, name: "eth_getTransactionByHash", register: eth::register_get_transaction_by_hash },
    MethodEntry { namespace: Namespace::Eth, name: "eth_getLogs", register: eth::register_get_logs },
    MethodEntry { namespace: Namespace::Debug, name: "debug_accountRange", register: debug::register_account_range },
    MethodEntry { namespace: Namespace::Debug, name: "debug_traceTransaction", register: debug::register_trace_transaction },
    MethodEntry { namespace: Namespace::Trace, name: "trace_block", register: trace::register_block },
    MethodEntry { namespace: Namespace::Trace, name: "trace_transaction", register: trace::register_transaction },
    MethodEntry { namespace: Namespace::Erigon, name: "erigon_getHeaderByNumber", register: erigon::register_get_header_by_number },
    MethodEntry { namespace: Namespace::Erigon, name: "erigon_getBlockByTimestamp", register: erigon::register_get_block_by_timestamp },
    MethodEntry { namespace: Namespace::Net, name: "net_version", register: net::register_version },
    MethodEntry { namespace: Namespace::Net, name: "net_peerCount", register: net::register_peer_count },
    MethodEntry { namespace: Namespace::Net, name: "net_listening", register: net::register_listening },
    MethodEntry { namespace: Namespace::Web3, name: "web3_clientVersion", register: web3::register_client_version },
    MethodEntry { namespace: Namespace::Web3, name: "web3_sha3", register: web3::register_sha3 },
    MethodEntry { namespace: Namespace::TxPool, name: "txpool_status", register: txpool::register_status },
    MethodEntry { namespace: Namespace::TxPool, name: "txpool_content", register: txpool::register_content },
    MethodEntry { namespace: Namespace::Parity, name: "parity_pendingTransactions", register: parity::register_pending_transactions },
    MethodEntry { namespace: Namespace::Engine, name: "engine_forkchoiceUpdatedV1", register: engine::register_forkchoice_updated_v1 },
    MethodEntry { namespace: Namespace::Engine, name: "engine_newPayloadV1", register: engine::register_new_payload_v1 },
    MethodEntry { namespace: Namespace::Engine, name: "engine_getPayloadV1", register: engine::register_get_payload_v1 },
    MethodEntry { namespace: Namespace::Engine, name: "engine_transitionConfigurationV1", register: engine::register_transition_configuration_v1 },
];

/// Build an `RpcModule` containing every method whose namespace is in
/// `namespaces` (spec.md §4.11). Used once for the general HTTP listener
/// (namespaces from `--api`, minus `engine`) and once for the engine
/// listener (always just `[Namespace::Engine]`, regardless of `--api`).
pub fn build_module(namespaces: &[Namespace], ctx: AppContext) -> Result<RpcModule<AppContext>, RegisterMethodError> {
    let mut module = RpcModule::new(ctx);
    for entry in METHOD_TABLE {
        if namespaces.contains(&entry.namespace) {
            (entry.register)(&mut module)?;
            tracing::debug!(method = entry.name, "registered method");
        }
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_namespace_is_skipped_not_rejected() {
        let namespaces = parse_namespaces("eth,bogus,net");
        assert_eq!(namespaces, vec![Namespace::Eth, Namespace::Net]);
    }

    #[test]
    fn whitespace_and_empty_tokens_are_ignored() {
        let namespaces = parse_namespaces(" eth , , web3 ");
        assert_eq!(namespaces, vec![Namespace::Eth, Namespace::Web3]);
    }
}
