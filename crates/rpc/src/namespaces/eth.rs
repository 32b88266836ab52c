//! `eth_` namespace (spec.md §1). Only `eth_blockNumber` and `eth_getLogs`
//! are pinned down by a literal scenario (spec.md §8 items 1, 5); the rest
//! of this namespace's business logic is out of scope (spec.md §1) and
//! stubbed per spec.md §7/§9.

use super::{parse_params, register_stub};
use crate::context::AppContext;
use crate::error::to_error_object;
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;
use jsonrpsee::types::ErrorObjectOwned;
use rpcdaemon_provider::BlockId;
use serde::Deserialize;
use std::sync::Arc;

/// `eth_blockNumber` (spec.md §8 item 1: sync stage `Execution` value
/// `0x0000ddff12121212` -> `{"result":"0xddff12121212"}`). Resolves
/// `latest` to the `Execution` sync-stage progress (spec.md §3).
pub(crate) fn register_block_number(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    module.register_async_method("eth_blockNumber", move |_params, ctx: Arc<AppContext>, _ext| async move {
        let inner = ctx.clone();
        let result = ctx
            .dispatch(async move {
                let (guard, tip) = inner.open(BlockId::Latest).await?;
                guard.close().await;
                Ok::<_, rpcdaemon_errors::JsonRpcError>(format!("0x{tip:x}"))
            })
            .await;
        result.map_err(to_error_object)
    })?;
    Ok(())
}

pub(crate) fn register_chain_id(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "eth_chainId")
}

pub(crate) fn register_get_block_by_number(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "eth_getBlockByNumber")
}

pub(crate) fn register_get_balance(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "eth_getBalance")
}

pub(crate) fn register_get_transaction_by_hash(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "eth_getTransactionByHash")
}

/// A single `eth_getLogs` filter object, just the fields this gateway's
/// core needs to satisfy spec.md §8 item 5: a one-block range and an
/// address allow-list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogFilter {
    from_block: String,
    to_block: String,
    #[serde(default)]
    address: Vec<alloy_primitives::Address>,
}

/// `eth_getLogs` (spec.md §8 item 5: `fromBlock==toBlock==N` with an
/// address mask excluding every log in block N -> `{"result":[]}`).
/// Only the single-block, address-filtered case is implemented; log
/// filtering in general is per-method business logic out of scope (spec.md
/// §1) and this handler relies entirely on C9/C10 to read the block's raw
/// logs.
pub(crate) fn register_get_logs(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    module.register_async_method("eth_getLogs", move |params, ctx: Arc<AppContext>, _ext| async move {
        let inner = ctx.clone();
        let result = ctx
            .dispatch(async move {
                let (filter,): (LogFilter,) = parse_params(&params)?;
                let from = BlockId::parse(&filter.from_block)?;
                let to = BlockId::parse(&filter.to_block)?;

                let (guard, tip) = inner.open(BlockId::Latest).await?;
                let from_number = AppContext::resolve_number(from, tip);
                let to_number = AppContext::resolve_number(to, tip);
                if from_number != to_number {
                    guard.close().await;
                    return Err(rpcdaemon_errors::JsonRpcError::not_yet_implemented());
                }

                let chain = guard.chain(inner.block_cache());
                let hash = chain.canonical_hash(from_number).await?;
                let header = chain.header_by_hash(from_number, hash).await?;
                let body = chain.body_by_number(from_number, hash).await?;

                let mut matched = Vec::new();
                for tx_index in 0..body.tx_count as u32 {
                    let logs = chain.logs_for_tx(from_number, tx_index).await?;
                    for log in logs {
                        if filter.address.is_empty() || filter.address.contains(&log.address) {
                            matched.push(serde_json::json!({
                                "address": log.address,
                                "topics": log.topics,
                                "data": log.data,
                                "blockNumber": format!("0x{from_number:x}"),
                                "blockHash": header.hash_slow(),
                            }));
                        }
                    }
                }
                guard.close().await;
                Ok::<_, rpcdaemon_errors::JsonRpcError>(matched)
            })
            .await;
        result.map_err(to_error_object)
    })?;
    Ok(())
}
