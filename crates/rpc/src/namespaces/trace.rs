//! `trace_` namespace (spec.md §1): EVM tracing, out of scope per spec.md
//! §1 ("EVM interpreter and chain-rule logic"); stubbed per spec.md §9.

use super::register_stub;
use crate::context::AppContext;
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;

pub(crate) fn register_block(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "trace_block")
}

pub(crate) fn register_transaction(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "trace_transaction")
}
