//! `erigon_` namespace (spec.md §1): Erigon-specific convenience methods,
//! per-method business logic out of scope (spec.md §1); stubbed per
//! spec.md §9.

use super::register_stub;
use crate::context::AppContext;
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;

pub(crate) fn register_get_header_by_number(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "erigon_getHeaderByNumber")
}

pub(crate) fn register_get_block_by_timestamp(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "erigon_getBlockByTimestamp")
}
