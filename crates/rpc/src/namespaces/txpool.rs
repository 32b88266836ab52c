//! `txpool_` namespace (spec.md §1), stubbed per spec.md §9: the tx-pool
//! client (C11) exists, but assembling its reply shapes is per-method
//! business logic out of scope (spec.md §1).

use super::register_stub;
use crate::context::AppContext;
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;

pub(crate) fn register_status(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "txpool_status")
}

pub(crate) fn register_content(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "txpool_content")
}
