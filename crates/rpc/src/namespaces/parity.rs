//! `parity_` namespace (spec.md §1), stubbed per spec.md §9.

use super::register_stub;
use crate::context::AppContext;
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;

pub(crate) fn register_pending_transactions(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "parity_pendingTransactions")
}
