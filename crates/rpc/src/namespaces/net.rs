//! `net_` namespace (spec.md §1): thin unary passthroughs, per-method
//! business logic out of scope (spec.md §1); stubbed per spec.md §9 like
//! every method not pinned down by a literal scenario.

use super::register_stub;
use crate::context::AppContext;
use jsonrpsee::core::RegisterMethodError;
use jsonrpsee::server::RpcModule;

pub(crate) fn register_version(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "net_version")
}

pub(crate) fn register_peer_count(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "net_peerCount")
}

pub(crate) fn register_listening(module: &mut RpcModule<AppContext>) -> Result<(), RegisterMethodError> {
    register_stub(module, "net_listening")
}
