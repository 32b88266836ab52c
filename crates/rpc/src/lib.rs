//! Request dispatch surface (spec.md §4.11, C12): shared handler context,
//! the error conversion at the jsonrpsee boundary, the static method table,
//! and one module per JSON-RPC namespace.
//!
//! Per-method business logic is out of scope except for the handful of
//! literal scenarios spec.md §8 pins down (spec.md §1, §9); every other
//! method is registered as a stub returning "not yet implemented" so the
//! namespace surface still matches spec.md §1 in full.

pub mod context;
pub mod error;
pub mod method_table;
mod namespaces;

pub use context::{genesis_hash, AppContext, TxGuard};
pub use error::to_error_object;
pub use method_table::{build_module, parse_namespaces, Namespace};
