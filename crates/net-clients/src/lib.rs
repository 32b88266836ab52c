//! Generated wire stubs for the remote node's gRPC surface (spec.md §6) and
//! the bigint wire-format conversions the rest of the gateway needs to turn
//! them into `alloy_primitives` types (C11).
//!
//! The teacher repo has no gRPC client of its own (no example repo in the
//! pack wires one either); `tonic`/`prost` are the idiomatic choice for
//! this exact wire protocol, so this crate plays the role a
//! `reth-rpc-types-compat`-style crate would: pure wire-to-native
//! conversions plus thin client wrappers, no business logic.

#![allow(clippy::all)]

/// Common fixed-width containers (`H128`/`H160`/`H256`/`H2048`) and the
/// engine-API payload type shared by `remote` and `txpool` (spec.md §6).
pub mod types {
    include!(concat!(env!("OUT_DIR"), "/types.rs"));
}

/// `remote.KV` and `remote.ETHBACKEND` generated stubs (spec.md §4.3,
/// §4.10).
pub mod remote {
    include!(concat!(env!("OUT_DIR"), "/remote.rs"));
}

/// `txpool.Txpool` and `txpool.Mining` generated stubs (spec.md §4.10).
pub mod txpool {
    include!(concat!(env!("OUT_DIR"), "/txpool.rs"));
}

mod bigint;
mod clients;
mod engine_status;

pub use bigint::{
    address_from_h160, address_to_h160, b256_from_h256, b256_to_h256, bloom_from_h2048, bloom_to_h2048,
    u256_from_h256, u256_to_h256,
};
pub use clients::{BackendClient, KvRawClient, MiningClient, TxPoolClient};
pub use engine_status::EngineStatus;
