//! Error types shared across the rpcdaemon gateway crates.
//!
//! Mirrors the teacher's `reth-errors` role: a small crate that every other
//! crate in the workspace depends on for its error enums, so that error
//! conversions compose with `?` instead of each crate inventing its own
//! boundary type.

mod cli;
mod db;
mod provider;
mod rpc;

pub use cli::CliError;
pub use db::DbError;
pub use provider::ProviderError;
pub use rpc::{JsonRpcError, RpcErrorCode};

/// Convenience alias used throughout the remote-db / state-cache / provider crates.
pub type DbResult<T> = Result<T, DbError>;

/// Convenience alias used throughout the provider crate.
pub type ProviderResult<T> = Result<T, ProviderError>;
