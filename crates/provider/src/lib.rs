//! Cached database facade (spec.md §4.7, C8), state reader (§4.8, C9), and
//! block/receipt/chain accessors (§4.9, C10).
//!
//! `DatabaseReader` (in [`reader`]) is the common surface every consumer
//! programs against; [`cached_db::CachedDatabase`] and a raw
//! [`rpcdaemon_remote_db::RemoteTransaction`] both implement it.

mod account;
mod block_id;
mod cached_db;
mod chain;
mod reader;
mod state_reader;

pub use account::Account;
pub use block_id::BlockId;
pub use cached_db::CachedDatabase;
pub use chain::{BlockCache, ChainAccessors, StoredBlockBody};
pub use reader::{DatabaseReader, KeyValue, WalkFn};
pub use state_reader::{derive_receipts, DerivedLog, DerivedReceipt, RawLog, RawReceipt, StateReader, TxSummary};
