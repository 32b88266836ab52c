//! Remote transaction / cursor layer (spec.md §4.3, C4), split cursor
//! (§4.4, C5), and KV table schema (§6).

mod split_cursor;
mod tables;
mod transaction;

pub use split_cursor::{prefix_matches, split_key, SplitCursor, SplitKeyValue};
pub use tables::table;
pub use tables::{
    decode_block_key, decode_u64, encode_u64, make_change_set_key, make_contract_code_key, make_history_key,
    make_key, make_key_address, make_log_key, make_storage_change_set_key, make_storage_history_key,
    make_storage_key,
};
pub use transaction::{KeyValue, RemoteCursor, RemoteTransaction};
