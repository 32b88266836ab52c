//! State-changes stream (spec.md §4.5, C6) and coherent state cache (§4.6,
//! C7).

mod cache;
mod stream;

pub use cache::{CacheView, CoherentCacheConfig, CoherentStateCache};
pub use stream::StateChangesIngester;
