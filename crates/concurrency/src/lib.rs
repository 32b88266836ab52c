//! Concurrency spine of the rpcdaemon gateway (spec §4.1–4.2, components
//! C1–C3): the idle-loop policy, the single execution loop built on top of
//! it, and the fixed bank of loops that request handlers are dispatched
//! onto.

mod context;
mod context_pool;
mod wait_strategy;

pub use context::ContextHandle;
pub use context_pool::{ContextPool, ContextPoolError};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, SpinWaitWaitStrategy,
    WaitMode, WaitStrategy, YieldingWaitStrategy,
};
