//! Idle-loop policy for a single-threaded [`crate::context::Context`] (spec
//! §4.1).
//!
//! A [`WaitStrategy`] is asked, once per tick, how hard the reactor+
//! completion-queue fusion just worked (`executed_count`); it decides
//! whether the thread should spin, yield, or sleep before the next tick.

use std::time::Duration;

/// Idle policy selected per process via `--wait-mode`.
pub trait WaitStrategy: std::fmt::Debug + Send {
    /// Called once per poll tick with the number of completions/tasks the
    /// tick just processed. `0` means the tick found nothing to do.
    fn idle(&mut self, executed_count: u32);
}

/// Counts ticks until a yield, then resets whenever work is found.
///
/// Mirrors `original_source/silkrpc/concurrency/wait_strategy.hpp`'s
/// `YieldingWaitStrategy`: spin for up to `kSpinTries` empty ticks before
/// yielding the thread, resetting the counter the moment any work executes.
#[derive(Debug)]
pub struct YieldingWaitStrategy {
    counter: u32,
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self { counter: Self::SPIN_TRIES }
    }
}

impl YieldingWaitStrategy {
    const SPIN_TRIES: u32 = 100;
}

impl WaitStrategy for YieldingWaitStrategy {
    fn idle(&mut self, executed_count: u32) {
        if executed_count > 0 {
            self.counter = Self::SPIN_TRIES;
            return;
        }
        if self.counter == 0 {
            std::thread::yield_now();
        } else {
            self.counter -= 1;
        }
    }
}

/// Spins for a while, then yields, then starts sleeping for 0ms (a pure
/// scheduler hand-off) once fully idle.
#[derive(Debug)]
pub struct SleepingWaitStrategy {
    counter: u32,
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self { counter: Self::RETRIES }
    }
}

impl SleepingWaitStrategy {
    const RETRIES: u32 = 200;
    const SPIN_THRESHOLD: u32 = 100;
}

impl WaitStrategy for SleepingWaitStrategy {
    fn idle(&mut self, executed_count: u32) {
        if executed_count > 0 {
            self.counter = Self::RETRIES;
            return;
        }
        if self.counter > Self::SPIN_THRESHOLD {
            self.counter -= 1;
        } else if self.counter > 0 {
            self.counter -= 1;
            std::thread::yield_now();
        } else {
            std::thread::sleep(Duration::from_millis(0));
        }
    }
}

/// Progressive back-off: tight spin-loop-hint for the first 10 ticks, then
/// yield, then occasional `0`/`1` ms sleeps at a fixed modular cadence.
#[derive(Debug, Default)]
pub struct SpinWaitWaitStrategy {
    counter: u32,
}

impl SpinWaitWaitStrategy {
    const YIELD_THRESHOLD: u32 = 10;
    const SLEEP0_EVERY: u32 = 5;
    const SLEEP1_EVERY: u32 = 20;
}

impl WaitStrategy for SpinWaitWaitStrategy {
    fn idle(&mut self, executed_count: u32) {
        if executed_count > 0 {
            self.counter = 0;
            return;
        }
        if self.counter < Self::YIELD_THRESHOLD {
            std::hint::spin_loop();
        } else if self.counter % Self::SLEEP1_EVERY == 0 {
            std::thread::sleep(Duration::from_millis(1));
        } else if self.counter % Self::SLEEP0_EVERY == 0 {
            std::thread::sleep(Duration::from_millis(0));
        } else {
            std::thread::yield_now();
        }
        self.counter += 1;
    }
}

/// No-op idle: burns CPU polling as fast as possible. Lowest latency,
/// highest power draw.
#[derive(Debug, Default)]
pub struct BusySpinWaitStrategy;

impl WaitStrategy for BusySpinWaitStrategy {
    fn idle(&mut self, _executed_count: u32) {}
}

/// Used only by the multi-threaded loop (spec §4.2): a dedicated thread
/// blocks on the completion queue and posts completions onto the reactor,
/// so the reactor thread never calls `idle` on this strategy's behalf.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy;

impl WaitStrategy for BlockingWaitStrategy {
    fn idle(&mut self, _executed_count: u32) {
        unreachable!("BlockingWaitStrategy is not polled in single-threaded mode")
    }
}

/// Textual enum selecting one of the above, e.g. via `--wait-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WaitMode {
    /// Default: dedicated thread blocks on the completion queue.
    #[default]
    Blocking,
    /// Yield-based idle, good balance of latency and CPU use.
    Yielding,
    /// Sleep-based idle, lowest CPU use.
    Sleeping,
    /// Progressive back-off.
    SpinWait,
    /// No-op idle, lowest latency, highest CPU use.
    BusySpin,
}

impl WaitMode {
    /// Construct the corresponding [`WaitStrategy`] object.
    pub fn make_wait_strategy(self) -> Box<dyn WaitStrategy> {
        tracing::debug!(wait_mode = ?self, "selecting wait strategy");
        match self {
            Self::Blocking => Box::<BlockingWaitStrategy>::default(),
            Self::Yielding => Box::<YieldingWaitStrategy>::default(),
            Self::Sleeping => Box::<SleepingWaitStrategy>::default(),
            Self::SpinWait => Box::<SpinWaitWaitStrategy>::default(),
            Self::BusySpin => Box::<BusySpinWaitStrategy>::default(),
        }
    }

    /// `true` if this mode drives the multi-threaded loop (spec §4.2).
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Blocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yielding_resets_on_work() {
        let mut strategy = YieldingWaitStrategy::default();
        for _ in 0..YieldingWaitStrategy::SPIN_TRIES {
            strategy.idle(0);
        }
        assert_eq!(strategy.counter, 0);
        strategy.idle(3);
        assert_eq!(strategy.counter, YieldingWaitStrategy::SPIN_TRIES);
    }

    #[test]
    fn busy_spin_never_panics() {
        let mut strategy = BusySpinWaitStrategy;
        strategy.idle(0);
        strategy.idle(100);
    }

    #[test]
    fn default_wait_mode_is_blocking() {
        assert_eq!(WaitMode::default(), WaitMode::Blocking);
        assert!(WaitMode::default().is_blocking());
    }
}
