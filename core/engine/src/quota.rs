//! Quota enforcement for breakpoint processing.
//!
//! Rate limits are expressed as the maximum amount of evaluation time, in
//! microseconds, consumable per rolling one-second window. They are
//! enforced on two levels:
//!
//! 1. A breakpoint that alone contributes half the global rate is
//!    pathological and gets deactivated regardless of the others.
//! 2. If all breakpoints combined cross the global rate, whichever
//!    breakpoint crosses the threshold gets deactivated, bounding the
//!    aggregate overhead independent of breakpoint count.
//!
//! The limits ignore the number of CPUs: the host runtime executes
//! interpreted code under a single-active-thread discipline.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default global condition-evaluation budget: 10ms of evaluation time
/// per second of program execution.
pub const DEFAULT_CONDITION_COST_MICROS: u64 = 10_000;

/// Default budget for the emulated tracer's own per-line bookkeeping.
pub const DEFAULT_EMULATOR_COST_MICROS: u64 = 50_000;

/// Rate constants the engine is built with.
///
/// Captured by the builder but applied lazily, on first breakpoint
/// registration, so values configured at runtime are honored.
#[derive(Debug, Clone, Copy)]
pub struct QuotaConfig {
    /// Global condition-evaluation budget in microseconds per rolling
    /// second, shared across all breakpoints and diagnostic logging. Each
    /// breakpoint's own bucket gets half of this.
    pub condition_cost_micros: u64,
    /// Budget for the emulated tracer's per-line overhead, in
    /// microseconds per rolling second.
    pub emulator_cost_micros: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            condition_cost_micros: DEFAULT_CONDITION_COST_MICROS,
            emulator_cost_micros: DEFAULT_EMULATOR_COST_MICROS,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    /// Current fill level in microseconds. Never negative.
    level: f64,
    /// Last time the level was decayed.
    refreshed: Instant,
}

/// Leaky bucket bounding cumulative cost per rolling one-second window.
///
/// The bucket refills continuously rather than resetting in discrete
/// steps, so a consumer that temporarily exceeds the rate recovers once
/// its average cost drops. Charges are serialized through a lock so
/// concurrent deductions cannot lose updates.
#[derive(Debug)]
pub struct LeakyBucket {
    /// Capacity and drain rate, in microseconds per second.
    capacity: f64,
    state: Mutex<BucketState>,
}

impl LeakyBucket {
    /// Creates a bucket holding `capacity_micros` cost units per rolling
    /// one-second window.
    #[must_use]
    pub fn new(capacity_micros: u64) -> Self {
        Self {
            capacity: capacity_micros as f64,
            state: Mutex::new(BucketState {
                level: 0.0,
                refreshed: Instant::now(),
            }),
        }
    }

    /// Charges `cost` against the bucket. Returns `true` while the bucket
    /// stays within capacity, `false` once this charge overflows it.
    ///
    /// The charge is recorded either way; enforcement observes cost after
    /// the fact, it does not preempt.
    pub fn charge(&self, cost: Duration) -> bool {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();

        let drained = now.duration_since(state.refreshed).as_secs_f64() * self.capacity;
        state.level = (state.level - drained).max(0.0);
        state.refreshed = now;

        state.level += cost.as_secs_f64() * 1_000_000.0;
        state.level <= self.capacity
    }

    /// Current fill level in microseconds, after applying decay.
    #[must_use]
    pub fn level_micros(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();

        let drained = now.duration_since(state.refreshed).as_secs_f64() * self.capacity;
        state.level = (state.level - drained).max(0.0);
        state.refreshed = now;
        state.level
    }
}
