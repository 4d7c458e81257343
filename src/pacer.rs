//! Best-effort inter-step sleep, grounded in the original sources' `vm.c`
//! monotonic-clock pacing loop: a configured per-step millisecond budget plus
//! a small fixed offset, compared against wall time actually elapsed since
//! the previous step.

use std::thread;
use std::time::{Duration, Instant};

/// Fixed offset added to the configured step budget, matching the original
/// implementation's `CLOCK_INTERONSET_INTERVAL`.
const TICK_OFFSET: Duration = Duration::from_micros(2);

/// Paces the VM's fetch-decode-execute loop to an approximate instruction rate.
pub struct Pacer {
    step_budget: Duration,
    last_tick: Instant,
}

impl Pacer {
    /// `step_ms` of zero makes every call to [`Pacer::wait`] a no-op.
    pub fn new(step_ms: u64) -> Pacer {
        Pacer {
            step_budget: Duration::from_millis(step_ms) + TICK_OFFSET,
            last_tick: Instant::now(),
        }
    }

    /// Sleeps for the remainder of the step budget not already consumed by
    /// the instruction just executed, then resets the reference instant.
    pub fn wait(&mut self) {
        let elapsed = self.last_tick.elapsed();
        if elapsed < self.step_budget {
            thread::sleep(self.step_budget - elapsed);
        }
        self.last_tick = Instant::now();
    }
}
