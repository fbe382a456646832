//! Host time adapter.
//!
//! Provides the free-running millisecond counter the core expects, backed
//! by `std::time::Instant`.  The count is truncated to `u32`, so it wraps
//! after ~49.7 days exactly like a hardware tick counter would.  Board
//! targets supply their own [`Clock`] (often just a closure over the HAL
//! tick).

use std::time::Instant;

use crate::app::ports::Clock;

/// Monotonic clock for host builds and simulation.
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
