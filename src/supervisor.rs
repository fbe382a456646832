//! Tick gating and periodic recalibration for the supervisor loop.
//!
//! The host calls [`PowerOut::process`](crate::app::service::PowerOut::process)
//! as often as it likes; [`TickGate`] lets through at most one call per
//! tick period.  [`RecalibrationTimer`] counts admitted ticks and tells the
//! supervisor when to ask the current sensor to recalibrate.
//!
//! ```text
//!  host loop ──▶ TickGate ──(admitted)──▶ RecalibrationTimer ──▶ sensor.recalibrate()
//!                   │                            │
//!                   └──(too soon: no-op)          └──▶ per-channel guard + timers
//! ```
//!
//! All time arithmetic is done on a free-running `u32` millisecond counter
//! with wrapping subtraction, so rollover after ~49.7 days is harmless.

use log::info;

/// Milliseconds elapsed from `since` to `now` on a wrapping counter.
#[inline]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

// ═══════════════════════════════════════════════════════════════
//  Tick gate
// ═══════════════════════════════════════════════════════════════

/// Rate limiter admitting one supervisor pass per `period_ms`.
#[derive(Debug, Clone)]
pub struct TickGate {
    period_ms: u32,
    /// Timestamp of the last admitted tick.  Starts at 0, so calls made
    /// before the first full period has elapsed are ignored.
    last_tick_ms: u32,
}

impl TickGate {
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_tick_ms: 0,
        }
    }

    /// Returns `true` (and records `now_ms`) when a tick is due.
    pub fn admit(&mut self, now_ms: u32) -> bool {
        if elapsed_ms(now_ms, self.last_tick_ms) < self.period_ms {
            return false;
        }
        self.last_tick_ms = now_ms;
        true
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn last_tick_ms(&self) -> u32 {
        self.last_tick_ms
    }
}

// ═══════════════════════════════════════════════════════════════
//  Recalibration countdown
// ═══════════════════════════════════════════════════════════════

/// Countdown in supervisor ticks between sensor recalibrations.
///
/// Fires on the first admitted tick, then every `period_ticks` ticks.
#[derive(Debug, Clone)]
pub struct RecalibrationTimer {
    period_ticks: u32,
    countdown: u32,
}

impl RecalibrationTimer {
    /// Build a countdown for `interval_ms` of tick time at `tick_ms` per tick.
    pub fn new(interval_ms: u32, tick_ms: u32) -> Self {
        let period_ticks = (interval_ms / tick_ms.max(1)).max(1);
        info!(
            "Recalibration every {} ticks ({} ms at {} ms/tick)",
            period_ticks, interval_ms, tick_ms
        );
        Self {
            period_ticks,
            countdown: 1,
        }
    }

    /// Count one admitted tick.  Returns `true` when recalibration is due.
    pub fn tick(&mut self) -> bool {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.period_ticks;
            return true;
        }
        false
    }

    pub fn period_ticks(&self) -> u32 {
        self.period_ticks
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
