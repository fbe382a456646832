//! Port traits: the boundary between the channel core and the board.
//!
//! ```text
//!   Board adapters ──▶ Port trait ──▶ PowerOut (domain)
//! ```
//!
//! Native output pins are plain [`embedded_hal::digital::OutputPin`]s and
//! need no port of their own.  Everything else the core consumes or emits
//! crosses one of the traits below.  The [`PowerOut`](super::service::PowerOut)
//! service is generic over the sensor and clock, and holds at most one
//! listener of each kind.

use crate::channel::SenseChannel;

use super::events::{DelegatedWrite, ShortCircuit};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Calibrated current measurement for a channel's sense input.
pub trait CurrentSensor {
    /// Return the current on `sense`, already scaled to the unit the
    /// channel limits are expressed in.  May block for one conversion.
    fn read(&mut self, sense: SenseChannel) -> u16;

    /// Re-run the converter's calibration sequence.
    fn recalibrate(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Free-running millisecond counter.  Wraps at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<F: Fn() -> u32> Clock for F {
    fn now_ms(&self) -> u32 {
        self()
    }
}

// ───────────────────────────────────────────────────────────────
// Listener ports (driven adapters: domain → host)
// ───────────────────────────────────────────────────────────────

/// Receives overcurrent faults detected by the supervisor.
///
/// Called synchronously, exactly once per fault transition.
pub trait ShortCircuitListener {
    fn on_short_circuit(&mut self, event: &ShortCircuit);
}

impl<F: FnMut(&ShortCircuit)> ShortCircuitListener for F {
    fn on_short_circuit(&mut self, event: &ShortCircuit) {
        self(event);
    }
}

/// Drives outputs that are not native pins.
///
/// Called in place of a pin write for every level change commanded on a
/// delegated channel.
pub trait DelegatedOutputListener {
    fn on_delegated_write(&mut self, event: &DelegatedWrite);
}

impl<F: FnMut(&DelegatedWrite)> DelegatedOutputListener for F {
    fn on_delegated_write(&mut self, event: &DelegatedWrite) {
        self(event);
    }
}
