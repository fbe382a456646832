//! Overcurrent guard.
//!
//! The guard classifies a calibrated current sample against a channel's
//! limit.  It is evaluated once per limited, non-off channel on every
//! supervisor tick, and once more by `set_on` after the settle wait.
//!
//! | Sample                     | Class         | Action                    |
//! |----------------------------|---------------|---------------------------|
//! | `< noise_floor`            | `NoLoad`      | none (informational)      |
//! | `> current_limit`          | `Overcurrent` | force off, notify         |
//! | otherwise                  | `Normal`      | none                      |
//!
//! The noise floor is checked first, so a limit below the floor can never
//! trip.  The guard never retries: once a channel is forced off it stays
//! off until the host switches it on again.

use serde::{Deserialize, Serialize};

/// Classification of one current sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrentClass {
    /// Below the noise floor; nothing appears to be connected.
    NoLoad,
    Normal,
    /// Above the channel limit.
    Overcurrent,
}

impl CurrentClass {
    pub fn is_fault(self) -> bool {
        matches!(self, Self::Overcurrent)
    }
}

/// Stateless threshold evaluator.
#[derive(Debug, Clone, Copy)]
pub struct OvercurrentGuard {
    noise_floor: u16,
}

impl OvercurrentGuard {
    pub const fn new(noise_floor: u16) -> Self {
        Self { noise_floor }
    }

    pub fn noise_floor(&self) -> u16 {
        self.noise_floor
    }

    pub fn classify(&self, current: u16, limit: u16) -> CurrentClass {
        if current < self.noise_floor {
            CurrentClass::NoLoad
        } else if current > limit {
            CurrentClass::Overcurrent
        } else {
            CurrentClass::Normal
        }
    }
}
