//! Configuration parameters
//!
//! Applied once before operation begins.  Per-channel wiring and limits
//! are given at registration time through
//! [`ChannelSpec`](crate::channel::ChannelSpec); everything here is
//! board-wide.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Full-scale count of the 12-bit current-sense ADC.
pub const ADC_FULL_SCALE: u32 = 4095;

/// Analog front-end constants used to turn ADC counts into milliamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentScaling {
    /// ADC reference voltage in microvolts.
    pub vref_uv: u32,
    /// Current-sense amplifier gain.
    pub gain: u8,
    /// Shunt resistance in milliohms.
    pub shunt_mohm: u8,
}

impl CurrentScaling {
    /// Convert a raw ADC count to milliamps.
    ///
    /// Integer-only; the per-count step is truncated before scaling.
    /// Counts above the 12-bit range are scaled as-is and saturate.
    pub fn to_milliamps(&self, raw: u16) -> u16 {
        let uv = u64::from(self.vref_uv / ADC_FULL_SCALE) * u64::from(raw);
        let ma = (uv / u64::from(self.gain.max(1))) / u64::from(self.shunt_mohm.max(1));
        ma.min(u64::from(u16::MAX)) as u16
    }
}

impl Default for CurrentScaling {
    fn default() -> Self {
        Self {
            vref_uv: 3_300_000, // 3.3 V
            gain: 50,
            shunt_mohm: 5,
        }
    }
}

/// Board-wide power output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerOutConfig {
    /// Minimum interval between supervisor passes (milliseconds)
    pub tick_ms: u32,
    /// Busy-wait iterations between switching a limited channel on and
    /// taking its stabilisation sample
    pub settle_spins: u32,
    /// Samples below this are classified as "no load"
    pub noise_floor: u16,
    /// Sensor recalibration interval in tick time; `None` disables it
    pub recalibration_interval_ms: Option<u32>,
    pub scaling: CurrentScaling,
}

impl Default for PowerOutConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10, // 100 Hz
            settle_spins: 1000,
            noise_floor: 50,
            recalibration_interval_ms: Some(60_000), // 1/min
            scaling: CurrentScaling::default(),
        }
    }
}

impl PowerOutConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), Error> {
        if self.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be non-zero"));
        }
        if let Some(interval) = self.recalibration_interval_ms {
            if interval < self.tick_ms {
                return Err(Error::Config("recalibration interval shorter than one tick"));
            }
        }
        if self.scaling.gain == 0 {
            return Err(Error::Config("amplifier gain must be non-zero"));
        }
        if self.scaling.shunt_mohm == 0 {
            return Err(Error::Config("shunt resistance must be non-zero"));
        }
        if self.scaling.vref_uv < ADC_FULL_SCALE {
            return Err(Error::Config("reference voltage below one microvolt per count"));
        }
        Ok(())
    }

    /// Parse and validate a JSON board configuration.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        // serde_json is built without `std`, so its error only offers Display.
        let config: Self = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("parsing power output config: {e}"))?;
        config.validate().context("validating power output config")?;
        Ok(config)
    }
}
