//! ADC-backed current sensor adapter.
//!
//! Bridges a raw converter ([`AdcReader`]) to the domain [`CurrentSensor`]
//! port by applying the board's [`CurrentScaling`].  The converter itself
//! (channel selection, conversion polling, calibration registers) stays
//! behind the `AdcReader` trait, implemented per board.
//!
//! A failed conversion is logged and the previous good reading for that
//! sense channel is reported instead (`0` if there is none yet).

use heapless::LinearMap;
use log::warn;

use crate::app::ports::CurrentSensor;
use crate::channel::SenseChannel;
use crate::config::CurrentScaling;

/// Maximum distinct sense channels remembered for fallback readings.
const MAX_SENSE_CHANNELS: usize = 16;

/// Errors from a raw ADC conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcError {
    /// Conversion did not complete within the poll timeout.
    Timeout,
    /// Channel configuration was refused by the converter.
    ChannelConfig,
}

impl core::fmt::Display for AdcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "conversion timeout"),
            Self::ChannelConfig => write!(f, "channel config rejected"),
        }
    }
}

/// One-shot raw converter access.
pub trait AdcReader {
    /// Select `channel`, convert once, and return the 12-bit result.
    fn read_raw(&mut self, channel: u32) -> Result<u16, AdcError>;

    /// Stop, run the converter's self-calibration, and restart.
    fn calibrate(&mut self);
}

/// [`CurrentSensor`] that scales raw ADC counts to milliamps.
pub struct AdcCurrentSensor<A> {
    adc: A,
    scaling: CurrentScaling,
    last_good: LinearMap<u32, u16, MAX_SENSE_CHANNELS>,
}

impl<A: AdcReader> AdcCurrentSensor<A> {
    pub fn new(adc: A, scaling: CurrentScaling) -> Self {
        Self {
            adc,
            scaling,
            last_good: LinearMap::new(),
        }
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }

    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}

impl<A: AdcReader> CurrentSensor for AdcCurrentSensor<A> {
    fn read(&mut self, sense: SenseChannel) -> u16 {
        match self.adc.read_raw(sense.0) {
            Ok(raw) => {
                let ma = self.scaling.to_milliamps(raw);
                if self.last_good.insert(sense.0, ma).is_err() {
                    warn!("ADC: fallback table full, sense {} not cached", sense.0);
                }
                ma
            }
            Err(e) => {
                let fallback = self.last_good.get(&sense.0).copied().unwrap_or(0);
                warn!("ADC: sense {} read failed ({}), using {}", sense.0, e, fallback);
                fallback
            }
        }
    }

    fn recalibrate(&mut self) {
        self.adc.calibrate();
    }
}
