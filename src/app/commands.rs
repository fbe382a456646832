//! Inbound commands to the power output service.
//!
//! These represent actions requested by the outside world (CAN, serial,
//! a host controller) that [`PowerOut::handle_command`](super::service::PowerOut::handle_command)
//! maps onto the channel operations.  Channel numbers are raw and 1-based;
//! the service validates them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Commands that external adapters can send into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCommand {
    /// Switch on and hold.
    On { channel: u8 },

    /// Switch on, then off again after `duration_ms`.
    OnFor { channel: u8, duration_ms: u32 },

    /// Switch on and blink.
    Blink { channel: u8, on_ms: u32, off_ms: u32 },

    /// Switch off now.
    Off { channel: u8 },

    /// Switch off after `delay_ms`, leaving the output as it is until then.
    OffAfter { channel: u8, delay_ms: u32 },

    Toggle { channel: u8 },

    /// `level == 0` switches off, anything else switches on.
    Write { channel: u8, level: u8 },
}

impl ChannelCommand {
    /// The raw channel number the command addresses.
    pub fn channel(&self) -> u8 {
        match *self {
            Self::On { channel }
            | Self::OnFor { channel, .. }
            | Self::Blink { channel, .. }
            | Self::Off { channel }
            | Self::OffAfter { channel, .. }
            | Self::Toggle { channel }
            | Self::Write { channel, .. } => channel,
        }
    }

    /// Decode a postcard-encoded command frame.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        postcard::from_bytes(frame).map_err(|_| Error::Decode)
    }

    /// Encode into a postcard frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Decode)
    }
}
