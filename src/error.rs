//! Unified error type for the power output core.
//!
//! Every rejected command or registration funnels into [`Error`].  All
//! variants are `Copy` so they can be returned from the supervisor path
//! without allocation.  An overcurrent is reported here only when it is
//! detected synchronously by `set_on`; faults found by the periodic
//! supervisor go to the short-circuit listener instead.

use core::fmt;

use crate::channel::ChannelId;

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Channel number is 0 or exceeds the number of registered channels.
    InvalidChannel(u8),
    /// The registry is full; the channel was not added.
    CapacityExceeded { capacity: usize },
    /// A current limit was configured without a sense channel to measure it.
    MissingSense,
    /// The stabilisation sample at switch-on exceeded the channel limit.
    Overcurrent { channel: ChannelId, current: u16 },
    /// Configuration is invalid.
    Config(&'static str),
    /// A command frame could not be decoded.
    Decode,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(n) => write!(f, "invalid channel {n}"),
            Self::CapacityExceeded { capacity } => {
                write!(f, "channel capacity exceeded ({capacity} max)")
            }
            Self::MissingSense => write!(f, "current limit set without a sense channel"),
            Self::Overcurrent { channel, current } => {
                write!(f, "overcurrent on channel {channel}: {current}")
            }
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Decode => write!(f, "command decode failed"),
        }
    }
}

impl std::error::Error for Error {}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
