//! Outbound events.
//!
//! The [`PowerOut`](super::service::PowerOut) service hands these to the
//! listeners registered through
//! [`ports`](super::ports).  Adapters on the other side decide what to do
//! with them: log to serial, drive an I/O expander, report upstream, etc.

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelId, Level, Mode};
use crate::guard::CurrentClass;

/// A channel was forced off by the overcurrent guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortCircuit {
    pub channel: ChannelId,
    /// The sample that exceeded the limit.
    pub current: u16,
}

/// A level change on a delegated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedWrite {
    pub external_id: u8,
    pub level: Level,
}

/// Point-in-time view of one channel, suitable for logging or telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub channel: ChannelId,
    pub mode: Mode,
    pub level: Level,
    pub current: u16,
    pub current_limit: u16,
    pub class: Option<CurrentClass>,
    pub delegated: bool,
}
