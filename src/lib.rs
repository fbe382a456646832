//! PowerOut: current-limited power output channels.
//!
//! Drives a fixed set of switched outputs (native pins or delegated
//! actuators), each optionally protected by a current limit.  The host
//! registers channels once, issues on/off/blink commands, and calls
//! [`PowerOut::process`] from its main loop; the core samples current,
//! forces faulted channels off, and advances blink and delay-off timers.
//!
//! Pin configuration, ADC programming, and board wiring tables live in the
//! host.  The core sees them only through `embedded_hal` output pins and
//! the traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod channel;
pub mod config;
pub mod guard;
pub mod registry;
pub mod supervisor;

mod error;

pub use app::service::PowerOut;
pub use channel::{ChannelId, ChannelSpec, Level, Mode, NoPin, OutputWiring, SenseChannel};
pub use config::PowerOutConfig;
pub use error::{Error, Result};
