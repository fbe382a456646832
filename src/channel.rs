//! Channel records and the per-channel mode state machine.
//!
//! | From         | Call / event            | To         |
//! |--------------|-------------------------|------------|
//! | any          | `set_on`                | `On`       |
//! | any          | `set_blink`             | `Blink`    |
//! | any          | `set_off_after`         | `DelayOff` |
//! | any          | `set_off`, overcurrent  | `Off`      |
//! | `Blink`      | half-period elapsed     | `Blink` (output toggled) |
//! | `DelayOff`   | delay elapsed           | `Off`      |
//!
//! A channel record owns its output wiring and timing fields.  It never
//! samples current itself: the service decides when to settle and sample,
//! and the channel only answers "what should the output do now?" through
//! [`Channel::poll_timers`].

use core::convert::Infallible;
use core::fmt;
use core::num::NonZeroU8;

use embedded_hal::digital::{Error as _, ErrorType, OutputPin};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::events::DelegatedWrite;
use crate::app::ports::DelegatedOutputListener;
use crate::guard::CurrentClass;
use crate::supervisor::elapsed_ms;

// ───────────────────────────────────────────────────────────────
// Identity
// ───────────────────────────────────────────────────────────────

/// Stable 1-based channel handle handed out by the registry.
///
/// A `ChannelId` is only proof that the number is non-zero; whether it
/// refers to a registered channel is checked by the registry on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(NonZeroU8);

impl ChannelId {
    /// Wrap a caller-facing channel number.  `0` is never a valid channel.
    pub const fn new(index: u8) -> Option<Self> {
        match NonZeroU8::new(index) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The 1-based channel number.
    pub const fn get(self) -> u8 {
        self.0.get()
    }

    /// The 0-based registry slot.
    pub(crate) const fn slot(self) -> usize {
        self.0.get() as usize - 1
    }

    pub(crate) fn from_slot(slot: usize) -> Self {
        debug_assert!(slot < u8::MAX as usize, "slot {slot} out of range");
        Self(NonZeroU8::MIN.saturating_add(slot as u8))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = crate::Error;

    fn try_from(index: u8) -> crate::Result<Self> {
        Self::new(index).ok_or(crate::Error::InvalidChannel(index))
    }
}

/// ADC channel used to measure a power output's current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenseChannel(pub u32);

// ───────────────────────────────────────────────────────────────
// Levels and modes
// ───────────────────────────────────────────────────────────────

/// Logical output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

/// Operating mode of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Off = 0,
    On = 1,
    /// Reserved.  No transition ever enters this mode.
    Pwm = 2,
    Blink = 3,
    DelayOff = 4,
}

// ───────────────────────────────────────────────────────────────
// Wiring
// ───────────────────────────────────────────────────────────────

/// How a channel's digital level reaches the hardware.
pub enum OutputWiring<P> {
    /// A native push-pull pin owned by the channel.
    Native(P),
    /// An actuator driven elsewhere; writes are reported to the
    /// [`DelegatedOutputListener`] under this external id.
    Delegated(u8),
}

/// Placeholder pin type for boards whose channels are all delegated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Registration parameters for one channel.
pub struct ChannelSpec<P> {
    pub output: OutputWiring<P>,
    pub sense: Option<SenseChannel>,
    /// `0` disables overcurrent protection.
    pub current_limit: u16,
}

impl<P> ChannelSpec<P> {
    /// Channel driven by a native pin, without current limiting.
    pub fn native(pin: P) -> Self {
        Self {
            output: OutputWiring::Native(pin),
            sense: None,
            current_limit: 0,
        }
    }

    /// Channel driven through the delegated-write listener.
    pub fn delegated(external_id: u8) -> Self {
        Self {
            output: OutputWiring::Delegated(external_id),
            sense: None,
            current_limit: 0,
        }
    }

    /// Protect the channel with `limit`, measured on `sense`.
    #[must_use]
    pub fn with_limit(mut self, sense: SenseChannel, limit: u16) -> Self {
        self.sense = Some(sense);
        self.current_limit = limit;
        self
    }
}

// ───────────────────────────────────────────────────────────────
// Channel record
// ───────────────────────────────────────────────────────────────

/// What the timers want done on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerAction {
    /// Blink half-period elapsed: drive the output to this level.
    Drive(Level),
    /// Delay-off elapsed: switch the channel off.
    Expire,
}

/// One power output and its live state.
pub struct Channel<P> {
    id: ChannelId,
    output: OutputWiring<P>,
    sense: Option<SenseChannel>,
    current_limit: u16,

    mode: Mode,
    output_state: Level,
    last_current: u16,
    last_class: Option<CurrentClass>,

    blink_on_ms: u32,
    blink_off_ms: u32,
    off_delay_ms: u32,
    /// Length of the current blink half-period.
    phase_deadline_ms: u32,
    phase_start_ms: u32,
}

impl<P> Channel<P> {
    pub(crate) fn new(id: ChannelId, spec: ChannelSpec<P>) -> Self {
        Self {
            id,
            output: spec.output,
            sense: spec.sense,
            current_limit: spec.current_limit,
            mode: Mode::Off,
            output_state: Level::Low,
            last_current: 0,
            last_class: None,
            blink_on_ms: 0,
            blink_off_ms: 0,
            off_delay_ms: 0,
            phase_deadline_ms: 0,
            phase_start_ms: 0,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Last commanded output level.
    pub fn output_level(&self) -> Level {
        self.output_state
    }

    /// Most recent sampled current; `0` while off.
    pub fn current(&self) -> u16 {
        self.last_current
    }

    pub fn current_limit(&self) -> u16 {
        self.current_limit
    }

    /// Guard classification of the most recent sample, if any.
    pub fn current_class(&self) -> Option<CurrentClass> {
        self.last_class
    }

    pub fn sense(&self) -> Option<SenseChannel> {
        self.sense
    }

    /// `true` when the channel takes part in overcurrent supervision.
    pub fn is_limited(&self) -> bool {
        self.current_limit > 0 && self.sense.is_some()
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self.output, OutputWiring::Delegated(_))
    }

    // ── Transitions ───────────────────────────────────────────

    pub(crate) fn enter_on(&mut self) {
        self.set_mode(Mode::On);
    }

    /// Seed the blink cycle with the on-phase, since the output is already high.
    pub(crate) fn enter_blink(&mut self, on_ms: u32, off_ms: u32, now_ms: u32) {
        self.blink_on_ms = on_ms;
        self.blink_off_ms = off_ms;
        self.phase_deadline_ms = on_ms;
        self.phase_start_ms = now_ms;
        self.set_mode(Mode::Blink);
    }

    pub(crate) fn enter_delay_off(&mut self, delay_ms: u32, now_ms: u32) {
        self.off_delay_ms = delay_ms;
        self.phase_start_ms = now_ms;
        self.set_mode(Mode::DelayOff);
    }

    /// Caller must already have driven the output low.
    pub(crate) fn enter_off(&mut self) {
        self.last_current = 0;
        self.set_mode(Mode::Off);
    }

    pub(crate) fn record_sample(&mut self, current: u16, class: CurrentClass) {
        self.last_current = current;
        self.last_class = Some(class);
    }

    /// Advance the blink / delay-off timers against `now_ms`.
    ///
    /// Comparisons are strict and wrap-safe: a phase ends on the first tick
    /// where more than its duration has elapsed since the phase began.
    pub(crate) fn poll_timers(&mut self, now_ms: u32) -> Option<TimerAction> {
        let elapsed = elapsed_ms(now_ms, self.phase_start_ms);
        match self.mode {
            Mode::Blink if elapsed > self.phase_deadline_ms => {
                let next = self.output_state.toggled();
                self.phase_start_ms = now_ms;
                self.phase_deadline_ms = match next {
                    Level::High => self.blink_on_ms,
                    Level::Low => self.blink_off_ms,
                };
                Some(TimerAction::Drive(next))
            }
            Mode::DelayOff if elapsed > self.off_delay_ms => Some(TimerAction::Expire),
            _ => None,
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            debug!("channel {}: {:?} -> {:?}", self.id, self.mode, mode);
        }
        self.mode = mode;
    }
}

impl<P: OutputPin> Channel<P> {
    /// Command the output and remember the level.
    ///
    /// Delegated channels report through `delegated`; with no listener
    /// registered the write goes nowhere but the level is still recorded.
    pub(crate) fn drive(
        &mut self,
        level: Level,
        delegated: &mut Option<Box<dyn DelegatedOutputListener>>,
    ) {
        match &mut self.output {
            OutputWiring::Native(pin) => {
                let res = match level {
                    Level::High => pin.set_high(),
                    Level::Low => pin.set_low(),
                };
                if let Err(e) = res {
                    warn!("channel {}: pin write {:?} failed: {:?}", self.id, level, e.kind());
                }
            }
            OutputWiring::Delegated(external_id) => match delegated {
                Some(listener) => listener.on_delegated_write(&DelegatedWrite {
                    external_id: *external_id,
                    level,
                }),
                None => debug!(
                    "channel {}: no delegated listener for external id {}",
                    self.id, external_id
                ),
            },
        }
        self.output_state = level;
    }
}
