//! Power output service: the hexagonal core.
//!
//! [`PowerOut`] owns the channel registry, the overcurrent guard, and the
//! supervisor timing.  All I/O flows through the pins owned by each
//! channel and the port traits injected at construction, making the whole
//! service testable with mock adapters.
//!
//! ```text
//!  CurrentSensor ──▶ ┌────────────────────────────┐ ──▶ ShortCircuitListener
//!          Clock ──▶ │          PowerOut          │ ──▶ DelegatedOutputListener
//!                    │ Registry · Guard · Timers  │ ──▶ OutputPin (per channel)
//!                    └────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Single-threaded and poll-driven.  The host calls [`PowerOut::process`]
//! from its main loop (or one periodic interrupt) at least once per tick
//! period, and never concurrently with the command methods.  `&mut self`
//! on every mutating method makes that the borrow checker's problem.

use embedded_hal::digital::OutputPin;
use log::{debug, error, info, warn};

use crate::channel::{Channel, ChannelId, ChannelSpec, Level, Mode, SenseChannel, TimerAction};
use crate::config::PowerOutConfig;
use crate::error::{Error, Result};
use crate::guard::{CurrentClass, OvercurrentGuard};
use crate::registry::ChannelRegistry;
use crate::supervisor::{RecalibrationTimer, TickGate};

use super::commands::ChannelCommand;
use super::events::{ChannelStatus, ShortCircuit};
use super::ports::{Clock, CurrentSensor, DelegatedOutputListener, ShortCircuitListener};

// ───────────────────────────────────────────────────────────────
// Listeners
// ───────────────────────────────────────────────────────────────

/// At most one subscriber per outbound event type.  `None` means nobody
/// is listening and the event is dropped.
#[derive(Default)]
struct Listeners {
    short_circuit: Option<Box<dyn ShortCircuitListener>>,
    delegated: Option<Box<dyn DelegatedOutputListener>>,
}

impl Listeners {
    fn short_circuit(&mut self, event: &ShortCircuit) {
        match &mut self.short_circuit {
            Some(listener) => listener.on_short_circuit(event),
            None => debug!("no short-circuit listener for channel {}", event.channel),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// PowerOut
// ───────────────────────────────────────────────────────────────

/// Up to `N` power output channels under periodic overcurrent supervision.
pub struct PowerOut<P, S, C, const N: usize> {
    registry: ChannelRegistry<P, N>,
    sensor: S,
    clock: C,
    guard: OvercurrentGuard,
    gate: TickGate,
    recalibration: Option<RecalibrationTimer>,
    settle_spins: u32,
    listeners: Listeners,
}

impl<P, S, C, const N: usize> PowerOut<P, S, C, N>
where
    P: OutputPin,
    S: CurrentSensor,
    C: Clock,
{
    /// Construct the service from a validated configuration.
    pub fn new(config: &PowerOutConfig, sensor: S, clock: C) -> Result<Self> {
        config.validate()?;
        let recalibration = config
            .recalibration_interval_ms
            .map(|interval| RecalibrationTimer::new(interval, config.tick_ms));

        info!(
            "PowerOut: {} channel slots, tick {} ms, noise floor {}",
            N, config.tick_ms, config.noise_floor
        );

        Ok(Self {
            registry: ChannelRegistry::new(),
            sensor,
            clock,
            guard: OvercurrentGuard::new(config.noise_floor),
            gate: TickGate::new(config.tick_ms),
            recalibration,
            settle_spins: config.settle_spins,
            listeners: Listeners::default(),
        })
    }

    // ── Configuration ─────────────────────────────────────────

    /// Register a channel.  Returns its 1-based id, or
    /// [`Error::CapacityExceeded`] once all `N` slots are taken.
    pub fn add_channel(&mut self, spec: ChannelSpec<P>) -> Result<ChannelId> {
        self.registry.add(spec)
    }

    pub fn channel_count(&self) -> usize {
        self.registry.len()
    }

    /// Replace the short-circuit listener.
    pub fn set_short_circuit_listener(&mut self, listener: impl ShortCircuitListener + 'static) {
        self.listeners.short_circuit = Some(Box::new(listener));
    }

    /// Replace the delegated-output listener.
    pub fn set_delegated_listener(&mut self, listener: impl DelegatedOutputListener + 'static) {
        self.listeners.delegated = Some(Box::new(listener));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners = Listeners::default();
    }

    // ── Commands ──────────────────────────────────────────────

    /// Switch a channel on.
    ///
    /// Limited channels are given a short busy-wait to settle and are then
    /// sampled once.  A sample above the limit switches the channel straight
    /// back off and returns [`Error::Overcurrent`].
    pub fn set_on(&mut self, id: ChannelId) -> Result<()> {
        let ch = self.registry.get_mut(id)?;
        ch.drive(Level::High, &mut self.listeners.delegated);
        ch.enter_on();

        let Some(sense) = ch.sense().filter(|_| ch.current_limit() > 0) else {
            return Ok(());
        };

        let current = settle_and_sample(self.settle_spins, &mut self.sensor, sense);
        let class = self.guard.classify(current, ch.current_limit());
        ch.record_sample(current, class);

        if class.is_fault() {
            ch.drive(Level::Low, &mut self.listeners.delegated);
            ch.enter_off();
            warn!(
                "channel {}: switch-on rejected, {} > limit {}",
                id,
                current,
                ch.current_limit()
            );
            return Err(Error::Overcurrent {
                channel: id,
                current,
            });
        }
        Ok(())
    }

    /// Switch on, then off again once `duration_ms` has elapsed.
    pub fn set_on_for(&mut self, id: ChannelId, duration_ms: u32) -> Result<()> {
        self.set_on(id)?;
        self.set_off_after(id, duration_ms)
    }

    /// Switch on and blink with independent on/off durations.
    pub fn set_blink(&mut self, id: ChannelId, on_ms: u32, off_ms: u32) -> Result<()> {
        self.set_on(id)?;
        let now = self.clock.now_ms();
        self.registry.get_mut(id)?.enter_blink(on_ms, off_ms, now);
        Ok(())
    }

    /// Switch a channel off now.  Idempotent.
    pub fn set_off(&mut self, id: ChannelId) -> Result<()> {
        let ch = self.registry.get_mut(id)?;
        switch_off(ch, &mut self.listeners);
        Ok(())
    }

    /// Schedule a switch-off `delay_ms` from now.  The output level is not
    /// touched until the delay expires.
    pub fn set_off_after(&mut self, id: ChannelId, delay_ms: u32) -> Result<()> {
        let now = self.clock.now_ms();
        self.registry.get_mut(id)?.enter_delay_off(delay_ms, now);
        Ok(())
    }

    /// `On`/`Blink` switch off; `Off`/`DelayOff` switch on.
    pub fn toggle(&mut self, id: ChannelId) -> Result<()> {
        match self.registry.get(id)?.mode() {
            Mode::On | Mode::Blink => self.set_off(id),
            Mode::Off | Mode::DelayOff => self.set_on(id),
            Mode::Pwm => Ok(()),
        }
    }

    /// `0` switches off, any other value switches on.
    pub fn write(&mut self, id: ChannelId, level: u8) -> Result<()> {
        if level == 0 {
            self.set_off(id)
        } else {
            self.set_on(id)
        }
    }

    /// Dispatch an inbound command frame.
    pub fn handle_command(&mut self, cmd: ChannelCommand) -> Result<()> {
        let id = self.registry.resolve(cmd.channel())?;
        match cmd {
            ChannelCommand::On { .. } => self.set_on(id),
            ChannelCommand::OnFor { duration_ms, .. } => self.set_on_for(id, duration_ms),
            ChannelCommand::Blink { on_ms, off_ms, .. } => self.set_blink(id, on_ms, off_ms),
            ChannelCommand::Off { .. } => self.set_off(id),
            ChannelCommand::OffAfter { delay_ms, .. } => self.set_off_after(id, delay_ms),
            ChannelCommand::Toggle { .. } => self.toggle(id),
            ChannelCommand::Write { level, .. } => self.write(id, level),
        }
    }

    // ── Supervisor ────────────────────────────────────────────

    /// Run one supervision pass if a tick period has elapsed since the last.
    ///
    /// Only limited channels that are not off take part: each is sampled and
    /// guarded first (a faulted channel is done for this pass), then its blink
    /// and delay-off timers advance.  Channels without a limit keep whatever
    /// output they were last commanded to.
    pub fn process(&mut self, now_ms: u32) {
        if !self.gate.admit(now_ms) {
            return;
        }

        if let Some(recal) = &mut self.recalibration {
            if recal.tick() {
                info!("PowerOut: recalibrating current sensor");
                self.sensor.recalibrate();
            }
        }

        for ch in self.registry.iter_mut() {
            // Unlimited channels are not supervised: no sampling, no timers.
            let Some(sense) = ch.sense().filter(|_| ch.is_limited()) else {
                continue;
            };
            if ch.mode() == Mode::Off {
                continue;
            }

            let current = self.sensor.read(sense);
            let class = self.guard.classify(current, ch.current_limit());
            ch.record_sample(current, class);

            if class.is_fault() {
                error!(
                    "channel {}: SHORT CIRCUIT {} > limit {}",
                    ch.id(),
                    current,
                    ch.current_limit()
                );
                switch_off(ch, &mut self.listeners);
                self.listeners.short_circuit(&ShortCircuit {
                    channel: ch.id(),
                    current,
                });
                continue;
            }

            match ch.poll_timers(now_ms) {
                Some(TimerAction::Drive(level)) => ch.drive(level, &mut self.listeners.delegated),
                Some(TimerAction::Expire) => switch_off(ch, &mut self.listeners),
                None => {}
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self, id: ChannelId) -> Result<Mode> {
        Ok(self.registry.get(id)?.mode())
    }

    /// Last sampled current; `0` for channels that are off.
    pub fn current(&self, id: ChannelId) -> Result<u16> {
        Ok(self.registry.get(id)?.current())
    }

    /// Sum of [`current`](Self::current) over every registered channel.
    pub fn total_current(&self) -> u32 {
        self.registry.iter().map(|ch| ch.current() as u32).sum()
    }

    /// Last commanded output level.
    pub fn output_level(&self, id: ChannelId) -> Result<Level> {
        Ok(self.registry.get(id)?.output_level())
    }

    /// Guard classification of the latest sample, `None` before the first.
    pub fn current_class(&self, id: ChannelId) -> Result<Option<CurrentClass>> {
        Ok(self.registry.get(id)?.current_class())
    }

    pub fn status(&self, id: ChannelId) -> Result<ChannelStatus> {
        let ch = self.registry.get(id)?;
        Ok(ChannelStatus {
            channel: ch.id(),
            mode: ch.mode(),
            level: ch.output_level(),
            current: ch.current(),
            current_limit: ch.current_limit(),
            class: ch.current_class(),
            delegated: ch.is_delegated(),
        })
    }

    pub fn channel(&self, id: ChannelId) -> Result<&Channel<P>> {
        self.registry.get(id)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel<P>> {
        self.registry.iter()
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

// ── Internal ──────────────────────────────────────────────────

/// Let the load current settle after switch-on, then take one sample.
///
/// This is a deliberate busy-wait of a fixed number of spins: it buys
/// analog settling time and must not yield.
fn settle_and_sample<S: CurrentSensor>(spins: u32, sensor: &mut S, sense: SenseChannel) -> u16 {
    for _ in 0..spins {
        core::hint::spin_loop();
    }
    sensor.read(sense)
}

fn switch_off<P: OutputPin>(ch: &mut Channel<P>, listeners: &mut Listeners) {
    ch.drive(Level::Low, &mut listeners.delegated);
    ch.enter_off();
}
