//! Integration tests: commands → channel state → pins and listeners.

use powerout::app::commands::ChannelCommand;
use powerout::app::events::{DelegatedWrite, ShortCircuit};
use powerout::guard::CurrentClass;
use powerout::{ChannelId, ChannelSpec, Error, Level, Mode, SenseChannel};

use super::mock_hw::Bench;

const LIMIT: u16 = 1000;

fn id(n: u8) -> ChannelId {
    ChannelId::new(n).unwrap()
}

/// Bench with one limited native channel on pin 1 / sense 1.
fn limited_bench() -> (Bench, ChannelId) {
    let mut b = Bench::new();
    let pin = b.pin(1);
    let ch = b
        .out
        .add_channel(ChannelSpec::native(pin).with_limit(SenseChannel(1), LIMIT))
        .unwrap();
    b.sensor().set(1, 500);
    (b, ch)
}

// ── Registry ──────────────────────────────────────────────────

#[test]
fn invalid_ids_leave_everything_untouched() {
    let (mut b, ch) = limited_bench();
    let ghost = id(2);

    assert_eq!(b.out.set_on(ghost), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.set_on_for(ghost, 10), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.set_blink(ghost, 10, 10), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.set_off(ghost), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.set_off_after(ghost, 10), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.toggle(ghost), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.write(ghost, 1), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.mode(ghost), Err(Error::InvalidChannel(2)));
    assert_eq!(b.out.current(ghost), Err(Error::InvalidChannel(2)));
    assert_eq!(
        b.out.handle_command(ChannelCommand::On { channel: 0 }),
        Err(Error::InvalidChannel(0))
    );

    assert!(b.pins.borrow().is_empty());
    assert_eq!(b.sensor().reads, 0);
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
}

#[test]
fn registration_beyond_capacity_is_rejected() {
    let mut b = Bench::new();
    for n in 1..=3 {
        let pin = b.pin(n);
        b.out.add_channel(ChannelSpec::native(pin)).unwrap();
    }
    let last = b
        .out
        .add_channel(ChannelSpec::delegated(40).with_limit(SenseChannel(4), 300))
        .unwrap();
    assert_eq!(last.get(), 4);

    let pin = b.pin(5);
    assert_eq!(
        b.out.add_channel(ChannelSpec::native(pin)),
        Err(Error::CapacityExceeded { capacity: 4 })
    );
    assert_eq!(b.out.channel_count(), 4);

    let status = b.out.status(last).unwrap();
    assert!(status.delegated);
    assert_eq!(status.current_limit, 300);
}

// ── Switch-on ─────────────────────────────────────────────────

#[test]
fn overcurrent_at_switch_on_reverts_to_off() {
    let (mut b, ch) = limited_bench();
    b.sensor().set(1, LIMIT + 1);

    assert_eq!(
        b.out.set_on(ch),
        Err(Error::Overcurrent {
            channel: ch,
            current: LIMIT + 1
        })
    );
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
    assert_eq!(b.out.output_level(ch), Ok(Level::Low));
    assert_eq!(b.out.current(ch), Ok(0));
    assert_eq!(b.writes(1), vec![Level::High, Level::Low]);
    assert!(
        b.faults.borrow().is_empty(),
        "switch-on rejection is reported to the caller, not the listener"
    );
}

#[test]
fn unlimited_channel_never_samples() {
    let mut b = Bench::new();
    let pin = b.pin(3);
    let ch = b.out.add_channel(ChannelSpec::native(pin)).unwrap();
    b.sensor().set(0, u16::MAX);

    assert_eq!(b.out.set_on(ch), Ok(()));
    b.out.process(10);
    b.out.process(20);

    assert_eq!(b.sensor().reads, 0);
    assert_eq!(b.out.mode(ch), Ok(Mode::On));
    assert_eq!(b.out.current_class(ch), Ok(None));
}

#[test]
fn switch_on_within_limit_records_sample() {
    let (mut b, ch) = limited_bench();
    b.sensor().set(1, 700);

    assert_eq!(b.out.set_on(ch), Ok(()));
    assert_eq!(b.out.current(ch), Ok(700));
    assert_eq!(b.out.current_class(ch), Ok(Some(CurrentClass::Normal)));
    assert_eq!(b.sensor().reads, 1);
}

#[test]
fn limit_is_inclusive() {
    let (mut b, ch) = limited_bench();
    b.sensor().set(1, LIMIT);
    assert_eq!(b.out.set_on(ch), Ok(()));
    b.out.process(10);
    assert_eq!(b.out.mode(ch), Ok(Mode::On));
}

// ── Blink ─────────────────────────────────────────────────────

#[test]
fn blink_alternates_from_each_toggle_instant() {
    let (mut b, ch) = limited_bench();
    b.clock.set(0);
    b.out.set_blink(ch, 100, 200).unwrap();

    b.out.process(50);
    assert_eq!(b.out.output_level(ch), Ok(Level::High));

    b.out.process(150);
    assert_eq!(b.out.output_level(ch), Ok(Level::Low));

    b.out.process(250);
    assert_eq!(b.out.output_level(ch), Ok(Level::Low));

    // off-phase started at 150; exactly 200 ms is not yet "more than" 200
    b.out.process(350);
    assert_eq!(b.out.output_level(ch), Ok(Level::Low));

    b.out.process(450);
    assert_eq!(b.out.output_level(ch), Ok(Level::High));
    assert_eq!(b.out.mode(ch), Ok(Mode::Blink));

    assert_eq!(b.writes(1), vec![Level::High, Level::Low, Level::High]);
}

#[test]
fn unlimited_channels_hold_their_level() {
    let mut b = Bench::new();
    let blink_pin = b.pin(2);
    let blinker = b.out.add_channel(ChannelSpec::native(blink_pin)).unwrap();
    let timed_pin = b.pin(3);
    let timed = b.out.add_channel(ChannelSpec::native(timed_pin)).unwrap();

    b.out.set_blink(blinker, 20, 20).unwrap();
    b.out.set_on_for(timed, 100).unwrap();
    for t in (10..=300).step_by(10) {
        b.out.process(t);
    }

    assert_eq!(b.out.mode(blinker), Ok(Mode::Blink));
    assert_eq!(b.out.output_level(blinker), Ok(Level::High));
    assert_eq!(b.writes(2), vec![Level::High], "nothing toggles");

    assert_eq!(b.out.mode(timed), Ok(Mode::DelayOff));
    assert_eq!(b.out.output_level(timed), Ok(Level::High));
    assert_eq!(b.writes(3), vec![Level::High]);
    assert_eq!(b.sensor().reads, 0);
}

// ── Delay-off ─────────────────────────────────────────────────

#[test]
fn delay_off_expires_after_the_delay() {
    let (mut b, ch) = limited_bench();
    b.out.set_on(ch).unwrap();
    b.clock.set(1000);
    b.out.set_off_after(ch, 500).unwrap();

    let mut t = 1000;
    while t < 1500 {
        t += 10;
        b.out.process(t);
        assert_eq!(b.out.mode(ch), Ok(Mode::DelayOff), "t={t}");
        assert_eq!(b.out.output_level(ch), Ok(Level::High));
    }

    b.out.process(1510);
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
    assert_eq!(b.out.output_level(ch), Ok(Level::Low));
    assert_eq!(b.out.current(ch), Ok(0));
}

#[test]
fn on_for_switches_on_then_schedules_off() {
    let (mut b, ch) = limited_bench();
    b.clock.set(200);
    b.out.set_on_for(ch, 100).unwrap();

    assert_eq!(b.out.output_level(ch), Ok(Level::High));
    assert_eq!(b.out.mode(ch), Ok(Mode::DelayOff));
    b.out.process(310);
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
}

#[test]
fn on_for_with_overcurrent_does_not_schedule() {
    let (mut b, ch) = limited_bench();
    b.sensor().set(1, 5000);
    assert!(matches!(
        b.out.set_on_for(ch, 100),
        Err(Error::Overcurrent { .. })
    ));
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
}

// ── Supervisor guard ──────────────────────────────────────────

#[test]
fn short_circuit_forces_off_and_notifies_once() {
    let (mut b, ch) = limited_bench();
    b.out.set_on(ch).unwrap();

    b.sensor().set(1, 1500);
    b.out.process(10);

    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
    assert_eq!(b.out.output_level(ch), Ok(Level::Low));
    assert_eq!(
        *b.faults.borrow(),
        vec![ShortCircuit {
            channel: ch,
            current: 1500
        }]
    );

    for t in (20..200).step_by(10) {
        b.out.process(t);
    }
    assert_eq!(b.faults.borrow().len(), 1, "off channels are not re-sampled");

    // Explicit switch-on recovers once the fault is gone.
    b.sensor().set(1, 500);
    assert_eq!(b.out.set_on(ch), Ok(()));
    assert_eq!(b.out.mode(ch), Ok(Mode::On));
}

#[test]
fn faulted_blink_channel_is_not_also_toggled() {
    let (mut b, ch) = limited_bench();
    b.out.set_blink(ch, 5, 5).unwrap();

    b.sensor().set(1, 2000);
    b.out.process(10);

    assert_eq!(b.writes(1), vec![Level::High, Level::Low]);
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
}

#[test]
fn below_noise_floor_is_informational() {
    let (mut b, ch) = limited_bench();
    b.out.set_on(ch).unwrap();
    b.sensor().set(1, 10);
    b.out.process(10);

    assert_eq!(b.out.mode(ch), Ok(Mode::On));
    assert_eq!(b.out.current(ch), Ok(10));
    assert_eq!(b.out.current_class(ch), Ok(Some(CurrentClass::NoLoad)));
}

#[test]
fn process_is_rate_limited() {
    let (mut b, ch) = limited_bench();
    b.out.set_on(ch).unwrap();
    let after_on = b.sensor().reads;

    b.out.process(5);
    assert_eq!(b.sensor().reads, after_on, "first period not elapsed");
    b.out.process(10);
    assert_eq!(b.sensor().reads, after_on + 1);
    b.out.process(19);
    assert_eq!(b.sensor().reads, after_on + 1);
    b.out.process(20);
    assert_eq!(b.sensor().reads, after_on + 2);
}

// ── Toggle / write / off ──────────────────────────────────────

#[test]
fn toggle_follows_mode_table() {
    let (mut b, ch) = limited_bench();

    b.out.set_blink(ch, 100, 100).unwrap();
    b.out.toggle(ch).unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));

    b.out.toggle(ch).unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::On));

    b.out.set_off_after(ch, 1000).unwrap();
    b.out.toggle(ch).unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::On), "pending delay-off is dropped");
}

#[test]
fn write_maps_zero_to_off() {
    let (mut b, ch) = limited_bench();
    b.out.write(ch, 7).unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::On));
    b.out.write(ch, 0).unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
}

#[test]
fn set_off_is_idempotent() {
    let (mut b, ch) = limited_bench();
    b.out.set_on(ch).unwrap();

    b.out.set_off(ch).unwrap();
    let once = b.out.status(ch).unwrap();
    b.out.set_off(ch).unwrap();
    let twice = b.out.status(ch).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.mode, Mode::Off);
    assert_eq!(once.current, 0);
}

// ── Currents ──────────────────────────────────────────────────

#[test]
fn total_current_sums_all_channels() {
    let mut b = Bench::new();
    for n in 1..=3u8 {
        let pin = b.pin(n);
        b.out
            .add_channel(ChannelSpec::native(pin).with_limit(SenseChannel(n as u32), LIMIT))
            .unwrap();
        b.sensor().set(n as u32, 100 * n as u16);
    }
    b.out.set_on(id(1)).unwrap();
    b.out.set_on(id(3)).unwrap();

    let sum: u32 = (1..=3)
        .map(|n| b.out.current(id(n)).unwrap() as u32)
        .sum();
    assert_eq!(b.out.total_current(), sum);
    assert_eq!(sum, 100 + 300);
    assert_eq!(b.out.current(id(2)), Ok(0));
}

// ── Delegated outputs ─────────────────────────────────────────

#[test]
fn delegated_channel_reports_writes() {
    let mut b = Bench::new();
    let ch = b
        .out
        .add_channel(ChannelSpec::delegated(0x21).with_limit(SenseChannel(9), LIMIT))
        .unwrap();
    b.sensor().set(9, 400);

    b.out.set_on(ch).unwrap();
    b.out.set_off(ch).unwrap();

    assert_eq!(
        *b.delegated.borrow(),
        vec![
            DelegatedWrite {
                external_id: 0x21,
                level: Level::High
            },
            DelegatedWrite {
                external_id: 0x21,
                level: Level::Low
            },
        ]
    );
    assert!(b.pins.borrow().is_empty());
}

#[test]
fn delegated_without_listener_still_tracks_level() {
    let mut b = Bench::new();
    b.out.clear_listeners();
    let ch = b.out.add_channel(ChannelSpec::delegated(3)).unwrap();

    b.out.set_on(ch).unwrap();
    assert_eq!(b.out.output_level(ch), Ok(Level::High));
    assert!(b.delegated.borrow().is_empty());
}

// ── Command frames ────────────────────────────────────────────

#[test]
fn command_frames_drive_the_service() {
    let (mut b, ch) = limited_bench();

    let frame = ChannelCommand::Blink {
        channel: 1,
        on_ms: 100,
        off_ms: 50,
    }
    .encode()
    .unwrap();
    b.out
        .handle_command(ChannelCommand::decode(&frame).unwrap())
        .unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::Blink));

    b.out
        .handle_command(ChannelCommand::OffAfter {
            channel: 1,
            delay_ms: 10,
        })
        .unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::DelayOff));

    b.out
        .handle_command(ChannelCommand::Write { channel: 1, level: 0 })
        .unwrap();
    assert_eq!(b.out.mode(ch), Ok(Mode::Off));
}

#[test]
fn status_serialises_for_telemetry() {
    let (mut b, ch) = limited_bench();
    b.out.set_on(ch).unwrap();
    let json = serde_json::to_string(&b.out.status(ch).unwrap()).unwrap();
    assert!(json.contains("\"mode\":\"On\""), "{json}");
    assert!(json.contains("\"current\":500"), "{json}");
}
