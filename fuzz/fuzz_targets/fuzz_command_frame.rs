//! Fuzz target: `ChannelCommand::decode` into `PowerOut::handle_command`
//!
//! Decodes arbitrary bytes as a command frame and, when one decodes,
//! dispatches it against a two-channel board.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A decoded command re-encodes to a frame that decodes to itself
//! - Commands for channel 0 or an unregistered channel are rejected
//! - A channel that ends up off carries no current
//!
//! cargo fuzz run fuzz_command_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use powerout::app::commands::ChannelCommand;
use powerout::app::ports::CurrentSensor;
use powerout::{ChannelId, ChannelSpec, Error, Mode, NoPin, PowerOut, PowerOutConfig, SenseChannel};

struct FixedSensor(u16);

impl CurrentSensor for FixedSensor {
    fn read(&mut self, _sense: SenseChannel) -> u16 {
        self.0
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(cmd) = ChannelCommand::decode(data) else {
        return;
    };

    let frame = cmd.encode().expect("encode");
    assert_eq!(ChannelCommand::decode(&frame), Ok(cmd));

    // First byte steers the simulated load so both sides of the limit get hit.
    let load = data.first().map(|b| u16::from(*b) * 8).unwrap_or(0);
    let mut out: PowerOut<NoPin, FixedSensor, fn() -> u32, 2> =
        PowerOut::new(&PowerOutConfig::default(), FixedSensor(load), (|| 0) as fn() -> u32)
            .expect("default config");
    out.add_channel(ChannelSpec::native(NoPin).with_limit(SenseChannel(0), 1000))
        .expect("slot 1");
    out.add_channel(ChannelSpec::delegated(7)).expect("slot 2");

    let res = out.handle_command(cmd);
    let ch = cmd.channel();
    if ch == 0 || ch > 2 {
        assert_eq!(res, Err(Error::InvalidChannel(ch)));
        return;
    }

    out.process(10);
    out.process(20);

    let id = ChannelId::new(ch).expect("validated above");
    if out.mode(id) == Ok(Mode::Off) {
        assert_eq!(out.current(id), Ok(0));
    }
});
