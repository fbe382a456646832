//! Log-based listener adapter.
//!
//! Implements both outbound listener ports by writing the events to the
//! `log` facade (which goes to UART / RTT / stdout depending on the host).
//! Useful as a default while bringing a board up; a real delegated-output
//! listener drives an I/O expander instead.

use log::{error, info};

use crate::app::events::{DelegatedWrite, ShortCircuit};
use crate::app::ports::{DelegatedOutputListener, ShortCircuitListener};

/// Adapter that logs every outbound event to the console.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl ShortCircuitListener for LogEventSink {
    fn on_short_circuit(&mut self, event: &ShortCircuit) {
        error!(
            "FAULT | channel={} short circuit, current={}",
            event.channel, event.current
        );
    }
}

impl DelegatedOutputListener for LogEventSink {
    fn on_delegated_write(&mut self, event: &DelegatedWrite) {
        info!("OUTPUT | external_id={} level={:?}", event.external_id, event.level);
    }
}
