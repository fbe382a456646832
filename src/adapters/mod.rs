//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements              | Connects to                 |
//! |------------|-------------------------|-----------------------------|
//! | `adc`      | CurrentSensor           | Board ADC via `AdcReader`   |
//! | `log_sink` | ShortCircuitListener    | `log` facade                |
//! |            | DelegatedOutputListener |                             |
//! | `time`     | Clock                   | `std::time::Instant`        |

pub mod adc;
pub mod log_sink;
pub mod time;
