//! Application core: channel logic behind port traits.
//!
//! This module contains the service that owns the channel registry and runs
//! the supervision loop, together with the traits it talks to the board
//! through ([`ports`]), the events it emits ([`events`]), and the command
//! frames it accepts ([`commands`]).

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
