//! Fixed-capacity channel registry.
//!
//! Channels are appended once during configuration and live for the rest
//! of the program.  Slot `n` always holds the channel with id `n + 1`;
//! there is no removal, so ids stay stable.

use heapless::Vec;
use log::{info, warn};

use crate::channel::{Channel, ChannelId, ChannelSpec};
use crate::error::{Error, Result};

/// Ordered arena of at most `N` channels.
pub struct ChannelRegistry<P, const N: usize> {
    channels: Vec<Channel<P>, N>,
}

impl<P, const N: usize> ChannelRegistry<P, N> {
    pub const fn new() -> Self {
        const { assert!(N <= u8::MAX as usize, "channel ids are u8") };
        Self {
            channels: Vec::new(),
        }
    }

    /// Append a channel.  Fails without side effects when full or when a
    /// limit is given without a sense channel.
    pub fn add(&mut self, spec: ChannelSpec<P>) -> Result<ChannelId> {
        if spec.current_limit > 0 && spec.sense.is_none() {
            warn!("Registry: limit {} without sense channel rejected", spec.current_limit);
            return Err(Error::MissingSense);
        }
        if self.channels.is_full() {
            warn!("Registry: full ({} channels), channel rejected", N);
            return Err(Error::CapacityExceeded { capacity: N });
        }

        let id = ChannelId::from_slot(self.channels.len());
        let limit = spec.current_limit;
        if self.channels.push(Channel::new(id, spec)).is_err() {
            return Err(Error::CapacityExceeded { capacity: N });
        }
        info!("Registry: added channel {} (limit {})", id, limit);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Look up a raw channel number, rejecting 0 and unregistered ids.
    pub fn resolve(&self, index: u8) -> Result<ChannelId> {
        ChannelId::new(index)
            .filter(|id| id.slot() < self.channels.len())
            .ok_or(Error::InvalidChannel(index))
    }

    pub fn get(&self, id: ChannelId) -> Result<&Channel<P>> {
        self.channels
            .get(id.slot())
            .ok_or(Error::InvalidChannel(id.get()))
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Result<&mut Channel<P>> {
        self.channels
            .get_mut(id.slot())
            .ok_or(Error::InvalidChannel(id.get()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel<P>> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel<P>> {
        self.channels.iter_mut()
    }
}

impl<P, const N: usize> Default for ChannelRegistry<P, N> {
    fn default() -> Self {
        Self::new()
    }
}
