// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashMap;
use std::path::Path;
use std::{error::Error, fmt};

use midly::num::u7;

#[cfg(test)]
pub mod mock;

/// Identifies an audio or MIDI device attached to the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub i32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a sampler channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub i32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connector to a running sampler process. The wire protocol, connection
/// health and reconnection behavior all live behind this boundary; none of
/// the calls retry implicitly.
pub trait Sampler: Send {
    /// Attaches an audio output device using the given driver, idempotent if
    /// an equivalent device is already attached.
    fn connect_audio_output(
        &mut self,
        driver: &str,
        params: &HashMap<String, String>,
    ) -> Result<DeviceId, Box<dyn Error>>;

    /// Attaches a MIDI input device using the given driver, idempotent if an
    /// equivalent device is already attached.
    fn connect_midi_input(
        &mut self,
        driver: &str,
        params: &HashMap<String, String>,
    ) -> Result<DeviceId, Box<dyn Error>>;

    /// Creates a sampler channel bound to the given devices and loads the
    /// given instrument file into it.
    fn create_channel(
        &mut self,
        audio_device: DeviceId,
        midi_device: DeviceId,
        instrument_file: &Path,
    ) -> Result<ChannelId, Box<dyn Error>>;

    /// Sends a MIDI continuous controller change to the channel.
    fn send_midi_cc(&mut self, channel: ChannelId, cc: u7, value: u7)
        -> Result<(), Box<dyn Error>>;

    /// Sets the channel volume directly. Volume is a unit value, 1.0 being
    /// full scale.
    fn set_channel_volume(&mut self, channel: ChannelId, volume: f64)
        -> Result<(), Box<dyn Error>>;
}
