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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use midly::num::u7;

use super::{ChannelId, DeviceId, Sampler};

/// A recorded call against the mock sampler.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ConnectAudioOutput {
        driver: String,
    },
    ConnectMidiInput {
        driver: String,
    },
    CreateChannel {
        audio_device: DeviceId,
        midi_device: DeviceId,
        instrument_file: PathBuf,
    },
    SendMidiCc {
        channel: ChannelId,
        cc: u8,
        value: u8,
    },
    SetChannelVolume {
        channel: ChannelId,
        volume: f64,
    },
}

/// A mock sampler connector. Records every call; clones share the log so
/// tests can hand the mock to a loader and still inspect it.
#[derive(Clone, Default)]
pub struct MockSampler {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_message: Arc<Mutex<Option<String>>>,
    next_device: Arc<Mutex<i32>>,
    next_channel: Arc<Mutex<i32>>,
}

impl MockSampler {
    pub fn new() -> MockSampler {
        MockSampler::default()
    }

    /// Makes every subsequent call fail with the given message.
    pub fn fail_with(&self, message: &str) {
        let mut fail_message = self
            .fail_message
            .lock()
            .expect("unable to get fail message lock");
        *fail_message = Some(message.to_string());
    }

    /// Gets all recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("unable to get calls lock").clone()
    }

    /// Clears the recorded calls.
    pub fn clear(&self) {
        self.calls.lock().expect("unable to get calls lock").clear();
    }

    fn record(&self, call: Call) -> Result<(), Box<dyn Error>> {
        if let Some(message) = self
            .fail_message
            .lock()
            .expect("unable to get fail message lock")
            .as_ref()
        {
            return Err(message.clone().into());
        }

        self.calls.lock().expect("unable to get calls lock").push(call);
        Ok(())
    }
}

impl Sampler for MockSampler {
    fn connect_audio_output(
        &mut self,
        driver: &str,
        _: &HashMap<String, String>,
    ) -> Result<DeviceId, Box<dyn Error>> {
        self.record(Call::ConnectAudioOutput {
            driver: driver.to_string(),
        })?;
        let mut next = self.next_device.lock().expect("unable to get device lock");
        *next += 1;
        Ok(DeviceId(*next))
    }

    fn connect_midi_input(
        &mut self,
        driver: &str,
        _: &HashMap<String, String>,
    ) -> Result<DeviceId, Box<dyn Error>> {
        self.record(Call::ConnectMidiInput {
            driver: driver.to_string(),
        })?;
        let mut next = self.next_device.lock().expect("unable to get device lock");
        *next += 1;
        Ok(DeviceId(*next))
    }

    fn create_channel(
        &mut self,
        audio_device: DeviceId,
        midi_device: DeviceId,
        instrument_file: &Path,
    ) -> Result<ChannelId, Box<dyn Error>> {
        self.record(Call::CreateChannel {
            audio_device,
            midi_device,
            instrument_file: instrument_file.to_path_buf(),
        })?;
        let mut next = self.next_channel.lock().expect("unable to get channel lock");
        *next += 1;
        Ok(ChannelId(*next))
    }

    fn send_midi_cc(
        &mut self,
        channel: ChannelId,
        cc: u7,
        value: u7,
    ) -> Result<(), Box<dyn Error>> {
        self.record(Call::SendMidiCc {
            channel,
            cc: cc.as_int(),
            value: value.as_int(),
        })
    }

    fn set_channel_volume(
        &mut self,
        channel: ChannelId,
        volume: f64,
    ) -> Result<(), Box<dyn Error>> {
        self.record(Call::SetChannelVolume { channel, volume })
    }
}
