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
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use config::{Config, File};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// A YAML representation of a kit preset.
#[derive(Deserialize, Serialize)]
pub struct Kit {
    /// The name of the kit.
    name: String,
    /// The mixer channels belonging to this kit.
    channels: Vec<Channel>,
    /// The instruments belonging to this kit.
    instruments: Vec<Instrument>,
}

impl Kit {
    /// Creates a new kit preset configuration.
    pub fn new(name: &str, channels: Vec<Channel>, instruments: Vec<Instrument>) -> Kit {
        Kit {
            name: name.to_string(),
            channels,
            instruments,
        }
    }

    /// Deserializes a file from the path into a kit preset configuration struct.
    pub fn deserialize(path: &Path) -> Result<Kit, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Kit>()?)
    }

    /// Serialize and save a kit preset configuration struct to a file at given path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yml::to_string(self)?;

        let mut file = std::fs::File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    /// Gets the name of the kit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the mixer channels of the kit.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Gets the instruments of the kit.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }
}

/// A YAML representation of a kit mixer channel.
#[derive(Deserialize, Serialize)]
pub struct Channel {
    /// The key identifying the channel within the kit.
    key: String,
    /// The display name of the channel.
    name: Option<String>,
    /// The channel level controls, keyed by control type name.
    #[serde(default)]
    controls: BTreeMap<String, Control>,
}

impl Channel {
    /// Gets the key of the channel.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the display name of the channel. Falls back to the channel key.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    /// Gets the channel level controls.
    pub fn controls(&self) -> &BTreeMap<String, Control> {
        &self.controls
    }
}

/// A YAML representation of an instrument placement within a kit.
#[derive(Deserialize, Serialize)]
pub struct Instrument {
    /// The key of the instrument definition this placement refers to.
    instrument: String,
    /// The display name of the instrument.
    name: Option<String>,
    /// The key of the channel the instrument plays through.
    channel: String,
    /// The symbolic MIDI key that triggers the instrument.
    midi_key: Option<String>,
    /// The instrument level controls, keyed by control type name.
    #[serde(default)]
    controls: BTreeMap<String, Control>,
    /// The instrument layers. Order is load bearing: the layer's position
    /// feeds the stable control key scheme.
    #[serde(default)]
    layers: Vec<Layer>,
}

impl Instrument {
    /// Gets the instrument definition key.
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Gets the display name of the instrument. Falls back to the definition key.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.instrument)
    }

    /// Gets the key of the channel the instrument plays through.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Gets the symbolic MIDI key of the instrument.
    pub fn midi_key(&self) -> Option<&str> {
        self.midi_key.as_deref()
    }

    /// Gets the instrument level controls.
    pub fn controls(&self) -> &BTreeMap<String, Control> {
        &self.controls
    }

    /// Gets the instrument layers.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

/// A YAML representation of an instrument layer within a kit.
#[derive(Deserialize, Serialize)]
pub struct Layer {
    /// The name of the layer. Must match a layer in the instrument definition.
    name: String,
    /// The symbolic MIDI key that triggers the layer.
    midi_key: String,
    /// The layer level controls, keyed by control type name.
    #[serde(default)]
    controls: BTreeMap<String, Control>,
}

impl Layer {
    /// Gets the name of the layer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the symbolic MIDI key of the layer.
    pub fn midi_key(&self) -> &str {
        &self.midi_key
    }

    /// Gets the layer level controls.
    pub fn controls(&self) -> &BTreeMap<String, Control> {
        &self.controls
    }
}

/// A YAML representation of a single preset control.
#[derive(Deserialize, Serialize, Clone)]
pub struct Control {
    /// The display name of the control.
    name: Option<String>,
    /// The MIDI CC number driving this control. 0 means the control is not
    /// CC backed.
    #[serde(default)]
    cc: u8,
    /// The current raw value of the control.
    #[serde(default)]
    value: f64,
}

impl Control {
    /// Creates a new control configuration.
    pub fn new(name: Option<&str>, cc: u8, value: f64) -> Control {
        Control {
            name: name.map(|name| name.to_string()),
            cc,
            value,
        }
    }

    /// Gets the display name of the control.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Gets the MIDI CC number of the control. 0 means the control is not
    /// CC backed.
    pub fn cc(&self) -> u8 {
        self.cc
    }

    /// Gets the current raw value of the control.
    pub fn value(&self) -> f64 {
        self.value
    }
}
