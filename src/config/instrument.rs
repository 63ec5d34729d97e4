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
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;

/// A YAML representation of an instrument definition. Definitions describe
/// what an instrument exposes (controls, layers, macro keys); kits describe
/// how a particular preset uses it.
#[derive(Deserialize)]
pub struct Instrument {
    /// The key identifying the instrument definition.
    key: String,
    /// The unique numeric id of the instrument definition.
    id: u32,
    /// The display name of the instrument.
    name: Option<String>,
    /// The macro name the instrument's resolved MIDI key is exported under.
    /// Instruments with the trigger note baked into the sound file omit this.
    midi_key_name: Option<String>,
    /// The base sound definition file included by generated instrument files.
    sound_file: String,
    /// The controls the instrument exposes.
    #[serde(default)]
    controls: Vec<ControlDef>,
    /// The layers the instrument exposes.
    #[serde(default)]
    layers: Vec<LayerDef>,
}

impl Instrument {
    /// Deserializes a file from the path into an instrument definition struct.
    pub fn deserialize(path: &Path) -> Result<Instrument, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Instrument>()?)
    }

    /// Gets the key of the instrument definition.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the unique numeric id of the instrument definition.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Gets the display name of the instrument. Falls back to the key.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    /// Gets the macro name for the instrument's MIDI key.
    pub fn midi_key_name(&self) -> Option<&str> {
        self.midi_key_name.as_deref()
    }

    /// Gets the base sound definition file.
    pub fn sound_file(&self) -> &str {
        &self.sound_file
    }

    /// Gets the controls the instrument exposes.
    pub fn controls(&self) -> &[ControlDef] {
        &self.controls
    }

    /// Gets the layers the instrument exposes.
    pub fn layers(&self) -> &[LayerDef] {
        &self.layers
    }
}

/// A YAML representation of a control an instrument exposes.
#[derive(Deserialize)]
pub struct ControlDef {
    /// The display name of the control.
    name: Option<String>,
    /// The semantic type name of the control.
    #[serde(rename = "type")]
    control_type: String,
    /// The physical macro key the control is addressed by in sound files.
    key: String,
}

impl ControlDef {
    /// Gets the display name of the control. Falls back to the type name.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.control_type)
    }

    /// Gets the semantic type name of the control.
    pub fn control_type(&self) -> &str {
        &self.control_type
    }

    /// Gets the physical macro key of the control.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A YAML representation of a layer an instrument exposes.
#[derive(Deserialize)]
pub struct LayerDef {
    /// The name of the layer.
    name: String,
    /// The macro name the layer's resolved MIDI key is exported under.
    midi_key_name: String,
    /// The controls the layer exposes.
    #[serde(default)]
    controls: Vec<ControlDef>,
}

impl LayerDef {
    /// Gets the name of the layer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the macro name for the layer's MIDI key.
    pub fn midi_key_name(&self) -> &str {
        &self.midi_key_name
    }

    /// Gets the controls the layer exposes.
    pub fn controls(&self) -> &[ControlDef] {
        &self.controls
    }
}
