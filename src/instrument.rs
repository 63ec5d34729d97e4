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
use std::fmt;
use std::sync::Arc;

use crate::config;

/// A static description of an instrument: the controls and layers it exposes
/// and the macro keys they are addressed by in sound files. Definitions are
/// immutable once loaded and shared read-only across every kit that
/// references them.
pub struct InstrumentDefinition {
    /// The key identifying the definition.
    key: String,
    /// The unique numeric id of the definition.
    id: u32,
    /// The display name of the instrument.
    name: String,
    /// The macro name the instrument's resolved MIDI key is exported under.
    midi_key_name: Option<String>,
    /// The base sound definition file included by generated instrument files.
    sound_file: String,
    /// The controls the instrument exposes.
    controls: Vec<ControlDefinition>,
    /// The layers the instrument exposes.
    layers: Vec<LayerDefinition>,
}

impl InstrumentDefinition {
    /// Creates an instrument definition from its configuration.
    pub fn new(config: &config::instrument::Instrument) -> InstrumentDefinition {
        InstrumentDefinition {
            key: config.key().to_string(),
            id: config.id(),
            name: config.name().to_string(),
            midi_key_name: config.midi_key_name().map(|name| name.to_string()),
            sound_file: config.sound_file().to_string(),
            controls: config.controls().iter().map(ControlDefinition::new).collect(),
            layers: config.layers().iter().map(LayerDefinition::new).collect(),
        }
    }

    /// Gets the key of the definition.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the unique numeric id of the definition.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Gets the display name of the instrument.
    pub fn name(&self) -> &str {
        &self.name
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
    pub fn controls(&self) -> &[ControlDefinition] {
        &self.controls
    }

    /// Gets the layers the instrument exposes.
    pub fn layers(&self) -> &[LayerDefinition] {
        &self.layers
    }

    /// Finds the control with the given type name.
    pub fn control(&self, control_type: &str) -> Option<&ControlDefinition> {
        self.controls
            .iter()
            .find(|control| control.control_type() == control_type)
    }

    /// Finds the layer with the given name.
    pub fn layer(&self, name: &str) -> Option<&LayerDefinition> {
        self.layers.iter().find(|layer| layer.name() == name)
    }
}

impl fmt::Display for InstrumentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (key: {}, controls: {}, layers: {})",
            self.name,
            self.key,
            self.controls.len(),
            self.layers.len()
        )
    }
}

/// A control an instrument exposes.
pub struct ControlDefinition {
    /// The display name of the control.
    name: String,
    /// The semantic type name of the control.
    control_type: String,
    /// The physical macro key of the control.
    key: String,
}

impl ControlDefinition {
    fn new(config: &config::instrument::ControlDef) -> ControlDefinition {
        ControlDefinition {
            name: config.name().to_string(),
            control_type: config.control_type().to_string(),
            key: config.key().to_string(),
        }
    }

    /// Gets the display name of the control.
    pub fn name(&self) -> &str {
        &self.name
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

/// A layer an instrument exposes.
pub struct LayerDefinition {
    /// The name of the layer.
    name: String,
    /// The macro name the layer's resolved MIDI key is exported under.
    midi_key_name: String,
    /// The controls the layer exposes.
    controls: Vec<ControlDefinition>,
}

impl LayerDefinition {
    fn new(config: &config::instrument::LayerDef) -> LayerDefinition {
        LayerDefinition {
            name: config.name().to_string(),
            midi_key_name: config.midi_key_name().to_string(),
            controls: config.controls().iter().map(ControlDefinition::new).collect(),
        }
    }

    /// Gets the name of the layer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the macro name for the layer's MIDI key.
    pub fn midi_key_name(&self) -> &str {
        &self.midi_key_name
    }

    /// Gets the controls the layer exposes.
    pub fn controls(&self) -> &[ControlDefinition] {
        &self.controls
    }

    /// Finds the control with the given type name.
    pub fn control(&self, control_type: &str) -> Option<&ControlDefinition> {
        self.controls
            .iter()
            .find(|control| control.control_type() == control_type)
    }
}

/// The set of instrument definitions known to the process.
pub struct Library {
    instruments: HashMap<String, Arc<InstrumentDefinition>>,
}

impl Library {
    /// Creates a library from parsed instrument definition configurations.
    pub fn new(configs: &HashMap<String, config::instrument::Instrument>) -> Library {
        Library {
            instruments: configs
                .iter()
                .map(|(key, config)| (key.clone(), Arc::new(InstrumentDefinition::new(config))))
                .collect(),
        }
    }

    /// Gets the definition with the given key.
    pub fn get(&self, key: &str) -> Option<Arc<InstrumentDefinition>> {
        self.instruments.get(key).cloned()
    }

    /// The number of definitions in the library.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Returns true if the library holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Gets all definitions sorted by key so that listings are consistent.
    pub fn sorted_list(&self) -> Vec<Arc<InstrumentDefinition>> {
        let mut list: Vec<Arc<InstrumentDefinition>> = self.instruments.values().cloned().collect();
        list.sort_by(|a, b| a.key().cmp(b.key()));
        list
    }
}
