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
//! The kit preset control graph.
//!
//! A loaded kit is a graph of channels, instruments, layers and controls.
//! Controls live in a flat arena owned by [KitPreset] and are addressed by
//! [ControlId] internally and by an opaque stable key externally. Virtual
//! controls fan a single set request out to the physical controls linked to
//! them while preserving their relative balance.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use midly::num::u7;

use crate::config;
use crate::instrument::InstrumentDefinition;
use crate::midimap::KeyMapping;

use self::error::{GraphError, LookupError};

pub mod dispatch;
pub mod error;
pub mod graph;
pub mod normalize;
pub mod validate;

/// Identifies a control within one loaded kit preset graph. Ids are indices
/// into the preset's control arena and are only meaningful for the graph
/// instance that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlId(pub(crate) usize);

/// The semantic type of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Volume,
    Pan,
    Pitch,
    Other,
}

impl ControlType {
    /// Parses a control type from its declared name. Returns None for names
    /// outside the known set, which the validator reports as a violation.
    pub fn from_name(name: &str) -> Option<ControlType> {
        match name {
            "volume" => Some(ControlType::Volume),
            "pan" => Some(ControlType::Pan),
            "pitch" => Some(ControlType::Pitch),
            "other" => Some(ControlType::Other),
            _ => None,
        }
    }
}

/// How a control reacts to a set request.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlBehavior {
    /// Forwards a single command to the sampler.
    Physical,
    /// Fans the request out to the linked physical controls.
    Virtual { links: Vec<ControlLink> },
}

/// A link from a virtual control to one of the controls it drives.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlLink {
    /// The linked control.
    pub control: ControlId,
    /// The linked control's raw value at graph construction time, the
    /// reference point for proportional scaling.
    pub baseline: f64,
}

/// A single runtime control: one UI facing value with a stable key.
pub struct PresetControl {
    /// The display name of the control.
    name: String,
    /// The declared semantic type name.
    type_name: String,
    /// The MIDI CC number driving the control, if it is CC backed.
    cc: Option<u7>,
    /// The physical macro key resolved from the instrument definition.
    /// None for channel level and synthesized controls.
    physical_key: Option<String>,
    /// The current raw value: 0..=127 for CC backed controls, the unit range
    /// otherwise.
    value: f64,
    /// The stable key addressing the control within this graph instance.
    key: String,
    /// The key of the channel the control plays through.
    channel: String,
    /// The dispatch behavior of the control.
    behavior: ControlBehavior,
    /// The virtual control driving this one, if any.
    linked_to: Option<ControlId>,
}

impl PresetControl {
    /// Gets the display name of the control.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the declared semantic type name of the control.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Gets the semantic type of the control.
    pub fn control_type(&self) -> Option<ControlType> {
        ControlType::from_name(&self.type_name)
    }

    /// Gets the MIDI CC number of the control, if it is CC backed.
    pub fn cc(&self) -> Option<u7> {
        self.cc
    }

    /// Gets the physical macro key of the control.
    pub fn physical_key(&self) -> Option<&str> {
        self.physical_key.as_deref()
    }

    /// Gets the current raw value of the control.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Gets the normalized value of the control.
    pub fn normalized(&self) -> f64 {
        normalize::normalize(
            self.control_type().unwrap_or(ControlType::Other),
            self.cc.is_some(),
            self.value,
        )
    }

    /// Gets the stable key of the control.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the key of the channel the control plays through.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Gets the dispatch behavior of the control.
    pub fn behavior(&self) -> &ControlBehavior {
        &self.behavior
    }

    /// Gets the virtual control driving this one, if any.
    pub fn linked_to(&self) -> Option<ControlId> {
        self.linked_to
    }

    /// Returns true if the control is virtual.
    pub fn is_virtual(&self) -> bool {
        matches!(self.behavior, ControlBehavior::Virtual { .. })
    }
}

/// A mixer channel of a loaded kit.
pub struct PresetChannel {
    /// The key identifying the channel.
    key: String,
    /// The display name of the channel.
    name: String,
    /// The channel level controls by type name.
    controls: BTreeMap<String, ControlId>,
}

impl PresetChannel {
    /// Gets the key of the channel.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gets the display name of the channel.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the channel level controls by type name.
    pub fn controls(&self) -> &BTreeMap<String, ControlId> {
        &self.controls
    }
}

/// An instrument of a loaded kit.
pub struct PresetInstrument {
    /// The definition the instrument is based on.
    definition: Arc<InstrumentDefinition>,
    /// The display name of the instrument.
    name: String,
    /// The key of the channel the instrument plays through.
    channel: String,
    /// The symbolic MIDI key that triggers the instrument.
    midi_key: Option<String>,
    /// The resolved MIDI note of the instrument.
    midi_note: Option<u7>,
    /// The instrument level controls by type name.
    controls: BTreeMap<String, ControlId>,
    /// The instrument layers, in declaration order.
    layers: Vec<PresetLayer>,
}

impl PresetInstrument {
    /// Gets the definition the instrument is based on.
    pub fn definition(&self) -> &Arc<InstrumentDefinition> {
        &self.definition
    }

    /// Gets the display name of the instrument.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the key of the channel the instrument plays through.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Gets the symbolic MIDI key of the instrument.
    pub fn midi_key(&self) -> Option<&str> {
        self.midi_key.as_deref()
    }

    /// Gets the resolved MIDI note of the instrument.
    pub fn midi_note(&self) -> Option<u7> {
        self.midi_note
    }

    /// Gets the instrument level controls by type name.
    pub fn controls(&self) -> &BTreeMap<String, ControlId> {
        &self.controls
    }

    /// Gets the instrument layers.
    pub fn layers(&self) -> &[PresetLayer] {
        &self.layers
    }
}

/// A layer of a loaded instrument.
pub struct PresetLayer {
    /// The name of the layer.
    name: String,
    /// The symbolic MIDI key that triggers the layer.
    midi_key: String,
    /// The resolved MIDI note of the layer.
    midi_note: u7,
    /// The macro name the layer's MIDI key is exported under, resolved from
    /// the layer definition.
    midi_key_name: String,
    /// The layer level controls by type name.
    controls: BTreeMap<String, ControlId>,
}

impl PresetLayer {
    /// Gets the name of the layer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the symbolic MIDI key of the layer.
    pub fn midi_key(&self) -> &str {
        &self.midi_key
    }

    /// Gets the resolved MIDI note of the layer.
    pub fn midi_note(&self) -> u7 {
        self.midi_note
    }

    /// Gets the macro name for the layer's MIDI key.
    pub fn midi_key_name(&self) -> &str {
        &self.midi_key_name
    }

    /// Gets the layer level controls by type name.
    pub fn controls(&self) -> &BTreeMap<String, ControlId> {
        &self.controls
    }
}

/// Addresses the owner of a control for type based lookups.
#[derive(Debug, Clone, Copy)]
pub enum Owner<'a> {
    /// A channel, by channel key.
    Channel(&'a str),
    /// An instrument, by display name.
    Instrument(&'a str),
    /// A layer, by instrument display name and layer name.
    Layer(&'a str, &'a str),
}

/// A fully resolved kit preset: the root aggregate owning every channel,
/// instrument, layer and control of one loaded kit. Built once per load,
/// mutated in place by set requests, discarded on the next load.
pub struct KitPreset {
    /// The name of the kit.
    name: String,
    /// The mixer channels, in declaration order.
    channels: Vec<PresetChannel>,
    /// The instruments, in declaration order.
    instruments: Vec<PresetInstrument>,
    /// The control arena.
    controls: Vec<PresetControl>,
    /// Stable key to control index.
    by_key: HashMap<String, ControlId>,
}

impl KitPreset {
    /// Builds a fully resolved control graph from a kit preset configuration,
    /// the instrument definitions it references and an ordered list of MIDI
    /// key mapping providers. Fails on the first unresolved reference.
    pub fn new(
        config: &config::kit::Kit,
        library: &crate::instrument::Library,
        key_mappings: &[Arc<dyn KeyMapping>],
    ) -> Result<KitPreset, GraphError> {
        graph::build(config, library, key_mappings)
    }

    /// Gets the name of the kit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the mixer channels of the kit.
    pub fn channels(&self) -> &[PresetChannel] {
        &self.channels
    }

    /// Gets the instruments of the kit.
    pub fn instruments(&self) -> &[PresetInstrument] {
        &self.instruments
    }

    /// Gets the control with the given id.
    pub fn control(&self, id: ControlId) -> &PresetControl {
        &self.controls[id.0]
    }

    /// Gets the control with the given stable key.
    pub fn control_by_key(&self, key: &str) -> Result<&PresetControl, LookupError> {
        let id = self
            .by_key
            .get(key)
            .ok_or_else(|| LookupError::UnknownKey(key.to_string()))?;
        Ok(&self.controls[id.0])
    }

    /// Finds the control of the given type on the given owner.
    pub fn find_control(
        &self,
        owner: Owner<'_>,
        control_type: &str,
    ) -> Result<&PresetControl, LookupError> {
        let (controls, owner_name) = match owner {
            Owner::Channel(key) => {
                let channel = self
                    .channels
                    .iter()
                    .find(|channel| channel.key() == key)
                    .ok_or_else(|| LookupError::UnknownOwner(format!("channel {}", key)))?;
                (&channel.controls, format!("channel {}", key))
            }
            Owner::Instrument(name) => {
                let instrument = self
                    .instrument_by_name(name)
                    .ok_or_else(|| LookupError::UnknownOwner(format!("instrument {}", name)))?;
                (&instrument.controls, format!("instrument {}", name))
            }
            Owner::Layer(instrument_name, layer_name) => {
                let instrument = self.instrument_by_name(instrument_name).ok_or_else(|| {
                    LookupError::UnknownOwner(format!("instrument {}", instrument_name))
                })?;
                let layer = instrument
                    .layers
                    .iter()
                    .find(|layer| layer.name() == layer_name)
                    .ok_or_else(|| {
                        LookupError::UnknownOwner(format!(
                            "layer {} of instrument {}",
                            layer_name, instrument_name
                        ))
                    })?;
                (
                    &layer.controls,
                    format!("layer {} of instrument {}", layer_name, instrument_name),
                )
            }
        };

        let id = controls
            .get(control_type)
            .ok_or_else(|| LookupError::UnknownControl {
                owner: owner_name,
                control_type: control_type.to_string(),
            })?;
        Ok(&self.controls[id.0])
    }

    fn instrument_by_name(&self, name: &str) -> Option<&PresetInstrument> {
        self.instruments
            .iter()
            .find(|instrument| instrument.name() == name)
    }
}
