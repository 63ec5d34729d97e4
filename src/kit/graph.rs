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
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use midly::num::u7;
use tracing::debug;

use crate::config;
use crate::instrument::Library;
use crate::midimap::KeyMapping;

use super::error::GraphError;
use super::{
    ControlBehavior, ControlId, ControlLink, KitPreset, PresetChannel, PresetControl,
    PresetInstrument, PresetLayer,
};

/// Control types that participate in virtual aggregation.
const LINKED_TYPES: [&str; 2] = ["volume", "pan"];

/// Builds the resolved control graph for a kit preset. See [KitPreset::new].
pub(super) fn build(
    config: &config::kit::Kit,
    library: &Library,
    key_mappings: &[Arc<dyn KeyMapping>],
) -> Result<KitPreset, GraphError> {
    let mappings = fetch_mappings(key_mappings)?;

    // Channel key to instrument indices. Instruments referencing a channel
    // the kit does not declare abort the build, as do duplicate channel keys.
    let mut channel_instruments: HashMap<&str, Vec<usize>> = HashMap::new();
    for channel in config.channels() {
        if channel_instruments
            .insert(channel.key(), Vec::new())
            .is_some()
        {
            return Err(GraphError::DuplicateChannel {
                channel: channel.key().to_string(),
            });
        }
    }
    for (index, instrument) in config.instruments().iter().enumerate() {
        match channel_instruments.get_mut(instrument.channel()) {
            Some(indices) => indices.push(index),
            None => {
                return Err(GraphError::UnknownChannel {
                    instrument: instrument.name().to_string(),
                    channel: instrument.channel().to_string(),
                })
            }
        }
    }

    let mut arena = Arena::default();

    let mut instruments: Vec<PresetInstrument> = Vec::new();
    for (index, instrument) in config.instruments().iter().enumerate() {
        instruments.push(build_instrument(
            index, instrument, library, &mappings, &mut arena,
        )?);
    }

    // An instrument with layers gets a virtual volume/pan control driving
    // every layer control of that type.
    for (index, instrument) in instruments.iter_mut().enumerate() {
        link_instrument(index, instrument, &mut arena);
    }

    // A channel with several instruments gets a virtual volume/pan control
    // driving each instrument's effective control of that type.
    let mut channels: Vec<PresetChannel> = Vec::new();
    for (index, channel) in config.channels().iter().enumerate() {
        let indices = &channel_instruments[channel.key()];
        channels.push(build_channel(
            index,
            channel,
            indices,
            &instruments,
            &mut arena,
        ));
    }

    debug!(
        kit = config.name(),
        controls = arena.controls.len(),
        "Built control graph."
    );

    Ok(KitPreset {
        name: config.name().to_string(),
        channels,
        instruments,
        controls: arena.controls,
        by_key: arena.by_key,
    })
}

/// The control arena under construction.
#[derive(Default)]
struct Arena {
    controls: Vec<PresetControl>,
    by_key: HashMap<String, ControlId>,
}

impl Arena {
    fn push(&mut self, control: PresetControl) -> ControlId {
        let id = ControlId(self.controls.len());
        self.by_key.insert(control.key.clone(), id);
        self.controls.push(control);
        id
    }
}

fn build_instrument(
    index: usize,
    config: &config::kit::Instrument,
    library: &Library,
    mappings: &[(String, HashMap<String, u7>)],
    arena: &mut Arena,
) -> Result<PresetInstrument, GraphError> {
    let definition =
        library
            .get(config.instrument())
            .ok_or_else(|| GraphError::UnknownDefinition {
                instrument: config.name().to_string(),
                definition: config.instrument().to_string(),
            })?;

    let midi_note = match config.midi_key() {
        Some(key) => Some(resolve_key(config.name(), key, mappings)?),
        None => None,
    };

    let mut controls: BTreeMap<String, ControlId> = BTreeMap::new();
    for (type_name, control) in config.controls() {
        let control_def =
            definition
                .control(type_name)
                .ok_or_else(|| GraphError::MissingControl {
                    instrument: config.name().to_string(),
                    control: type_name.clone(),
                })?;
        let id = arena.push(PresetControl {
            name: control.name().unwrap_or(control_def.name()).to_string(),
            type_name: type_name.clone(),
            cc: control_cc(control),
            physical_key: Some(control_def.key().to_string()),
            value: control.value(),
            key: format!("i{}{}", index, type_name),
            channel: config.channel().to_string(),
            behavior: ControlBehavior::Physical,
            linked_to: None,
        });
        controls.insert(type_name.clone(), id);
    }

    let mut layers: Vec<PresetLayer> = Vec::new();
    for (layer_index, layer) in config.layers().iter().enumerate() {
        let layer_def = definition
            .layer(layer.name())
            .ok_or_else(|| GraphError::MissingLayer {
                instrument: config.name().to_string(),
                layer: layer.name().to_string(),
            })?;
        let midi_note = resolve_key(config.name(), layer.midi_key(), mappings)?;

        let mut layer_controls: BTreeMap<String, ControlId> = BTreeMap::new();
        for (type_name, control) in layer.controls() {
            let control_def =
                layer_def
                    .control(type_name)
                    .ok_or_else(|| GraphError::MissingControl {
                        instrument: config.name().to_string(),
                        control: format!("{}.{}", layer.name(), type_name),
                    })?;
            let id = arena.push(PresetControl {
                name: control.name().unwrap_or(control_def.name()).to_string(),
                type_name: type_name.clone(),
                cc: control_cc(control),
                physical_key: Some(control_def.key().to_string()),
                value: control.value(),
                key: format!("i{}l{}{}", index, layer_index, type_name),
                channel: config.channel().to_string(),
                behavior: ControlBehavior::Physical,
                linked_to: None,
            });
            layer_controls.insert(type_name.clone(), id);
        }

        layers.push(PresetLayer {
            name: layer.name().to_string(),
            midi_key: layer.midi_key().to_string(),
            midi_note,
            midi_key_name: layer_def.midi_key_name().to_string(),
            controls: layer_controls,
        });
    }

    Ok(PresetInstrument {
        definition,
        name: config.name().to_string(),
        channel: config.channel().to_string(),
        midi_key: config.midi_key().map(|key| key.to_string()),
        midi_note,
        controls,
        layers,
    })
}

fn link_instrument(index: usize, instrument: &mut PresetInstrument, arena: &mut Arena) {
    if instrument.layers.is_empty() {
        return;
    }

    for type_name in LINKED_TYPES {
        let targets: Vec<ControlId> = instrument
            .layers
            .iter()
            .filter_map(|layer| layer.controls.get(type_name).copied())
            .collect();
        if targets.is_empty() {
            continue;
        }

        let links: Vec<ControlLink> = targets
            .iter()
            .map(|id| ControlLink {
                control: *id,
                baseline: arena.controls[id.0].value,
            })
            .collect();

        // Reuse a declared instrument control as the aggregate, otherwise
        // synthesize one at full scale.
        let virtual_id = match instrument.controls.get(type_name).copied() {
            Some(id) => id,
            None => {
                let id = arena.push(PresetControl {
                    name: format!("{} {}", instrument.name, type_name),
                    type_name: type_name.to_string(),
                    cc: None,
                    physical_key: None,
                    value: full_scale_value(type_name),
                    key: format!("i{}{}", index, type_name),
                    channel: instrument.channel.clone(),
                    behavior: ControlBehavior::Physical,
                    linked_to: None,
                });
                instrument.controls.insert(type_name.to_string(), id);
                id
            }
        };

        arena.controls[virtual_id.0].behavior = ControlBehavior::Virtual { links };
        for target in targets {
            arena.controls[target.0].linked_to = Some(virtual_id);
        }
    }
}

fn build_channel(
    index: usize,
    config: &config::kit::Channel,
    instrument_indices: &[usize],
    instruments: &[PresetInstrument],
    arena: &mut Arena,
) -> PresetChannel {
    let mut controls: BTreeMap<String, ControlId> = BTreeMap::new();
    for (type_name, control) in config.controls() {
        let name = match control.name() {
            Some(name) => name.to_string(),
            None => format!("{} {}", config.name(), type_name),
        };
        let id = arena.push(PresetControl {
            name,
            type_name: type_name.clone(),
            cc: control_cc(control),
            physical_key: None,
            value: control.value(),
            key: format!("c{}{}", index, type_name),
            channel: config.key().to_string(),
            behavior: ControlBehavior::Physical,
            linked_to: None,
        });
        controls.insert(type_name.clone(), id);
    }

    if instrument_indices.len() > 1 {
        for type_name in LINKED_TYPES {
            let targets: Vec<ControlId> = instrument_indices
                .iter()
                .filter_map(|i| instruments[*i].controls.get(type_name).copied())
                .collect();
            if targets.is_empty() {
                continue;
            }

            let links: Vec<ControlLink> = targets
                .iter()
                .map(|id| ControlLink {
                    control: *id,
                    baseline: arena.controls[id.0].value,
                })
                .collect();

            let virtual_id = match controls.get(type_name).copied() {
                Some(id) => id,
                None => {
                    let id = arena.push(PresetControl {
                        name: format!("{} {}", config.name(), type_name),
                        type_name: type_name.to_string(),
                        cc: None,
                        physical_key: None,
                        value: full_scale_value(type_name),
                        key: format!("c{}{}", index, type_name),
                        channel: config.key().to_string(),
                        behavior: ControlBehavior::Physical,
                        linked_to: None,
                    });
                    controls.insert(type_name.to_string(), id);
                    id
                }
            };

            arena.controls[virtual_id.0].behavior = ControlBehavior::Virtual { links };
            for target in targets {
                arena.controls[target.0].linked_to = Some(virtual_id);
            }
        }
    }

    PresetChannel {
        key: config.key().to_string(),
        name: config.name().to_string(),
        controls,
    }
}

/// The MIDI CC number of a configured control. 0 means not CC backed.
fn control_cc(control: &config::kit::Control) -> Option<u7> {
    if control.cc() == 0 {
        None
    } else {
        u7::try_from(control.cc())
    }
}

/// The raw value a synthesized aggregate starts at: full volume, centered pan.
fn full_scale_value(type_name: &str) -> f64 {
    match type_name {
        "pan" => 0.0,
        _ => 1.0,
    }
}

fn resolve_key(
    instrument: &str,
    key: &str,
    mappings: &[(String, HashMap<String, u7>)],
) -> Result<u7, GraphError> {
    for (provider, mapping) in mappings {
        if let Some(note) = mapping.get(key) {
            debug!(
                provider = provider.as_str(),
                key,
                note = note.as_int(),
                "Resolved MIDI key."
            );
            return Ok(*note);
        }
    }

    Err(GraphError::UnmappedKey {
        instrument: instrument.to_string(),
        key: key.to_string(),
    })
}

/// Queries every provider's key mapping once, in provider order.
fn fetch_mappings(
    providers: &[Arc<dyn KeyMapping>],
) -> Result<Vec<(String, HashMap<String, u7>)>, GraphError> {
    providers
        .iter()
        .map(|provider| {
            provider
                .keys_mapping()
                .map(|mapping| (provider.name(), mapping))
                .map_err(|e| GraphError::ProviderFailed {
                    provider: provider.name(),
                    message: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::HashMap;
    use std::error::Error;
    use std::sync::Arc;

    use config::{Config, File, FileFormat};
    use midly::num::u7;

    use crate::instrument::Library;
    use crate::kit::error::GraphError;
    use crate::kit::{ControlBehavior, KitPreset};
    use crate::midimap::{KeyMapping, StaticKeyMapping};

    /// Builds a library with a plain kick/snare and a two layer ride.
    pub(crate) fn test_library() -> Result<Library, Box<dyn Error>> {
        let mut configs = HashMap::new();
        for yaml in [
            r#"
            key: kick
            id: 1
            midi_key_name: KICK_KEY
            sound_file: kick.sfz
            controls:
              - type: volume
                key: KICK_VOL
              - type: pan
                key: KICK_PAN
            "#,
            r#"
            key: snare
            id: 2
            midi_key_name: SNARE_KEY
            sound_file: snare.sfz
            controls:
              - type: volume
                key: SNARE_VOL
              - type: pan
                key: SNARE_PAN
              - type: pitch
                key: SNARE_PITCH
            "#,
            r#"
            key: ride
            id: 3
            sound_file: ride20.sfz
            layers:
              - name: bow
                midi_key_name: RIDE_BOW_KEY
                controls:
                  - type: volume
                    key: RIDE_BOW_VOL
                  - type: pan
                    key: RIDE_BOW_PAN
              - name: bell
                midi_key_name: RIDE_BELL_KEY
                controls:
                  - type: volume
                    key: RIDE_BELL_VOL
                  - type: pan
                    key: RIDE_BELL_PAN
            "#,
        ] {
            let config = Config::builder()
                .add_source(File::from_str(yaml, FileFormat::Yaml))
                .build()?
                .try_deserialize::<crate::config::instrument::Instrument>()?;
            configs.insert(config.key().to_string(), config);
        }

        Ok(Library::new(&configs))
    }

    /// A provider mapping the symbolic keys used throughout these tests.
    pub(crate) fn test_provider() -> Arc<dyn KeyMapping> {
        Arc::new(StaticKeyMapping::new(
            "test",
            HashMap::from([
                ("kick".to_string(), u7::from(36)),
                ("snare".to_string(), u7::from(38)),
                ("ride_bow".to_string(), u7::from(51)),
                ("ride_bell".to_string(), u7::from(53)),
            ]),
        ))
    }

    pub(crate) fn parse_kit(yaml: &str) -> Result<crate::config::kit::Kit, Box<dyn Error>> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<crate::config::kit::Kit>()?)
    }

    pub(crate) fn build_kit(yaml: &str) -> Result<KitPreset, Box<dyn Error>> {
        let config = parse_kit(yaml)?;
        Ok(KitPreset::new(
            &config,
            &test_library()?,
            &[test_provider()],
        )?)
    }

    #[test]
    fn stable_keys_and_resolution() -> Result<(), Box<dyn Error>> {
        let kit = build_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
                controls:
                  volume: {value: 0.8}
            instruments:
              - instrument: kick
                channel: drums
                midi_key: kick
                controls:
                  volume: {cc: 30, value: 95}
                  pan: {cc: 10, value: 54}
              - instrument: ride
                channel: drums
                layers:
                  - name: bow
                    midi_key: ride_bow
                    controls:
                      volume: {cc: 40, value: 80}
                  - name: bell
                    midi_key: ride_bell
                    controls:
                      volume: {cc: 41, value: 90}
            "#,
        )?;

        // Physical instrument controls carry their macro keys and notes.
        let kick_volume = kit.control_by_key("i0volume")?;
        assert_eq!(kick_volume.physical_key(), Some("KICK_VOL"));
        assert_eq!(kick_volume.cc(), Some(u7::from(30)));
        assert_eq!(kick_volume.value(), 95.0);
        assert!(!kick_volume.is_virtual());
        assert_eq!(kit.instruments()[0].midi_note(), Some(u7::from(36)));

        // Layer controls are addressed by instrument and layer position.
        let bow_volume = kit.control_by_key("i1l0volume")?;
        assert_eq!(bow_volume.physical_key(), Some("RIDE_BOW_VOL"));
        let bell = &kit.instruments()[1].layers()[1];
        assert_eq!(bell.midi_note(), u7::from(53));
        assert_eq!(bell.midi_key_name(), "RIDE_BELL_KEY");

        // The layered ride gets a synthesized virtual volume over both
        // layers, with construction time baselines.
        let ride_volume = kit.control_by_key("i1volume")?;
        assert!(ride_volume.is_virtual());
        assert!(ride_volume.cc().is_none());
        assert_eq!(ride_volume.value(), 1.0);
        match ride_volume.behavior() {
            ControlBehavior::Virtual { links } => {
                assert_eq!(links.len(), 2);
                assert_eq!(links[0].baseline, 80.0);
                assert_eq!(links[1].baseline, 90.0);
            }
            ControlBehavior::Physical => return Err("expected a virtual control".into()),
        }
        assert_eq!(
            kit.control_by_key("i1l0volume")?.linked_to(),
            kit.instruments()[1].controls().get("volume").copied()
        );

        // Two instruments in the channel: the declared channel volume is
        // promoted to a virtual over both effective instrument volumes.
        let channel_volume = kit.control_by_key("c0volume")?;
        assert!(channel_volume.is_virtual());
        assert_eq!(channel_volume.value(), 0.8);
        match channel_volume.behavior() {
            ControlBehavior::Virtual { links } => {
                assert_eq!(links.len(), 2);
                assert_eq!(links[0].baseline, 95.0);
                assert_eq!(links[1].baseline, 1.0);
            }
            ControlBehavior::Physical => return Err("expected a virtual control".into()),
        }

        // No layers on the ride pan side: the synthesized channel pan links
        // to whatever pans exist. The kick has one, the ride aggregates one.
        let channel_pan = kit.control_by_key("c0pan")?;
        assert!(channel_pan.is_virtual());

        Ok(())
    }

    #[test]
    fn missing_control_aborts_build() -> Result<(), Box<dyn Error>> {
        // The kick definition has no pitch control.
        let result = build_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  pitch: {cc: 20, value: 64}
            "#,
        );

        match result {
            Err(e) => match e.downcast_ref::<GraphError>() {
                Some(GraphError::MissingControl {
                    instrument,
                    control,
                }) => {
                    assert_eq!(instrument, "kick");
                    assert_eq!(control, "pitch");
                    Ok(())
                }
                _ => Err(format!("unexpected error: {}", e).into()),
            },
            Ok(_) => Err("expected the build to fail".into()),
        }
    }

    #[test]
    fn unknown_channel_aborts_build() -> Result<(), Box<dyn Error>> {
        let result = build_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: cymbals
            "#,
        );

        match result {
            Err(e) => match e.downcast_ref::<GraphError>() {
                Some(GraphError::UnknownChannel { channel, .. }) => {
                    assert_eq!(channel, "cymbals");
                    Ok(())
                }
                _ => Err(format!("unexpected error: {}", e).into()),
            },
            Ok(_) => Err("expected the build to fail".into()),
        }
    }

    #[test]
    fn unmapped_midi_key_aborts_build() -> Result<(), Box<dyn Error>> {
        let result = build_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                midi_key: cowbell
            "#,
        );

        match result {
            Err(e) => match e.downcast_ref::<GraphError>() {
                Some(GraphError::UnmappedKey { key, .. }) => {
                    assert_eq!(key, "cowbell");
                    Ok(())
                }
                _ => Err(format!("unexpected error: {}", e).into()),
            },
            Ok(_) => Err("expected the build to fail".into()),
        }
    }

    #[test]
    fn missing_layer_aborts_build() -> Result<(), Box<dyn Error>> {
        let result = build_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: ride
                channel: drums
                layers:
                  - name: edge
                    midi_key: ride_bow
            "#,
        );

        match result {
            Err(e) => match e.downcast_ref::<GraphError>() {
                Some(GraphError::MissingLayer { layer, .. }) => {
                    assert_eq!(layer, "edge");
                    Ok(())
                }
                _ => Err(format!("unexpected error: {}", e).into()),
            },
            Ok(_) => Err("expected the build to fail".into()),
        }
    }

    #[test]
    fn duplicate_channel_key_aborts_build() -> Result<(), Box<dyn Error>> {
        let result = build_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
            "#,
        );

        match result {
            Err(e) => match e.downcast_ref::<GraphError>() {
                Some(GraphError::DuplicateChannel { channel }) => {
                    assert_eq!(channel, "drums");
                    Ok(())
                }
                _ => Err(format!("unexpected error: {}", e).into()),
            },
            Ok(_) => Err("expected the build to fail".into()),
        }
    }

    #[test]
    fn first_matching_provider_wins() -> Result<(), Box<dyn Error>> {
        let first: Arc<dyn KeyMapping> = Arc::new(StaticKeyMapping::new(
            "first",
            HashMap::from([("kick".to_string(), u7::from(35))]),
        ));
        let config = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                midi_key: kick
            "#,
        )?;

        let kit = KitPreset::new(&config, &test_library()?, &[first, test_provider()])?;
        assert_eq!(kit.instruments()[0].midi_note(), Some(u7::from(35)));

        Ok(())
    }

    #[test]
    fn unknown_definition_aborts_build() -> Result<(), Box<dyn Error>> {
        let result = build_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: triangle
                channel: drums
            "#,
        );

        match result {
            Err(e) => match e.downcast_ref::<GraphError>() {
                Some(GraphError::UnknownDefinition { definition, .. }) => {
                    assert_eq!(definition, "triangle");
                    Ok(())
                }
                _ => Err(format!("unexpected error: {}", e).into()),
            },
            Ok(_) => Err("expected the build to fail".into()),
        }
    }
}
