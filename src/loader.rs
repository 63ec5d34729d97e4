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
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config;
use crate::instrument::Library;
use crate::kit::{validate, ControlType, KitPreset};
use crate::midimap::KeyMapping;
use crate::sampler::{ChannelId, Sampler};

pub mod files;

/// The sampler I/O devices kits are played through.
pub struct Devices {
    /// The audio output driver name.
    pub audio_driver: String,
    /// Driver specific audio output parameters.
    pub audio_params: HashMap<String, String>,
    /// The MIDI input driver name.
    pub midi_driver: String,
    /// Driver specific MIDI input parameters.
    pub midi_params: HashMap<String, String>,
}

/// Loads kit presets into the sampler: builds the control graph, provisions
/// devices, materializes the generated instrument and channel files and
/// creates one sampler channel per preset channel. Failures abort the load;
/// already created sampler channels are left as-is.
pub struct Loader {
    /// The kit presets known to the loader, by name.
    kits: HashMap<String, config::kit::Kit>,
    /// The instrument definitions referenced by the kits.
    library: Library,
    /// The MIDI key mapping providers, in query order.
    key_mappings: Vec<Arc<dyn KeyMapping>>,
    /// The sampler connector.
    sampler: Arc<Mutex<Box<dyn Sampler>>>,
    /// The device configuration to provision.
    devices: Devices,
    /// Where generated files are written.
    output_dir: PathBuf,
}

impl Loader {
    /// Creates a new loader.
    pub fn new(
        kits: HashMap<String, config::kit::Kit>,
        library: Library,
        key_mappings: Vec<Arc<dyn KeyMapping>>,
        sampler: Box<dyn Sampler>,
        devices: Devices,
        output_dir: PathBuf,
    ) -> Loader {
        Loader {
            kits,
            library,
            key_mappings,
            sampler: Arc::new(Mutex::new(sampler)),
            devices,
            output_dir,
        }
    }

    /// Loads the named kit preset into the sampler and returns the loaded
    /// kit for runtime control dispatch.
    pub fn load(&mut self, name: &str) -> Result<LoadedKit, Box<dyn Error>> {
        let config = self
            .kits
            .get(name)
            .ok_or_else(|| format!("no kit preset named {}", name))?;

        validate::validate(config)?;
        let kit = KitPreset::new(config, &self.library, &self.key_mappings)?;

        let mut sampler = self.sampler.lock().expect("unable to get sampler lock");
        let audio_device =
            sampler.connect_audio_output(&self.devices.audio_driver, &self.devices.audio_params)?;
        let midi_device =
            sampler.connect_midi_input(&self.devices.midi_driver, &self.devices.midi_params)?;

        let channel_files = files::write_kit_files(&kit, &self.output_dir)?;

        let mut channels: HashMap<String, ChannelId> = HashMap::new();
        for (channel, channel_config) in kit.channels().iter().zip(config.channels()) {
            let file = channel_files
                .get(channel.key())
                .ok_or_else(|| format!("no generated file for channel {}", channel.key()))?;
            let channel_id = sampler.create_channel(audio_device, midi_device, file)?;

            // Seed the initial channel volume when the channel declares a
            // volume control that is not CC backed.
            if channel_config.controls().contains_key("volume") {
                if let Some(id) = channel.controls().get("volume") {
                    let control = kit.control(*id);
                    if control.cc().is_none()
                        && control.control_type() == Some(ControlType::Volume)
                    {
                        sampler.set_channel_volume(channel_id, control.value())?;
                    }
                }
            }

            channels.insert(channel.key().to_string(), channel_id);
        }
        drop(sampler);

        info!(
            kit = name,
            channels = channels.len(),
            "Loaded kit preset."
        );

        Ok(LoadedKit {
            kit,
            channels,
            sampler: Arc::clone(&self.sampler),
        })
    }
}

/// A kit preset loaded into the sampler: the resolved control graph plus the
/// sampler channels serving it. Runtime control changes go through
/// [LoadedKit::set_control]; callers serialize these per loaded kit.
pub struct LoadedKit {
    kit: KitPreset,
    channels: HashMap<String, ChannelId>,
    sampler: Arc<Mutex<Box<dyn Sampler>>>,
}

impl LoadedKit {
    /// Gets the control graph of the loaded kit.
    pub fn kit(&self) -> &KitPreset {
        &self.kit
    }

    /// Gets the channel key to sampler channel mapping.
    pub fn channels(&self) -> &HashMap<String, ChannelId> {
        &self.channels
    }

    /// Sets the control addressed by the given stable key to the given unit
    /// value.
    pub fn set_control(&mut self, key: &str, unit: f64) -> Result<(), Box<dyn Error>> {
        let mut sampler = self.sampler.lock().expect("unable to get sampler lock");
        self.kit
            .set_control(key, unit, &self.channels, &mut **sampler)
    }
}
