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
use std::sync::Arc;
use std::{error::Error, fmt};

use midly::num::u7;

use crate::config;

/// A provider of a MIDI device key mapping: which MIDI note each symbolic
/// key name of the device triggers. Providers are queried in order during
/// graph construction; the first mapping containing a key wins.
pub trait KeyMapping: fmt::Display + Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> String;

    /// Returns the symbolic key to MIDI note mapping.
    fn keys_mapping(&self) -> Result<HashMap<String, u7>, Box<dyn Error>>;
}

/// A key mapping backed by a fixed map, typically parsed from a device key
/// map file.
pub struct StaticKeyMapping {
    name: String,
    keys: HashMap<String, u7>,
}

impl StaticKeyMapping {
    /// Creates a key mapping from a name and a fixed map.
    pub fn new(name: &str, keys: HashMap<String, u7>) -> StaticKeyMapping {
        StaticKeyMapping {
            name: name.to_string(),
            keys,
        }
    }

    /// Creates a key mapping from a device key map configuration.
    pub fn from_config(config: &config::keymap::KeyMap) -> Result<StaticKeyMapping, Box<dyn Error>> {
        Ok(StaticKeyMapping {
            name: config.name().to_string(),
            keys: config.keys()?,
        })
    }
}

impl KeyMapping for StaticKeyMapping {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn keys_mapping(&self) -> Result<HashMap<String, u7>, Box<dyn Error>> {
        Ok(self.keys.clone())
    }
}

impl fmt::Display for StaticKeyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} keys)", self.name, self.keys.len())
    }
}

/// The General MIDI percussion key map. Used as the fallback provider when
/// no device specific map claims a symbolic key.
pub struct GeneralMidi {}

const GENERAL_MIDI_KEYS: &[(&str, u8)] = &[
    ("kick_2", 35),
    ("kick", 36),
    ("side_stick", 37),
    ("snare", 38),
    ("clap", 39),
    ("snare_2", 40),
    ("floor_tom_2", 41),
    ("hihat_closed", 42),
    ("floor_tom", 43),
    ("hihat_pedal", 44),
    ("tom_3", 45),
    ("hihat_open", 46),
    ("tom_2", 47),
    ("tom_1", 48),
    ("crash", 49),
    ("tom_high", 50),
    ("ride_bow", 51),
    ("china", 52),
    ("ride_bell", 53),
    ("tambourine", 54),
    ("splash", 55),
    ("cowbell", 56),
    ("crash_2", 57),
    ("ride_2", 59),
];

impl KeyMapping for GeneralMidi {
    fn name(&self) -> String {
        "general-midi".to_string()
    }

    fn keys_mapping(&self) -> Result<HashMap<String, u7>, Box<dyn Error>> {
        GENERAL_MIDI_KEYS
            .iter()
            .map(|(key, note)| match u7::try_from(*note) {
                Some(note) => Ok((key.to_string(), note)),
                None => Err(format!("invalid General MIDI note {}", note).into()),
            })
            .collect()
    }
}

impl fmt::Display for GeneralMidi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "General MIDI percussion")
    }
}

/// Builds the provider list from parsed device key maps, in order, with the
/// General MIDI percussion map as the final fallback.
pub fn providers(
    keymaps: &[config::keymap::KeyMap],
) -> Result<Vec<Arc<dyn KeyMapping>>, Box<dyn Error>> {
    let mut providers: Vec<Arc<dyn KeyMapping>> = Vec::new();
    for keymap in keymaps {
        providers.push(Arc::new(StaticKeyMapping::from_config(keymap)?));
    }
    providers.push(Arc::new(GeneralMidi {}));
    Ok(providers)
}
