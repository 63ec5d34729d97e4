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
use std::{error::Error, path::Path};

use config::{Config, File};
use midly::num::u7;
use serde::Deserialize;

use super::error::ConfigError;

/// A YAML representation of a MIDI device key map: which MIDI note each
/// symbolic key name of the device triggers.
#[derive(Deserialize)]
pub struct KeyMap {
    /// The name of the device the key map belongs to.
    name: String,
    /// Symbolic key name to MIDI note.
    keys: HashMap<String, u8>,
}

impl KeyMap {
    /// Deserializes a file from the path into a key map struct.
    pub fn deserialize(path: &Path) -> Result<KeyMap, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<KeyMap>()?)
    }

    /// Gets the name of the device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the symbolic key to MIDI note mapping.
    pub fn keys(&self) -> Result<HashMap<String, u7>, Box<dyn Error>> {
        self.keys
            .iter()
            .map(|(key, note)| Ok((key.clone(), parse_u7(*note)?)))
            .collect()
    }
}

/// Parses a raw u7 value.
fn parse_u7(raw: u8) -> Result<u7, Box<dyn Error>> {
    match u7::try_from(raw) {
        Some(val) => Ok(val),
        None => Err(format!("error parsing u7 value: {} is invalid", raw).into()),
    }
}
