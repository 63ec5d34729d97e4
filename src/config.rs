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
use std::fs;
use std::path::PathBuf;

use tracing::error;

pub mod error;
pub mod instrument;
pub mod keymap;
pub mod kit;

/// Recurse into the given path and return all valid kit presets found,
/// keyed by kit name.
pub fn get_all_kits(path: &PathBuf) -> Result<HashMap<String, kit::Kit>, Box<dyn Error>> {
    let mut kits: HashMap<String, kit::Kit> = HashMap::new();
    for path in yaml_files(path)? {
        match kit::Kit::deserialize(&path) {
            Ok(kit) => {
                kits.insert(kit.name().to_string(), kit);
            }
            Err(e) => error!(err = %e, "Error while parsing kit file"),
        }
    }

    Ok(kits)
}

/// Recurse into the given path and return all valid instrument definitions
/// found, keyed by definition key.
pub fn get_all_instruments(
    path: &PathBuf,
) -> Result<HashMap<String, instrument::Instrument>, Box<dyn Error>> {
    let mut instruments: HashMap<String, instrument::Instrument> = HashMap::new();
    for path in yaml_files(path)? {
        match instrument::Instrument::deserialize(&path) {
            Ok(instrument) => {
                instruments.insert(instrument.key().to_string(), instrument);
            }
            Err(e) => error!(err = %e, "Error while parsing instrument file"),
        }
    }

    Ok(instruments)
}

/// Recurse into the given path and return all valid device key maps found,
/// in path order.
pub fn get_all_keymaps(path: &PathBuf) -> Result<Vec<keymap::KeyMap>, Box<dyn Error>> {
    let mut keymaps: Vec<keymap::KeyMap> = Vec::new();
    for path in yaml_files(path)? {
        match keymap::KeyMap::deserialize(&path) {
            Ok(keymap) => keymaps.push(keymap),
            Err(e) => error!(err = %e, "Error while parsing key map file"),
        }
    }

    Ok(keymaps)
}

/// Recurse into the given path and collect every YAML file, sorted so that
/// repeated runs see the same order.
fn yaml_files(path: &PathBuf) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            files.extend(yaml_files(&path)?);
        }

        let extension = path.extension();
        if extension.is_some_and(|ext| ext == "yaml" || ext == "yml") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
