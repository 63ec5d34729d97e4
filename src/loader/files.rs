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
//! Generation of the sampler native control files.
//!
//! The files are plain text, one directive per line: `#define $NAME value`
//! macros, `set_cc$NAME=value` seeds and `#include "path"` directives. One
//! file is generated per instrument, embedding its resolved MIDI keys and
//! control macros before including the base sound definition, and one per
//! channel, defining the shared control limit macros before including the
//! channel's instrument files.
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::kit::{KitPreset, PresetControl, PresetInstrument};

/// Volume floor in dB, referenced by the base sound definitions.
const VOL_MIN: i32 = -60;
/// Volume headroom shift in dB.
const VOL_SHIFT: i32 = 20;
/// Upper pitch range in cents.
const PITCH_MAX: i32 = 1200;
/// Lower pitch range in cents.
const PITCH_MIN: i32 = -1200;

/// Writes the generated instrument and channel files for the kit into the
/// given directory. Returns the channel key to channel file mapping.
pub fn write_kit_files(
    kit: &KitPreset,
    dir: &Path,
) -> Result<HashMap<String, PathBuf>, Box<dyn Error>> {
    fs::create_dir_all(dir)?;

    // Instrument files, tracked per channel in instrument order.
    let mut channel_includes: HashMap<&str, Vec<String>> = HashMap::new();
    for (index, instrument) in kit.instruments().iter().enumerate() {
        let file_name = format!("{:02}-{}.sfz", index, instrument.definition().key());
        let path = dir.join(&file_name);
        fs::write(&path, render_instrument(kit, instrument))?;
        debug!(file = %path.display(), "Wrote instrument file.");

        channel_includes
            .entry(instrument.channel())
            .or_default()
            .push(file_name);
    }

    let mut channel_files: HashMap<String, PathBuf> = HashMap::new();
    for channel in kit.channels() {
        let includes = channel_includes.remove(channel.key()).unwrap_or_default();
        let path = dir.join(format!("{}.sfz", channel.key()));
        fs::write(&path, render_channel(&includes))?;
        debug!(file = %path.display(), "Wrote channel file.");

        channel_files.insert(channel.key().to_string(), path);
    }

    Ok(channel_files)
}

/// Renders the control file of a single instrument.
pub fn render_instrument(kit: &KitPreset, instrument: &PresetInstrument) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let (Some(key_name), Some(note)) = (
        instrument.definition().midi_key_name(),
        instrument.midi_note(),
    ) {
        lines.push(format!("#define ${} {}", key_name, note.as_int()));
    }

    for id in instrument.controls().values() {
        control_lines(kit.control(*id), &mut lines);
    }

    for layer in instrument.layers() {
        lines.push(format!(
            "#define ${} {}",
            layer.midi_key_name(),
            layer.midi_note().as_int()
        ));
        for id in layer.controls().values() {
            control_lines(kit.control(*id), &mut lines);
        }
    }

    lines.push(format!(
        "#include \"{}\"",
        instrument.definition().sound_file()
    ));

    lines.join("\n") + "\n"
}

/// Renders the control file of a channel from its instrument file names.
fn render_channel(includes: &[String]) -> String {
    let mut lines: Vec<String> = vec![
        format!("#define $VOLMIN {}", VOL_MIN),
        format!("#define $VOLSHIFT {}", VOL_SHIFT),
        format!("#define $PITCHMAX {}", PITCH_MAX),
        format!("#define $PITCHMIN {}", PITCH_MIN),
    ];

    for include in includes {
        lines.push(format!("#include \"{}\"", include));
    }

    lines.join("\n") + "\n"
}

/// Emits the macro lines of a single control. CC backed controls export
/// their CC number and seed its value; controls without a CC carry the raw
/// value in the macro itself. Synthesized aggregates have no macro key and
/// nothing to emit.
fn control_lines(control: &PresetControl, lines: &mut Vec<String>) {
    if let Some(key) = control.physical_key() {
        match control.cc() {
            Some(cc) => {
                lines.push(format!("#define ${} {}", key, cc.as_int()));
                lines.push(format!("set_cc${}={:.1}", key, control.value()));
            }
            None => lines.push(format!("#define ${} {}", key, control.value())),
        }
    }
}
