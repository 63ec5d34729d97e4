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
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};

use dkit::instrument::Library;
use dkit::kit::validate;
use dkit::kit::KitPreset;
use dkit::{config, loader, midimap};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A drum kit preset manager."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the instrument definitions in the given directory.
    Instruments {
        /// The path to the instrument definitions on disk.
        path: String,
    },
    /// Lists and validates the kit presets in the given directory.
    Kits {
        /// The path to the kit presets on disk.
        path: String,
    },
    /// Lists the device key maps in the given directory.
    Keymaps {
        /// The path to the device key maps on disk.
        path: String,
    },
    /// Builds the control graph of a kit preset offline and materializes its
    /// instrument and channel files.
    Render {
        /// The path to the instrument definitions on disk.
        instruments_path: String,
        /// The path to the kit preset file.
        kit_path: String,
        /// The directory to write the generated files to.
        output_path: String,
        /// The path to device key maps to resolve MIDI keys with. The
        /// General MIDI percussion map is always consulted last.
        #[arg[short, long]]
        keymaps_path: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Instruments { path } => {
            let library = Library::new(&config::get_all_instruments(&PathBuf::from(&path))?);

            if library.is_empty() {
                println!("No instrument definitions found in {}.", path.as_str());
                return Ok(());
            }

            println!("Instrument definitions (count: {}):", library.len());
            for definition in library.sorted_list() {
                println!("- {}", definition);
            }
        }
        Commands::Kits { path } => {
            let kits = config::get_all_kits(&PathBuf::from(&path))?;

            if kits.is_empty() {
                println!("No kit presets found in {}.", path.as_str());
                return Ok(());
            }

            let mut names: Vec<&String> = kits.keys().collect();
            names.sort();

            println!("Kit presets (count: {}):", kits.len());
            for name in names {
                let kit = &kits[name];
                match validate::validate(kit) {
                    Ok(()) => println!(
                        "- {} (channels: {}, instruments: {})",
                        name,
                        kit.channels().len(),
                        kit.instruments().len()
                    ),
                    Err(e) => println!("- {} (invalid)\n  {}", name, e),
                }
            }
        }
        Commands::Keymaps { path } => {
            let keymaps = config::get_all_keymaps(&PathBuf::from(&path))?;

            if keymaps.is_empty() {
                println!("No device key maps found in {}.", path.as_str());
                return Ok(());
            }

            println!("Device key maps (count: {}):", keymaps.len());
            for keymap in keymaps {
                println!("- {} (keys: {})", keymap.name(), keymap.keys()?.len());
            }
        }
        Commands::Render {
            instruments_path,
            kit_path,
            output_path,
            keymaps_path,
        } => {
            let library =
                Library::new(&config::get_all_instruments(&PathBuf::from(instruments_path))?);
            let keymaps = match keymaps_path {
                Some(path) => config::get_all_keymaps(&PathBuf::from(path))?,
                None => Vec::new(),
            };
            let key_mappings = midimap::providers(&keymaps)?;

            let kit_config = config::kit::Kit::deserialize(&PathBuf::from(&kit_path))?;
            validate::validate(&kit_config)?;
            let kit = KitPreset::new(&kit_config, &library, &key_mappings)?;

            let channel_files = loader::files::write_kit_files(&kit, &PathBuf::from(output_path))?;

            let mut channels: Vec<&String> = channel_files.keys().collect();
            channels.sort();

            println!("Rendered kit {} (channels: {}):", kit.name(), channels.len());
            for channel in channels {
                println!("- {}: {}", channel, channel_files[channel].display());
            }
        }
    }

    Ok(())
}
