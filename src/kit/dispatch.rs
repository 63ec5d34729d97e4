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

use midly::num::u7;
use tracing::debug;

use crate::sampler::{ChannelId, Sampler};

use super::error::LookupError;
use super::normalize;
use super::{ControlBehavior, ControlId, ControlType, KitPreset};

impl KitPreset {
    /// Sets the control addressed by the given stable key to the given unit
    /// value and dispatches the resulting commands through the sampler,
    /// addressed via the channel key to sampler channel map from loading.
    /// Stored raw values only change once the matching connector call has
    /// succeeded.
    pub fn set_control(
        &mut self,
        key: &str,
        unit: f64,
        channels: &HashMap<String, ChannelId>,
        sampler: &mut dyn Sampler,
    ) -> Result<(), Box<dyn Error>> {
        let id = *self
            .by_key
            .get(key)
            .ok_or_else(|| LookupError::UnknownKey(key.to_string()))?;

        let control = &self.controls[id.0];
        let raw = normalize::denormalize(
            control.control_type().unwrap_or(ControlType::Other),
            control.cc.is_some(),
            unit,
        );

        self.apply_raw(id, raw, channels, sampler)
    }

    /// Applies a raw value to a control. Physical controls forward a single
    /// command to the sampler. Virtual controls scale each linked baseline
    /// by the requested position's fraction of full scale, preserving the
    /// relative balance of the linked targets, and recurse: a channel
    /// aggregate may drive an instrument aggregate which drives its layers.
    fn apply_raw(
        &mut self,
        id: ControlId,
        raw: f64,
        channels: &HashMap<String, ChannelId>,
        sampler: &mut dyn Sampler,
    ) -> Result<(), Box<dyn Error>> {
        match self.controls[id.0].behavior.clone() {
            ControlBehavior::Physical => self.forward_raw(id, raw, channels, sampler),
            ControlBehavior::Virtual { links } => {
                let control = &self.controls[id.0];
                let scale = normalize::full_scale_fraction(
                    control.control_type().unwrap_or(ControlType::Other),
                    control.cc.is_some(),
                    raw,
                );

                for link in links {
                    let target = &self.controls[link.control.0];
                    let target_raw = if target.cc.is_some() {
                        (link.baseline * scale).round().clamp(0.0, normalize::CC_MAX)
                    } else {
                        link.baseline * scale
                    };
                    self.apply_raw(link.control, target_raw, channels, sampler)?;
                }

                self.controls[id.0].value = raw;
                Ok(())
            }
        }
    }

    /// Forwards the raw value of a physical control to the sampler and, on
    /// success, stores it.
    fn forward_raw(
        &mut self,
        id: ControlId,
        raw: f64,
        channels: &HashMap<String, ChannelId>,
        sampler: &mut dyn Sampler,
    ) -> Result<(), Box<dyn Error>> {
        let control = &self.controls[id.0];
        let channel_id = *channels
            .get(&control.channel)
            .ok_or_else(|| format!("no sampler channel for channel key {}", control.channel))?;

        match control.cc {
            Some(cc) => {
                let value = u7::try_from(raw.clamp(0.0, normalize::CC_MAX) as u8)
                    .ok_or("raw CC value out of range")?;
                sampler.send_midi_cc(channel_id, cc, value)?;
            }
            None => match control.control_type() {
                Some(ControlType::Volume) => sampler.set_channel_volume(channel_id, raw)?,
                _ => {
                    return Err(format!(
                        "control {} is not CC backed and has no dispatch target",
                        control.key
                    )
                    .into())
                }
            },
        }

        debug!(control = control.key.as_str(), raw, "Dispatched control value.");
        self.controls[id.0].value = raw;
        Ok(())
    }
}
