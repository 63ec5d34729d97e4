// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

use crate::config;

use super::error::{ValidationError, Violation};
use super::ControlType;

/// Validates a kit preset configuration against the structural rules it must
/// satisfy before being loaded or edited. Evaluates the whole preset and
/// accumulates every violation found rather than stopping at the first.
pub fn validate(kit: &config::kit::Kit) -> Result<(), ValidationError> {
    let mut violations: Vec<Violation> = Vec::new();

    let mut per_channel: HashMap<&str, usize> = HashMap::new();
    for instrument in kit.instruments() {
        *per_channel.entry(instrument.channel()).or_default() += 1;
    }

    for (index, channel) in kit.channels().iter().enumerate() {
        for (type_name, control) in channel.controls() {
            check_control(
                format!("channels[{}].controls.{}", index, type_name),
                channel.name(),
                type_name,
                control,
                &mut violations,
            );
        }
    }

    for (index, instrument) in kit.instruments().iter().enumerate() {
        for (type_name, control) in instrument.controls() {
            check_control(
                format!("instruments[{}].controls.{}", index, type_name),
                instrument.name(),
                type_name,
                control,
                &mut violations,
            );
        }
        for (layer_index, layer) in instrument.layers().iter().enumerate() {
            for (type_name, control) in layer.controls() {
                check_control(
                    format!(
                        "instruments[{}].layers[{}].controls.{}",
                        index, layer_index, type_name
                    ),
                    instrument.name(),
                    type_name,
                    control,
                    &mut violations,
                );
            }
        }

        let multi = per_channel
            .get(instrument.channel())
            .copied()
            .unwrap_or_default()
            > 1;

        if instrument.layers().is_empty() {
            // An instrument without layers is mixed through its own volume
            // and pan. Sharing a channel makes both mandatory; either way
            // they must be CC backed to be addressable per instrument.
            for type_name in ["volume", "pan"] {
                match instrument.controls().get(type_name) {
                    Some(control) => {
                        if control.cc() == 0 {
                            violations.push(Violation {
                                field: format!("instruments[{}].controls.{}", index, type_name),
                                message: format!(
                                    "{} control of instrument {} must be driven by a MIDI CC",
                                    type_name,
                                    instrument.name()
                                ),
                            });
                        }
                    }
                    None => {
                        if multi {
                            violations.push(Violation {
                                field: format!("instruments[{}].controls.{}", index, type_name),
                                message: format!(
                                    "instrument {} shares its channel and must declare a {} control",
                                    instrument.name(),
                                    type_name
                                ),
                            });
                        }
                    }
                }
            }
        } else {
            // Layered instruments are protected at the layer level. CC 0 is
            // reserved and disallowed for layer volume and pan.
            for (layer_index, layer) in instrument.layers().iter().enumerate() {
                match layer.controls().get("volume") {
                    Some(control) => {
                        if control.cc() == 0 {
                            violations.push(Violation {
                                field: format!(
                                    "instruments[{}].layers[{}].controls.volume",
                                    index, layer_index
                                ),
                                message: format!(
                                    "volume control of layer {} of instrument {} must use a MIDI CC other than 0",
                                    layer.name(),
                                    instrument.name()
                                ),
                            });
                        }
                    }
                    None => violations.push(Violation {
                        field: format!(
                            "instruments[{}].layers[{}].controls.volume",
                            index, layer_index
                        ),
                        message: format!(
                            "layer {} of instrument {} must declare a volume control",
                            layer.name(),
                            instrument.name()
                        ),
                    }),
                }

                if let Some(control) = layer.controls().get("pan") {
                    if control.cc() == 0 {
                        violations.push(Violation {
                            field: format!(
                                "instruments[{}].layers[{}].controls.pan",
                                index, layer_index
                            ),
                            message: format!(
                                "pan control of layer {} of instrument {} must use a MIDI CC other than 0",
                                layer.name(),
                                instrument.name()
                            ),
                        });
                    }
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

/// Rules every control is subject to regardless of where it sits.
fn check_control(
    field: String,
    owner: &str,
    type_name: &str,
    control: &config::kit::Control,
    violations: &mut Vec<Violation>,
) {
    if ControlType::from_name(type_name).is_none() {
        violations.push(Violation {
            field: field.clone(),
            message: format!("unknown control type {} on {}", type_name, owner),
        });
    }

    if control.cc() > 127 {
        violations.push(Violation {
            field,
            message: format!(
                "MIDI CC {} of control {} on {} is out of range",
                control.cc(),
                type_name,
                owner
            ),
        });
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use crate::kit::graph::test::parse_kit;

    use super::validate;

    #[test]
    fn shared_channel_with_full_controls_passes() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  volume: {cc: 30, value: 95}
                  pan: {cc: 10, value: 54}
              - instrument: snare
                channel: drums
                controls:
                  volume: {cc: 31, value: 90}
                  pan: {cc: 11, value: 70}
            "#,
        )?;

        assert!(validate(&kit).is_ok());
        Ok(())
    }

    #[test]
    fn pan_without_cc_is_one_violation() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  volume: {cc: 30, value: 95}
                  pan: {cc: 10, value: 54}
              - instrument: snare
                channel: drums
                controls:
                  volume: {cc: 31, value: 90}
                  pan: {value: 70}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field, "instruments[1].controls.pan");
        Ok(())
    }

    #[test]
    fn shared_channel_missing_pan_everywhere() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  volume: {cc: 30, value: 95}
              - instrument: snare
                channel: drums
                controls:
                  volume: {cc: 31, value: 90}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        assert_eq!(err.violations().len(), 2);
        assert_eq!(err.violations()[0].field, "instruments[0].controls.pan");
        assert_eq!(err.violations()[1].field, "instruments[1].controls.pan");
        Ok(())
    }

    #[test]
    fn lone_instrument_may_omit_volume_and_pan() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
            "#,
        )?;

        assert!(validate(&kit).is_ok());
        Ok(())
    }

    #[test]
    fn lone_instrument_declared_controls_must_be_cc_backed() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  volume: {value: 0.5}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field, "instruments[0].controls.volume");
        Ok(())
    }

    #[test]
    fn layer_volume_rules() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: ride
                channel: drums
                layers:
                  - name: bow
                    midi_key: ride_bow
                  - name: bell
                    midi_key: ride_bell
                    controls:
                      volume: {value: 90}
                      pan: {cc: 12, value: 64}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        // The bow layer misses volume entirely, the bell layer declares it
        // with the reserved CC 0.
        assert_eq!(err.violations().len(), 2);
        assert_eq!(
            err.violations()[0].field,
            "instruments[0].layers[0].controls.volume"
        );
        assert_eq!(
            err.violations()[1].field,
            "instruments[0].layers[1].controls.volume"
        );
        Ok(())
    }

    #[test]
    fn layer_pan_with_reserved_cc_fails() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: ride
                channel: drums
                layers:
                  - name: bow
                    midi_key: ride_bow
                    controls:
                      volume: {cc: 40, value: 80}
                      pan: {value: 64}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        assert_eq!(err.violations().len(), 1);
        assert_eq!(
            err.violations()[0].field,
            "instruments[0].layers[0].controls.pan"
        );
        Ok(())
    }

    #[test]
    fn layered_instrument_is_exempt_at_instrument_level() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
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
            "#,
        )?;

        // The ride shares the channel but carries layers, so the
        // volume/pan presence rule moves to its layers.
        assert!(validate(&kit).is_ok());
        Ok(())
    }

    #[test]
    fn unknown_control_type_is_named() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  volume: {cc: 30, value: 95}
                  pan: {cc: 10, value: 54}
                  warmth: {cc: 60, value: 64}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field, "instruments[0].controls.warmth");
        assert!(err.violations()[0].message.contains("warmth"));
        Ok(())
    }

    #[test]
    fn out_of_range_cc_is_rejected() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  volume: {cc: 200, value: 95}
                  pan: {cc: 10, value: 54}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        assert_eq!(err.violations().len(), 1);
        assert!(err.violations()[0].message.contains("out of range"));
        Ok(())
    }

    #[test]
    fn error_message_lists_every_violation() -> Result<(), Box<dyn Error>> {
        let kit = parse_kit(
            r#"
            name: Test Kit
            channels:
              - key: drums
            instruments:
              - instrument: kick
                channel: drums
                controls:
                  volume: {cc: 30, value: 95}
              - instrument: snare
                channel: drums
                controls:
                  volume: {cc: 31, value: 90}
            "#,
        )?;

        let err = validate(&kit).expect_err("expected validation to fail");
        let message = format!("{}", err);
        assert!(message.starts_with("kit validation failed: 2 violation(s)"));
        assert!(message.contains("instruments[0].controls.pan"));
        assert!(message.contains("instruments[1].controls.pan"));
        Ok(())
    }
}
