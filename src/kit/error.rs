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
use std::fmt;

/// Reference errors encountered while building the control graph. Any of
/// these aborts the whole build: partial graphs are never exposed.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("instrument {instrument} references unknown channel {channel}")]
    UnknownChannel { instrument: String, channel: String },

    #[error("channel key {channel} is declared more than once")]
    DuplicateChannel { channel: String },

    #[error("instrument {instrument} references unknown definition {definition}")]
    UnknownDefinition { instrument: String, definition: String },

    #[error("instrument {instrument} has no {control} control in its definition")]
    MissingControl { instrument: String, control: String },

    #[error("instrument {instrument} has no {layer} layer in its definition")]
    MissingLayer { instrument: String, layer: String },

    #[error("no key mapping provider maps MIDI key {key} for {instrument}")]
    UnmappedKey { instrument: String, key: String },

    #[error("key mapping provider {provider} failed: {message}")]
    ProviderFailed { provider: String, message: String },
}

/// Lookup errors for runtime control addressing. Surfaced to the caller,
/// never silently ignored.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no control with key {0}")]
    UnknownKey(String),

    #[error("no {control_type} control on {owner}")]
    UnknownControl { owner: String, control_type: String },

    #[error("no {0} in kit preset")]
    UnknownOwner(String),
}

/// A single validation rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The path of the offending field within the kit preset.
    pub field: String,
    /// What rule the field violates.
    pub message: String,
}

/// The aggregate result of validating a kit preset: every violation found,
/// in evaluation order, rather than just the first.
#[derive(Debug)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> ValidationError {
        ValidationError { violations }
    }

    /// Gets the violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kit validation failed: {} violation(s)",
            self.violations.len()
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}: {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
