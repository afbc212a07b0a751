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
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::error::ConfigError;
use super::parse_duration;
use crate::engine::{Command, Controllers};

const DEFAULT_VELOCITY: u8 = 100;

/// A YAML representation of a score: timed notes plus optional controller changes.
#[derive(Deserialize, Clone, Debug)]
pub struct Score {
    /// The notes to play.
    notes: Vec<Note>,
    /// Controller changes. Unset values carry over from the previous change.
    #[serde(default)]
    controllers: Vec<ControllerChange>,
}

/// A single note.
#[derive(Deserialize, Clone, Debug)]
pub struct Note {
    /// Start time, as a duration string.
    at: String,
    /// How long the note is held.
    length: String,
    /// MIDI note number.
    note: u8,
    /// MIDI velocity (default: 100).
    velocity: Option<u8>,
}

/// A controller change.
#[derive(Deserialize, Clone, Debug)]
pub struct ControllerChange {
    at: String,
    volume: Option<u8>,
    pan: Option<u8>,
    expression: Option<u8>,
}

/// A command scheduled at an output frame.
#[derive(Debug, Clone)]
pub struct TimedCommand {
    pub frame: u64,
    pub command: Command,
}

impl Score {
    /// Reads a score from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Score, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Score::parse(&contents)
    }

    pub fn parse(yaml: &str) -> Result<Score, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Flattens the score into commands ordered by frame. At the same frame, note-offs
    /// come first, then controller changes, then note-ons.
    pub fn commands(&self, sample_rate: u32) -> Result<Vec<TimedCommand>, ConfigError> {
        let frame =
            |duration: Duration| (duration.as_secs_f64() * sample_rate as f64).round() as u64;
        let mut commands: Vec<(u8, TimedCommand)> = Vec::new();

        for note in &self.notes {
            if note.note > 127 {
                return Err(ConfigError::Invalid(format!(
                    "note {} is outside 0..=127",
                    note.note
                )));
            }
            let velocity = note.velocity.unwrap_or(DEFAULT_VELOCITY).min(127);
            let start = parse_duration(&note.at)?;
            let length = parse_duration(&note.length)?;
            commands.push((
                2,
                TimedCommand {
                    frame: frame(start),
                    command: Command::NoteOn {
                        note: note.note,
                        velocity,
                    },
                },
            ));
            commands.push((
                0,
                TimedCommand {
                    frame: frame(start + length),
                    command: Command::NoteOff { note: note.note },
                },
            ));
        }

        let mut changes = self
            .controllers
            .iter()
            .map(|change| parse_duration(&change.at).map(|at| (at, change)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        changes.sort_by_key(|(at, _)| *at);

        let mut current = Controllers::default();
        for (at, change) in changes {
            current = Controllers {
                volume: change.volume.unwrap_or(current.volume).min(127),
                pan: change.pan.unwrap_or(current.pan).min(127),
                expression: change.expression.unwrap_or(current.expression).min(127),
            };
            commands.push((
                1,
                TimedCommand {
                    frame: frame(at),
                    command: Command::SetControllers(current),
                },
            ));
        }

        commands.sort_by_key(|(priority, timed)| (timed.frame, *priority));
        Ok(commands.into_iter().map(|(_, timed)| timed).collect())
    }
}
