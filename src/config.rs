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

//! YAML configuration for the command line player: synth settings and note scores.

mod error;
mod score;
mod synth;

pub use error::ConfigError;
pub use score::{ControllerChange, Note, Score, TimedCommand};
pub use synth::SynthConfig;

use std::time::Duration;

use duration_string::DurationString;

/// Parses a duration string such as `1.5s` or `250ms`.
fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    DurationString::from_string(value.to_string())
        .map(Into::into)
        .map_err(|e| ConfigError::Duration {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
