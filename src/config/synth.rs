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
use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use super::parse_duration;
use crate::engine::EngineSettings;
use crate::region::ResolveOptions;

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BLOCK_SIZE: usize = 256;
const DEFAULT_MAX_VOICES: usize = 64;
const DEFAULT_VELOCITY_CURVE: f64 = 2.0;
const DEFAULT_TAIL: Duration = Duration::from_secs(2);

/// A YAML representation of the synth settings. Every field is optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SynthConfig {
    /// The output device name. Uses the host's default output when unset.
    device: Option<String>,

    /// Output sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Frames rendered per block (default: 256).
    block_size: Option<usize>,

    /// Polyphony cap (default: 64).
    max_voices: Option<usize>,

    /// Velocity curve exponent (default: 2.0).
    velocity_curve: Option<f64>,

    /// Peak-normalize decoded samples (default: true).
    normalize_samples: Option<bool>,

    /// Pair linked left/right samples into stereo regions (default: true).
    stereo_pairing: Option<bool>,

    /// How long to keep rendering after the last score event (default: 2s).
    tail: Option<String>,
}

impl SynthConfig {
    /// Deserializes a file from the path into a synth configuration.
    pub fn deserialize(path: &Path) -> Result<SynthConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<SynthConfig>()?)
    }

    /// Loads the configuration at `path`, or the defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<SynthConfig, ConfigError> {
        match path {
            Some(path) => SynthConfig::deserialize(path),
            None => Ok(SynthConfig::default()),
        }
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Block size in frames, never less than one.
    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE).max(1)
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES)
    }

    pub fn velocity_curve(&self) -> f64 {
        self.velocity_curve.unwrap_or(DEFAULT_VELOCITY_CURVE)
    }

    pub fn normalize_samples(&self) -> bool {
        self.normalize_samples.unwrap_or(true)
    }

    pub fn stereo_pairing(&self) -> bool {
        self.stereo_pairing.unwrap_or(true)
    }

    pub fn tail(&self) -> Result<Duration, ConfigError> {
        match &self.tail {
            Some(tail) => parse_duration(tail),
            None => Ok(DEFAULT_TAIL),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            sample_rate: self.sample_rate(),
            max_voices: self.max_voices(),
            velocity_curve: self.velocity_curve(),
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            normalize: self.normalize_samples(),
            stereo_pairing: self.stereo_pairing(),
        }
    }
}
