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

//! Fully resolved playback descriptors.
//!
//! A [`Region`] is everything the voice engine needs to play one sample for one key and
//! velocity window of a preset: decoded audio, loop points, pitch, amplitude, envelope,
//! LFO and filter parameters. Regions are built once by the [resolver](build_regions) and
//! never change afterwards.

mod resolver;

use std::sync::Arc;

use crate::bank::Range;
use crate::convert::{lfo_cents_to_hz, timecents_to_seconds};
use crate::dsp::EnvelopeTimes;

pub use resolver::{build_regions, ResolveError, ResolveOptions, SkipReason};

/// A shared, immutable set of regions for one preset.
pub type RegionSet = Arc<[Region]>;

/// Loop behaviour of a region's sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play once from start to end.
    #[default]
    None,
    /// Loop for as long as the voice sounds.
    Continuous,
    /// Loop until note-off, then play the remainder of the sample.
    UntilRelease,
}

impl LoopMode {
    /// Interprets the `sampleModes` generator. Mode 2 is reserved and plays unlooped.
    pub fn from_sample_modes(value: i32) -> Self {
        match value & 0b11 {
            1 => LoopMode::Continuous,
            3 => LoopMode::UntilRelease,
            _ => LoopMode::None,
        }
    }
}

/// Decoded sample audio. Mono regions carry only `left`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub left: Arc<[f32]>,
    pub right: Option<Arc<[f32]>>,
    /// Native sample rate of the audio in Hz.
    pub sample_rate: u32,
}

impl SampleData {
    pub fn mono(data: Arc<[f32]>, sample_rate: u32) -> Self {
        SampleData {
            left: data,
            right: None,
            sample_rate,
        }
    }

    pub fn stereo(left: Arc<[f32]>, right: Arc<[f32]>, sample_rate: u32) -> Self {
        SampleData {
            left,
            right: Some(right),
            sample_rate,
        }
    }

    /// Playable length in frames. A stereo pair plays for the shorter of its two halves.
    pub fn len(&self) -> usize {
        match &self.right {
            Some(right) => self.left.len().min(right.len()),
            None => self.left.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }
}

/// Envelope parameters as stored on a region. Times are in timecents; the sustain level has
/// already been converted to a linear [0, 1] level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub delay: f64,
    pub attack: f64,
    pub hold: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    /// Timecents added to hold per key below middle C.
    pub key_to_hold: f64,
    /// Timecents added to decay per key below middle C.
    pub key_to_decay: f64,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        EnvelopeParams {
            delay: -12000.0,
            attack: -12000.0,
            hold: -12000.0,
            decay: -12000.0,
            sustain: 1.0,
            release: -12000.0,
            key_to_hold: 0.0,
            key_to_decay: 0.0,
        }
    }
}

impl EnvelopeParams {
    /// Converts to stage durations in seconds for a voice triggered on `key`.
    pub fn times(&self, key: u8) -> EnvelopeTimes {
        let key_offset = 60.0 - key as f64;
        EnvelopeTimes {
            delay: timecents_to_seconds(self.delay),
            attack: timecents_to_seconds(self.attack),
            hold: timecents_to_seconds(self.hold + self.key_to_hold * key_offset),
            decay: timecents_to_seconds(self.decay + self.key_to_decay * key_offset),
            sustain: self.sustain,
            release: timecents_to_seconds(self.release),
        }
    }
}

/// LFO parameters: frequency in absolute cents, start delay in timecents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoParams {
    pub frequency: f64,
    pub delay: f64,
}

impl Default for LfoParams {
    fn default() -> Self {
        LfoParams {
            frequency: 0.0,
            delay: -12000.0,
        }
    }
}

impl LfoParams {
    pub fn frequency_hz(&self) -> f64 {
        lfo_cents_to_hz(self.frequency)
    }

    pub fn delay_seconds(&self) -> f64 {
        timecents_to_seconds(self.delay)
    }
}

/// Low-pass filter parameters, all in cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub initial_cutoff: f64,
    pub mod_env_depth: f64,
    pub mod_lfo_depth: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams {
            initial_cutoff: 13500.0,
            mod_env_depth: 0.0,
            mod_lfo_depth: 0.0,
        }
    }
}

/// Pitch parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchParams {
    /// Root key from the sample header.
    pub original_key: u8,
    /// Root key override, or `None` to use `original_key`.
    pub override_key: Option<u8>,
    /// Semitones.
    pub coarse_tune: f64,
    /// Cents.
    pub fine_tune: f64,
    /// Cents from the sample header's pitch correction.
    pub correction: f64,
    /// Cents of pitch change per key.
    pub scale_tuning: f64,
    /// Fixed key used for pitch tracking instead of the played note.
    pub fixed_key: Option<u8>,
    /// Modulation depths in cents.
    pub mod_lfo_to_pitch: f64,
    pub vib_lfo_to_pitch: f64,
    pub mod_env_to_pitch: f64,
}

impl Default for PitchParams {
    fn default() -> Self {
        PitchParams {
            original_key: 60,
            override_key: None,
            coarse_tune: 0.0,
            fine_tune: 0.0,
            correction: 0.0,
            scale_tuning: 100.0,
            fixed_key: None,
            mod_lfo_to_pitch: 0.0,
            vib_lfo_to_pitch: 0.0,
            mod_env_to_pitch: 0.0,
        }
    }
}

impl PitchParams {
    /// The key the sample sounds at its native pitch.
    pub fn root_key(&self) -> u8 {
        self.override_key.unwrap_or(self.original_key)
    }

    /// Static tuning offset in cents.
    pub fn tune_cents(&self) -> f64 {
        self.coarse_tune * 100.0 + self.fine_tune + self.correction
    }

    /// Key-tracking offset in cents for `note`.
    pub fn key_track_cents(&self, note: u8) -> f64 {
        let key = self.fixed_key.unwrap_or(note);
        (key as f64 - self.root_key() as f64) * self.scale_tuning
    }
}

/// A resolved, ready-to-play region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub key_range: Range,
    pub vel_range: Range,
    pub sample: SampleData,
    loop_mode: LoopMode,
    loop_start: usize,
    loop_end: usize,
    pub pitch: PitchParams,
    /// Initial attenuation in centibels.
    pub attenuation: f64,
    /// Pan in [-500, 500].
    pub pan: f64,
    /// Tremolo depth from the modulation LFO, in centibels.
    pub mod_lfo_to_volume: f64,
    pub volume_envelope: EnvelopeParams,
    pub mod_envelope: EnvelopeParams,
    pub mod_lfo: LfoParams,
    pub vib_lfo: LfoParams,
    pub filter: FilterParams,
    /// Exclusive class, 0 for none.
    pub exclusive_class: u16,
    /// Fixed velocity used instead of the played velocity.
    pub fixed_velocity: Option<u8>,
}

impl Region {
    /// Creates an unlooped, full-range region with neutral parameters.
    pub fn new(sample: SampleData) -> Self {
        let len = sample.len();
        Region {
            key_range: Range::FULL,
            vel_range: Range::FULL,
            sample,
            loop_mode: LoopMode::None,
            loop_start: 0,
            loop_end: len,
            pitch: PitchParams::default(),
            attenuation: 0.0,
            pan: 0.0,
            mod_lfo_to_volume: 0.0,
            volume_envelope: EnvelopeParams::default(),
            mod_envelope: EnvelopeParams::default(),
            mod_lfo: LfoParams::default(),
            vib_lfo: LfoParams::default(),
            filter: FilterParams::default(),
            exclusive_class: 0,
            fixed_velocity: None,
        }
    }

    /// Sets the loop. Loop points are local frame offsets clamped to the sample. A loop
    /// shorter than two frames disables looping and resets the points to the whole sample.
    pub fn set_loop(&mut self, mode: LoopMode, start: usize, end: usize) {
        let len = self.sample.len();
        let start = start.min(len);
        let end = end.min(len);
        if mode == LoopMode::None || end <= start + 1 {
            self.loop_mode = LoopMode::None;
            self.loop_start = 0;
            self.loop_end = len;
        } else {
            self.loop_mode = mode;
            self.loop_start = start;
            self.loop_end = end;
        }
    }

    pub fn with_loop(mut self, mode: LoopMode, start: usize, end: usize) -> Self {
        self.set_loop(mode, start, end);
        self
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn loop_start(&self) -> usize {
        self.loop_start
    }

    pub fn loop_end(&self) -> usize {
        self.loop_end
    }

    /// True if a note-on with this key and velocity should play this region.
    pub fn matches(&self, note: u8, velocity: u8) -> bool {
        self.key_range.contains(note) && self.vel_range.contains(velocity)
    }
}
