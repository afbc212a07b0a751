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
use super::{Controllers, DspBackend, EngineSettings};
use crate::convert::{
    attenuation_cb_to_linear, cents_to_ratio, filter_cutoff_cents_to_hz, pan_to_gains,
    velocity_to_linear,
};
use crate::dsp::{Channel, Envelope, Lfo, LowPass};
use crate::region::{LoopMode, Region};

/// One sounding instance of a region.
#[derive(Debug, Clone)]
pub struct Voice {
    /// Index of the region in the engine's current region set.
    region: usize,
    /// The note that triggered this voice, for note-off matching.
    note: u8,
    exclusive_class: u16,
    volume_env: Envelope,
    mod_env: Envelope,
    mod_lfo: Lfo,
    vib_lfo: Lfo,
    filter: LowPass,
    /// Cutoff in cents the filter coefficients were last designed for.
    cutoff: Option<f64>,
    /// Fractional read position in frames.
    position: f64,
    /// Playback rate before pitch modulation.
    base_rate: f64,
    /// Velocity curve times initial attenuation.
    static_gain: f64,
    pan: f64,
    gains: (f64, f64),
    released: bool,
    finished: bool,
}

impl Voice {
    /// Starts a voice for `region` triggered by `note` at `velocity`.
    pub fn new(
        index: usize,
        region: &Region,
        note: u8,
        velocity: u8,
        settings: &EngineSettings,
        controllers: &Controllers,
    ) -> Self {
        let sample_rate = settings.sample_rate as f64;
        let velocity = region.fixed_velocity.unwrap_or(velocity);
        let key = region.pitch.fixed_key.unwrap_or(note);

        let mut volume_env = Envelope::volume(sample_rate, region.volume_envelope.times(key));
        let mut mod_env = Envelope::modulation(sample_rate, region.mod_envelope.times(key));
        volume_env.note_on();
        mod_env.note_on();

        let pitch_cents = region.pitch.key_track_cents(note) + region.pitch.tune_cents();
        let base_rate =
            cents_to_ratio(pitch_cents) * region.sample.sample_rate as f64 / sample_rate;

        let mut voice = Voice {
            region: index,
            note,
            exclusive_class: region.exclusive_class,
            volume_env,
            mod_env,
            mod_lfo: Lfo::new(
                sample_rate,
                region.mod_lfo.frequency_hz(),
                region.mod_lfo.delay_seconds(),
            ),
            vib_lfo: Lfo::new(
                sample_rate,
                region.vib_lfo.frequency_hz(),
                region.vib_lfo.delay_seconds(),
            ),
            filter: LowPass::default(),
            cutoff: None,
            position: 0.0,
            base_rate,
            static_gain: velocity_to_linear(velocity as f64, settings.velocity_curve)
                * attenuation_cb_to_linear(region.attenuation),
            pan: region.pan,
            gains: (0.0, 0.0),
            released: false,
            finished: !base_rate.is_finite(),
        };
        voice.update_pan(controllers);
        voice
    }

    pub fn region(&self) -> usize {
        self.region
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn exclusive_class(&self) -> u16 {
        self.exclusive_class
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn volume_envelope(&self) -> &Envelope {
        &self.volume_env
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// True once the voice can be removed from the pool.
    pub fn is_done(&self) -> bool {
        self.finished || self.volume_env.is_idle()
    }

    /// Current loudness, used to pick a voice to steal.
    pub fn loudness(&self) -> f64 {
        self.volume_env.level() * self.static_gain
    }

    /// Releases both envelopes and, for release-tail loops, stops looping.
    pub fn note_off(&mut self) {
        self.released = true;
        self.volume_env.note_off();
        self.mod_env.note_off();
    }

    /// Recomputes the pan gains after a controller change.
    pub fn update_pan(&mut self, controllers: &Controllers) {
        self.gains = pan_to_gains(self.pan + controllers.pan_offset());
    }

    fn is_looping(&self, mode: LoopMode) -> bool {
        match mode {
            LoopMode::None => false,
            LoopMode::Continuous => true,
            LoopMode::UntilRelease => !self.released,
        }
    }

    /// Renders one stereo frame and advances the voice.
    pub fn render<B: DspBackend>(
        &mut self,
        region: &Region,
        backend: &B,
        sample_rate: f64,
        controller_gain: f64,
    ) -> (f64, f64) {
        let mod_env = self.mod_env.next();
        let mod_lfo = self.mod_lfo.next();
        let vib_lfo = self.vib_lfo.next();

        let pitch = &region.pitch;
        let modulation = vib_lfo * pitch.vib_lfo_to_pitch
            + mod_lfo * pitch.mod_lfo_to_pitch
            + mod_env * pitch.mod_env_to_pitch;
        let rate = if modulation == 0.0 {
            self.base_rate
        } else {
            self.base_rate * cents_to_ratio(modulation)
        };
        if !rate.is_finite() {
            self.finished = true;
            return (0.0, 0.0);
        }

        let looping = self.is_looping(region.loop_mode());
        let len = region.sample.len();
        let index = self.position as usize;
        let frac = self.position - index as f64;
        let next = if looping && index + 1 >= region.loop_end() {
            region.loop_start()
        } else {
            index + 1
        };

        let cutoff = region.filter.initial_cutoff
            + mod_env * region.filter.mod_env_depth
            + mod_lfo * region.filter.mod_lfo_depth;
        if self.cutoff != Some(cutoff) {
            self.cutoff = Some(cutoff);
            self.filter
                .set_coefficients(backend.lowpass(filter_cutoff_cents_to_hz(cutoff), sample_rate));
        }

        let left = backend.interpolate(&region.sample.left[..len], index, next, frac);
        let left = self.filter.process(Channel::Left, left);
        let right = match &region.sample.right {
            Some(right) => {
                let right = backend.interpolate(&right[..len], index, next, frac);
                self.filter.process(Channel::Right, right)
            }
            None => left,
        };

        let tremolo = if region.mod_lfo_to_volume == 0.0 {
            1.0
        } else {
            attenuation_cb_to_linear(-mod_lfo * region.mod_lfo_to_volume)
        };
        let gain = self.volume_env.next() * self.static_gain * controller_gain * tremolo;

        self.advance(rate, region, looping);

        (left * gain * self.gains.0, right * gain * self.gains.1)
    }

    /// Moves the cursor by `rate` frames, wrapping inside the loop while looping.
    fn advance(&mut self, rate: f64, region: &Region, looping: bool) {
        self.position += rate;
        if looping {
            let (start, end) = (region.loop_start() as f64, region.loop_end() as f64);
            if self.position >= end {
                self.position = start + (self.position - end) % (end - start);
            }
        } else if self.position >= region.sample.len() as f64 {
            self.finished = true;
        }
    }
}
