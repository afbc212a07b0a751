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
use std::sync::Arc;

use super::{Command, Controllers, DspBackend, EngineError, EngineSettings, ScalarBackend, Voice};
use crate::region::{Region, RegionSet};

/// Owns the active voices for one region set and mixes them into stereo output.
///
/// Nothing here allocates once the engine is built: the voice pool is reserved up front
/// and region sets are swapped by reference.
pub struct VoiceEngine<B = ScalarBackend> {
    settings: EngineSettings,
    backend: B,
    regions: RegionSet,
    voices: Vec<Voice>,
    controllers: Controllers,
    controller_gain: f64,
}

impl<B: DspBackend> VoiceEngine<B> {
    /// Creates an engine with no regions.
    pub fn new(settings: EngineSettings, backend: B) -> Result<Self, EngineError> {
        settings.validate()?;
        if !backend.is_ready() {
            return Err(EngineError::NotReady {
                backend: backend.name().to_string(),
            });
        }
        let controllers = Controllers::default();
        Ok(VoiceEngine {
            settings,
            backend,
            regions: Arc::from(Vec::<Region>::new()),
            voices: Vec::with_capacity(settings.max_voices),
            controllers,
            controller_gain: controllers.gain(),
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn controllers(&self) -> Controllers {
        self.controllers
    }

    /// Applies one command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetPreset(regions) => self.set_regions(regions),
            Command::NoteOn { note, velocity } => self.note_on(note, velocity),
            Command::NoteOff { note } => self.note_off(note),
            Command::SetControllers(controllers) => self.set_controllers(controllers),
        }
    }

    /// Replaces the region set. Every sounding voice is cut immediately.
    pub fn set_regions(&mut self, regions: RegionSet) {
        self.voices.clear();
        self.regions = regions;
    }

    /// Starts one voice per region matching `note` and `velocity`. Velocity 0 is a note-off.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if velocity == 0 {
            self.note_off(note);
            return;
        }
        let note = note.min(127);
        let velocity = velocity.min(127);
        let regions = Arc::clone(&self.regions);
        let playable =
            |region: &&Region| region.matches(note, velocity) && !region.sample.is_empty();

        // Choke every exclusive class first so new layers never choke each other.
        for region in regions.iter().filter(playable) {
            if region.exclusive_class != 0 {
                self.choke(region.exclusive_class);
            }
        }

        for (index, region) in regions.iter().enumerate() {
            if !playable(&region) {
                continue;
            }
            if self.voices.len() >= self.settings.max_voices {
                self.steal_quietest();
            }
            self.voices.push(Voice::new(
                index,
                region,
                note,
                velocity,
                &self.settings,
                &self.controllers,
            ));
        }
    }

    /// Releases every voice started by `note`.
    pub fn note_off(&mut self, note: u8) {
        for voice in self.voices.iter_mut().filter(|v| v.note() == note) {
            voice.note_off();
        }
    }

    pub fn set_controllers(&mut self, controllers: Controllers) {
        self.controllers = controllers;
        self.controller_gain = controllers.gain();
        for voice in self.voices.iter_mut() {
            voice.update_pan(&controllers);
        }
    }

    /// Releases voices in `class` that are not already releasing.
    fn choke(&mut self, class: u16) {
        for voice in self.voices.iter_mut() {
            if voice.exclusive_class() == class && !voice.is_released() {
                voice.note_off();
            }
        }
    }

    /// Removes the quietest voice outright.
    fn steal_quietest(&mut self) {
        let quietest = self
            .voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.loudness().total_cmp(&b.loudness()))
            .map(|(index, _)| index);
        if let Some(index) = quietest {
            self.voices.swap_remove(index);
        }
    }

    /// Renders one stereo frame.
    pub fn render_frame(&mut self) -> (f64, f64) {
        let sample_rate = self.settings.sample_rate as f64;
        let (mut left, mut right) = (0.0, 0.0);

        // Reverse order keeps swap_remove from skipping unvisited voices.
        let mut i = self.voices.len();
        while i > 0 {
            i -= 1;
            let voice = &mut self.voices[i];
            let region = match self.regions.get(voice.region()) {
                Some(region) if !voice.is_done() => region,
                _ => {
                    self.voices.swap_remove(i);
                    continue;
                }
            };
            let (l, r) = voice.render(region, &self.backend, sample_rate, self.controller_gain);
            left += l;
            right += r;
        }

        (left, right)
    }

    /// Fills planar buffers. Only the overlapping length of the two is written.
    pub fn render_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (frame_l, frame_r) = self.render_frame();
            *l = frame_l as f32;
            *r = frame_r as f32;
        }
    }

    /// Fills an interleaved stereo buffer. A trailing odd sample is left untouched.
    pub fn render_interleaved(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let (l, r) = self.render_frame();
            frame[0] = l as f32;
            frame[1] = r as f32;
        }
    }
}
