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

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, trace};

use super::{Command, Controllers, DspBackend, EngineError, EngineSettings, VoiceEngine};
use crate::region::{Region, RegionSet};

/// Commands that can wait between two blocks. The queue is preallocated, so the render
/// side never allocates or frees while draining it.
pub const COMMAND_CAPACITY: usize = 1024;

/// Creates a connected control handle and renderer.
pub fn channel<B: DspBackend>(
    settings: EngineSettings,
    backend: B,
) -> Result<(SynthHandle, Renderer<B>), EngineError> {
    let engine = VoiceEngine::new(settings, backend)?;
    let (sender, receiver) = crossbeam_channel::bounded(COMMAND_CAPACITY);
    debug!(
        backend = engine.backend().name(),
        sample_rate = settings.sample_rate,
        max_voices = settings.max_voices,
        "Created voice engine"
    );
    Ok((
        SynthHandle {
            sender,
            current: None,
            retired: Vec::new(),
        },
        Renderer { engine, receiver },
    ))
}

/// The control side. Cheap to call from any non-real-time thread.
pub struct SynthHandle {
    sender: Sender<Command>,
    /// The region set most recently sent.
    current: Option<RegionSet>,
    /// Older region sets the renderer may still reference.
    retired: Vec<RegionSet>,
}

impl SynthHandle {
    /// Sends a new region set. The handle holds a reference to every set the renderer
    /// might still be using, so buffers are only ever freed here, never on the audio thread.
    pub fn set_preset(&mut self, regions: impl Into<RegionSet>) -> Result<(), EngineError> {
        let regions: RegionSet = regions.into();
        debug!(regions = regions.len(), "Sending region set");
        self.send(Command::SetPreset(Arc::clone(&regions)))?;
        if let Some(previous) = self.current.replace(regions) {
            self.retired.push(previous);
        }
        self.retired.retain(|set| Arc::strong_count(set) > 1);
        Ok(())
    }

    /// The region set most recently sent, if any.
    pub fn current(&self) -> Option<&[Region]> {
        self.current.as_deref()
    }

    pub fn note_on(&self, note: u8, velocity: u8) -> Result<(), EngineError> {
        trace!(note, velocity, "Note on");
        self.send(Command::NoteOn { note, velocity })
    }

    pub fn note_off(&self, note: u8) -> Result<(), EngineError> {
        trace!(note, "Note off");
        self.send(Command::NoteOff { note })
    }

    pub fn set_controllers(&self, controllers: Controllers) -> Result<(), EngineError> {
        trace!(
            volume = controllers.volume,
            pan = controllers.pan,
            expression = controllers.expression,
            "Controllers"
        );
        self.send(Command::SetControllers(controllers))
    }

    /// Queues a command without blocking. Fails with [`EngineError::QueueFull`] when the
    /// renderer has fallen [`COMMAND_CAPACITY`] commands behind.
    pub fn send(&self, command: Command) -> Result<(), EngineError> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => EngineError::QueueFull,
            TrySendError::Disconnected(_) => EngineError::Disconnected,
        })
    }
}

/// The real-time side. Owned by the audio callback.
pub struct Renderer<B> {
    engine: VoiceEngine<B>,
    receiver: Receiver<Command>,
}

impl<B: DspBackend> Renderer<B> {
    /// Applies every pending command in arrival order.
    fn drain(&mut self) {
        while let Ok(command) = self.receiver.try_recv() {
            self.engine.apply(command);
        }
    }

    /// Renders an interleaved stereo block after applying pending commands.
    pub fn render_interleaved(&mut self, out: &mut [f32]) {
        self.drain();
        self.engine.render_interleaved(out);
    }

    /// Renders planar stereo blocks after applying pending commands.
    pub fn render_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.drain();
        self.engine.render_planar(left, right);
    }

    pub fn engine(&self) -> &VoiceEngine<B> {
        &self.engine
    }
}
