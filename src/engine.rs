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

//! The real-time voice engine.
//!
//! [`VoiceEngine`] owns the active voices and renders them into stereo blocks. It is driven
//! either directly or, across threads, through the [`channel`] pair: a [`SynthHandle`] on
//! the control side sends [`Command`]s that the [`Renderer`] applies at the start of every
//! block.

mod backend;
mod messages;
mod pool;
mod renderer;
mod voice;

pub use backend::{DspBackend, ScalarBackend};
pub use messages::Command;
pub use pool::VoiceEngine;
pub use renderer::{channel, Renderer, SynthHandle, COMMAND_CAPACITY};
pub use voice::Voice;

/// Errors from building or driving the engine.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("DSP backend {backend} is not ready")]
    NotReady { backend: String },

    #[error("invalid engine settings: {0}")]
    InvalidSettings(String),

    #[error("the renderer has been dropped")]
    Disconnected,

    #[error("the command queue is full")]
    QueueFull,
}

/// Engine parameters fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Polyphony cap.
    pub max_voices: usize,
    /// Exponent of the velocity-to-gain curve.
    pub velocity_curve: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            sample_rate: 44100,
            max_voices: 64,
            velocity_curve: 2.0,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sample_rate == 0 {
            return Err(EngineError::InvalidSettings(
                "sample rate must be greater than zero".into(),
            ));
        }
        if self.max_voices == 0 {
            return Err(EngineError::InvalidSettings(
                "max voices must be greater than zero".into(),
            ));
        }
        if !self.velocity_curve.is_finite() || self.velocity_curve <= 0.0 {
            return Err(EngineError::InvalidSettings(format!(
                "velocity curve must be a positive number, got {}",
                self.velocity_curve
            )));
        }
        Ok(())
    }
}

/// Continuous controller values applied on top of every voice's gain and pan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controllers {
    pub volume: u8,
    pub pan: u8,
    pub expression: u8,
}

impl Default for Controllers {
    fn default() -> Self {
        Controllers {
            volume: 127,
            pan: 64,
            expression: 127,
        }
    }
}

impl Controllers {
    /// Linear gain from volume and expression.
    pub fn gain(&self) -> f64 {
        let volume = self.volume.min(127) as f64 / 127.0;
        let expression = self.expression.min(127) as f64 / 127.0;
        volume * expression
    }

    /// Pan offset in region pan units. 64 is centre.
    pub fn pan_offset(&self) -> f64 {
        (self.pan.min(127) as f64 - 64.0) / 64.0 * 500.0
    }
}
