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
use std::f64::consts::TAU;

/// Butterworth quality factor.
const Q: f64 = 0.7071;

/// Lowest cutoff in Hz.
const MIN_CUTOFF: f64 = 5.0;

/// Highest cutoff as a fraction of the sample rate.
const MAX_CUTOFF_RATIO: f64 = 0.45;

/// Clamps a cutoff into the range where the filter stays stable.
pub fn clamp_cutoff(hz: f64, sample_rate: f64) -> f64 {
    hz.min(sample_rate * MAX_CUTOFF_RATIO).max(MIN_CUTOFF)
}

/// Normalized biquad coefficients (`a0` divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Coefficients {
    /// Passes input through unchanged.
    pub const IDENTITY: Coefficients = Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// RBJ cookbook low-pass at `cutoff_hz`, clamped first.
    pub fn lowpass(cutoff_hz: f64, sample_rate: f64) -> Self {
        let w0 = TAU * clamp_cutoff(cutoff_hz, sample_rate) / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * Q);
        let a0 = 1.0 + alpha;
        Coefficients {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Coefficients::IDENTITY
    }
}

/// Output channel selector for the filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left = 0,
    Right = 1,
}

/// A two-pole low-pass in transposed direct form II, one state pair per channel.
#[derive(Debug, Clone, Default)]
pub struct LowPass {
    coefficients: Coefficients,
    /// `[z1, z2]` per channel.
    state: [[f64; 2]; 2],
}

impl LowPass {
    pub fn new(coefficients: Coefficients) -> Self {
        LowPass {
            coefficients,
            state: [[0.0; 2]; 2],
        }
    }

    /// Swaps in new coefficients. Channel state is kept so sweeps stay continuous.
    pub fn set_coefficients(&mut self, coefficients: Coefficients) {
        self.coefficients = coefficients;
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn reset(&mut self) {
        self.state = [[0.0; 2]; 2];
    }

    #[inline]
    pub fn process(&mut self, channel: Channel, x: f64) -> f64 {
        let c = &self.coefficients;
        let [z1, z2] = &mut self.state[channel as usize];
        let y = c.b0 * x + *z1;
        *z1 = c.b1 * x - c.a1 * y + *z2;
        *z2 = c.b2 * x - c.a2 * y;
        y
    }
}
