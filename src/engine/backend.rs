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
use crate::dsp::Coefficients;

/// The numeric kernels the voice engine calls per sample.
///
/// A backend is chosen once when the engine is built. Engines refuse to start on a backend
/// that reports itself not ready.
pub trait DspBackend: Send + 'static {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether the backend can be used.
    fn is_ready(&self) -> bool {
        true
    }

    /// Linearly interpolates between `data[index]` and `data[next]` by `frac`.
    /// An `index` past the end reads as silence, as does a `next` past the end.
    fn interpolate(&self, data: &[f32], index: usize, next: usize, frac: f64) -> f64;

    /// Designs low-pass coefficients for `cutoff_hz`.
    fn lowpass(&self, cutoff_hz: f64, sample_rate: f64) -> Coefficients;
}

/// Plain Rust implementation of the kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarBackend;

impl DspBackend for ScalarBackend {
    fn name(&self) -> &str {
        "scalar"
    }

    #[inline]
    fn interpolate(&self, data: &[f32], index: usize, next: usize, frac: f64) -> f64 {
        let Some(&a) = data.get(index) else {
            return 0.0;
        };
        let b = data.get(next).copied().unwrap_or(0.0);
        let (a, b) = (a as f64, b as f64);
        a + (b - a) * frac
    }

    fn lowpass(&self, cutoff_hz: f64, sample_rate: f64) -> Coefficients {
        Coefficients::lowpass(cutoff_hz, sample_rate)
    }
}
