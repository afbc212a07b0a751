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

//! Hand-built regions for engine tests.

use crate::region::{Region, SampleData};

/// An unlooped region over a constant-valued mono sample at 44.1 kHz, rooted at middle C.
pub fn constant_region(value: f32, frames: usize) -> Region {
    Region::new(SampleData::mono(vec![value; frames].into(), 44100))
}

/// An unlooped half-scale sine with a 100 frame period, rooted at middle C.
pub fn sine_region(frames: usize, sample_rate: u32) -> Region {
    let data: Vec<f32> = (0..frames)
        .map(|i| (i as f64 / 100.0 * std::f64::consts::TAU).sin() as f32 * 0.5)
        .collect();
    Region::new(SampleData::mono(data.into(), sample_rate))
}
