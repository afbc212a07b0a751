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

//! Per-voice signal processing building blocks: envelopes, LFOs and the low-pass filter.
//!
//! Everything here is allocation-free and runs one sample at a time at the output rate.

mod envelope;
mod filter;
mod lfo;

pub use envelope::{Envelope, EnvelopeKind, EnvelopeTimes, Stage};
pub use filter::{clamp_cutoff, Channel, Coefficients, LowPass};
pub use lfo::Lfo;
