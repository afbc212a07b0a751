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

//! A sampled-instrument sound bank player.
//!
//! The pipeline runs in three steps:
//!
//! 1. [`bank::BankFile`] parses a chunked bank file into raw tables.
//! 2. [`region::build_regions`] flattens one preset into immutable [`region::Region`]s.
//! 3. [`engine::VoiceEngine`] turns note events and regions into stereo audio, usually
//!    driven from an audio callback through [`engine::channel`].

pub mod audio;
pub mod bank;
pub mod config;
pub mod convert;
pub mod dsp;
pub mod engine;
pub mod region;

#[cfg(test)]
mod testutil;
