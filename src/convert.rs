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

//! Unit conversions shared by the region resolver and the voice engine.
//!
//! Every function here is pure and deterministic. Tests throughout the crate
//! compute their expected values with these same functions.

use std::f64::consts::FRAC_PI_4;

/// Reference frequency of cent 0 (MIDI note 0) in Hz.
const CENT_ZERO_HZ: f64 = 8.176;

/// Converts timecents to seconds.
pub fn timecents_to_seconds(tc: f64) -> f64 {
    2f64.powf(tc / 1200.0)
}

/// Converts a pitch offset in cents to a frequency ratio.
pub fn cents_to_ratio(cents: f64) -> f64 {
    2f64.powf(cents / 1200.0)
}

/// Converts an attenuation in centibels to a linear gain.
pub fn attenuation_cb_to_linear(cb: f64) -> f64 {
    let db = -cb / 10.0;
    10f64.powf(db / 20.0)
}

/// Maps a MIDI velocity onto a linear gain using a power curve.
pub fn velocity_to_linear(velocity: f64, curve: f64) -> f64 {
    let x = velocity.clamp(0.0, 127.0) / 127.0;
    x.powf(curve)
}

/// Constant-power pan law. `pan` is in SoundFont units (-500 hard left, +500 hard right).
/// Returns `(left, right)` gains.
pub fn pan_to_gains(pan: f64) -> (f64, f64) {
    balance_to_gains(pan.clamp(-500.0, 500.0) / 500.0)
}

/// Constant-power balance law for a position in `[-1, 1]`. Returns `(left, right)` gains.
pub fn balance_to_gains(balance: f64) -> (f64, f64) {
    let p = balance.clamp(-1.0, 1.0);
    let angle = (p + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Converts an absolute filter cutoff in cents to Hz.
pub fn filter_cutoff_cents_to_hz(cents: f64) -> f64 {
    CENT_ZERO_HZ * 2f64.powf(cents / 1200.0)
}

/// Converts an absolute LFO frequency in cents to Hz. Same reference as the filter cutoff.
pub fn lfo_cents_to_hz(cents: f64) -> f64 {
    filter_cutoff_cents_to_hz(cents)
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
