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

/// A delayed sine oscillator for vibrato, tremolo and filter sweeps.
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Phase increment per sample, in radians.
    step: f64,
    phase: f64,
    /// Remaining start delay in seconds.
    delay_left: f64,
    dt: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64, frequency_hz: f64, delay_seconds: f64) -> Self {
        Lfo {
            step: TAU * frequency_hz.max(0.0) / sample_rate,
            phase: 0.0,
            delay_left: delay_seconds.max(0.0),
            dt: 1.0 / sample_rate,
        }
    }

    /// Advances by one sample. Emits 0 until the delay has elapsed.
    pub fn next(&mut self) -> f64 {
        if self.delay_left > 0.0 {
            self.delay_left -= self.dt;
            return 0.0;
        }
        self.phase += self.step;
        if self.phase > TAU {
            self.phase -= TAU;
        }
        self.phase.sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_emits_silence() {
        let mut lfo = Lfo::new(1024.0, 4.0, 16.0 / 1024.0);
        for _ in 0..16 {
            assert_eq!(lfo.next(), 0.0);
        }
        assert!(lfo.next() > 0.0);
    }

    #[test]
    fn test_frequency() {
        let rate = 48000.0;
        let mut lfo = Lfo::new(rate, 5.0, 0.0);
        let values: Vec<f64> = (0..rate as usize).map(|_| lfo.next()).collect();

        assert!(values.iter().all(|v| v.abs() <= 1.0));
        let upward = values.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((4..=5).contains(&upward), "{} upward crossings", upward);
    }

    #[test]
    fn test_phase_stays_bounded() {
        let mut lfo = Lfo::new(100.0, 30.0, 0.0);
        for _ in 0..10_000 {
            lfo.next();
        }
        assert!(lfo.phase >= 0.0 && lfo.phase <= TAU);
    }

    #[test]
    fn test_negative_frequency_is_still() {
        let mut lfo = Lfo::new(1000.0, -10.0, -1.0);
        assert_eq!(lfo.next(), 0.0);
        assert_eq!(lfo.next(), 0.0);
    }
}
