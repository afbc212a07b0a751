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
use crate::convert::lerp;

/// Shortest volume release in seconds. Anything faster clicks.
pub const MIN_VOLUME_RELEASE: f64 = 0.06;

/// Shortest modulation release in seconds.
pub const MIN_MODULATION_RELEASE: f64 = 0.02;

/// Floor for levels on the log-domain curves.
const EPSILON: f64 = 1e-5;

/// Which envelope shape to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Exponential attack, log-domain decay and release.
    Volume,
    /// Linear segments throughout.
    Modulation,
}

impl EnvelopeKind {
    fn min_release(self) -> f64 {
        match self {
            EnvelopeKind::Volume => MIN_VOLUME_RELEASE,
            EnvelopeKind::Modulation => MIN_MODULATION_RELEASE,
        }
    }
}

/// Stage durations in seconds and the sustain level in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeTimes {
    pub delay: f64,
    pub attack: f64,
    pub hold: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for EnvelopeTimes {
    fn default() -> Self {
        EnvelopeTimes {
            delay: 0.0,
            attack: 0.0,
            hold: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
        }
    }
}

/// Envelope stages, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
}

/// A delay/attack/hold/decay/sustain/release generator, advanced one sample per call.
#[derive(Debug, Clone)]
pub struct Envelope {
    kind: EnvelopeKind,
    dt: f64,
    stage: Stage,
    level: f64,
    /// Time spent in the current stage.
    t: f64,
    delay: f64,
    attack: f64,
    hold: f64,
    decay: f64,
    sustain: f64,
    release: f64,
    release_start: f64,
}

impl Envelope {
    /// Creates an idle envelope. Negative times are floored at zero, the release at the
    /// kind's minimum, and the sustain level is clamped to [0, 1].
    pub fn new(kind: EnvelopeKind, sample_rate: f64, times: EnvelopeTimes) -> Self {
        Envelope {
            kind,
            dt: 1.0 / sample_rate,
            stage: Stage::Idle,
            level: 0.0,
            t: 0.0,
            delay: times.delay.max(0.0),
            attack: times.attack.max(0.0),
            hold: times.hold.max(0.0),
            decay: times.decay.max(0.0),
            sustain: times.sustain.clamp(0.0, 1.0),
            release: times.release.max(kind.min_release()),
            release_start: 0.0,
        }
    }

    pub fn volume(sample_rate: f64, times: EnvelopeTimes) -> Self {
        Self::new(EnvelopeKind::Volume, sample_rate, times)
    }

    pub fn modulation(sample_rate: f64, times: EnvelopeTimes) -> Self {
        Self::new(EnvelopeKind::Modulation, sample_rate, times)
    }

    /// Starts the envelope from silence.
    pub fn note_on(&mut self) {
        self.stage = if self.delay > 0.0 {
            Stage::Delay
        } else {
            Stage::Attack
        };
        self.t = 0.0;
        self.level = 0.0;
    }

    /// Moves to the release stage from wherever the envelope currently is.
    pub fn note_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.stage = Stage::Release;
        self.t = 0.0;
        self.release_start = self.level;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == Stage::Release
    }

    /// Advances by one sample and returns the new level.
    pub fn next(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Delay => {
                self.t += self.dt;
                if self.t >= self.delay {
                    self.enter(Stage::Attack);
                }
                self.level = 0.0;
            }
            Stage::Attack => {
                if self.attack <= 0.0 {
                    self.finish_attack();
                    return self.level;
                }
                self.t += self.dt;
                let x = (self.t / self.attack).min(1.0);
                self.level = match self.kind {
                    EnvelopeKind::Volume => 1.0 - (-6.0 * x).exp(),
                    EnvelopeKind::Modulation => x,
                };
                if x >= 1.0 {
                    self.finish_attack();
                }
            }
            Stage::Hold => {
                self.t += self.dt;
                self.level = 1.0;
                if self.t >= self.hold {
                    self.enter(Stage::Decay);
                }
            }
            Stage::Decay => {
                if self.decay <= 0.0 {
                    self.level = self.sustain;
                    self.enter(Stage::Sustain);
                    return self.level;
                }
                self.t += self.dt;
                let x = (self.t / self.decay).min(1.0);
                self.level = self.curve(1.0, self.sustain, x);
                if x >= 1.0 {
                    self.level = self.sustain;
                    self.enter(Stage::Sustain);
                }
            }
            Stage::Sustain => {
                self.level = self.sustain;
            }
            Stage::Release => {
                if self.release <= 0.0 {
                    self.level = 0.0;
                    self.enter(Stage::Idle);
                    return self.level;
                }
                self.t += self.dt;
                let x = (self.t / self.release).min(1.0);
                self.level = self.curve(self.release_start, 0.0, x);
                if x >= 1.0 {
                    self.level = 0.0;
                    self.enter(Stage::Idle);
                }
            }
        }
        self.level
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.t = 0.0;
    }

    fn finish_attack(&mut self) {
        self.level = 1.0;
        let next = if self.hold > 0.0 {
            Stage::Hold
        } else {
            Stage::Decay
        };
        self.enter(next);
    }

    /// Interpolates a decay or release segment.
    fn curve(&self, start: f64, end: f64, x: f64) -> f64 {
        match self.kind {
            EnvelopeKind::Volume => {
                let start = start.max(EPSILON).ln();
                let end = end.max(EPSILON).ln();
                lerp(start, end, x).exp()
            }
            EnvelopeKind::Modulation => lerp(start, end, x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A power of two keeps every accumulated time step exact.
    const RATE: f64 = 1024.0;

    fn frames(n: f64) -> f64 {
        n / RATE
    }

    fn instant() -> EnvelopeTimes {
        EnvelopeTimes::default()
    }

    fn run(env: &mut Envelope, samples: usize) -> f64 {
        for _ in 0..samples {
            env.next();
        }
        env.level()
    }

    /// Runs the envelope until it goes idle, returning how many samples that took.
    fn samples_until_idle(env: &mut Envelope, limit: usize) -> Option<usize> {
        (1..=limit).find(|_| {
            env.next();
            env.is_idle()
        })
    }

    #[test]
    fn test_instant_envelope() {
        let mut env = Envelope::volume(RATE, instant());
        assert!(env.is_idle());
        assert_eq!(env.next(), 0.0);

        env.note_on();
        assert_eq!(env.next(), 1.0);
        for _ in 0..500 {
            assert_eq!(env.next(), 1.0);
        }
        assert_eq!(env.stage(), Stage::Sustain);

        env.note_off();
        assert_eq!(env.stage(), Stage::Release);
        assert!(env.is_releasing());

        // A zero release is floored, so the tail still takes about 60 ms.
        let floor = (MIN_VOLUME_RELEASE * RATE).ceil() as usize;
        for _ in 0..floor / 2 {
            assert!(env.next() > 0.0);
        }
        let remaining = samples_until_idle(&mut env, floor).unwrap();
        assert_eq!(floor / 2 + remaining, floor);
        assert_eq!(env.level(), 0.0);
        assert_eq!(env.next(), 0.0);
    }

    #[test]
    fn test_release_is_monotonic() {
        let mut env = Envelope::volume(
            RATE,
            EnvelopeTimes {
                release: 0.5,
                ..instant()
            },
        );
        env.note_on();
        env.next();
        env.note_off();
        let mut last = env.level();
        while !env.is_idle() {
            let level = env.next();
            assert!(level <= last);
            last = level;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_delay_and_attack() {
        let mut env = Envelope::volume(
            RATE,
            EnvelopeTimes {
                delay: frames(10.0),
                attack: frames(100.0),
                ..instant()
            },
        );
        env.note_on();
        assert_eq!(env.stage(), Stage::Delay);
        assert_eq!(run(&mut env, 9), 0.0);
        assert_eq!(env.stage(), Stage::Delay);
        assert_eq!(run(&mut env, 1), 0.0);
        assert_eq!(env.stage(), Stage::Attack);

        // Halfway through, the exponential attack is well above linear.
        let expected = 1.0 - (-3.0f64).exp();
        assert!((run(&mut env, 50) - expected).abs() < 1e-9);

        assert_eq!(run(&mut env, 50), 1.0);
        assert_eq!(env.stage(), Stage::Decay);
    }

    #[test]
    fn test_hold_and_decay() {
        let sustain = 0.1;
        let mut env = Envelope::volume(
            RATE,
            EnvelopeTimes {
                hold: frames(20.0),
                decay: frames(100.0),
                sustain,
                ..instant()
            },
        );
        env.note_on();
        env.next();
        assert_eq!(env.stage(), Stage::Hold);
        for _ in 0..20 {
            assert_eq!(env.next(), 1.0);
        }
        assert_eq!(env.stage(), Stage::Decay);

        // Log-domain decay: halfway is the geometric mean of the endpoints.
        assert!((run(&mut env, 50) - sustain.sqrt()).abs() < 1e-9);

        assert_eq!(run(&mut env, 50), sustain);
        assert_eq!(env.stage(), Stage::Sustain);
        assert_eq!(env.next(), sustain);
    }

    #[test]
    fn test_modulation_is_linear() {
        let mut env = Envelope::modulation(
            RATE,
            EnvelopeTimes {
                attack: frames(100.0),
                decay: frames(100.0),
                sustain: 0.5,
                release: frames(100.0),
                ..instant()
            },
        );
        env.note_on();
        assert!((run(&mut env, 50) - 0.5).abs() < 1e-12);
        assert_eq!(run(&mut env, 50), 1.0);
        assert!((run(&mut env, 50) - 0.75).abs() < 1e-12);
        assert_eq!(run(&mut env, 50), 0.5);

        env.note_off();
        assert!((run(&mut env, 50) - 0.25).abs() < 1e-12);
        assert_eq!(run(&mut env, 50), 0.0);
        assert!(env.is_idle());
    }

    #[test]
    fn test_modulation_release_floor() {
        let mut env = Envelope::modulation(RATE, instant());
        env.note_on();
        env.next();
        env.note_off();
        let floor = (MIN_MODULATION_RELEASE * RATE).ceil() as usize;
        assert_eq!(samples_until_idle(&mut env, floor * 2), Some(floor));
    }

    #[test]
    fn test_note_off_while_idle() {
        let mut env = Envelope::volume(RATE, instant());
        env.note_off();
        assert!(env.is_idle());
        assert_eq!(env.next(), 0.0);
    }

    #[test]
    fn test_release_starts_from_current_level() {
        let mut env = Envelope::modulation(
            RATE,
            EnvelopeTimes {
                attack: frames(100.0),
                release: frames(100.0),
                ..instant()
            },
        );
        env.note_on();
        run(&mut env, 20);
        env.note_off();
        assert!((env.next() - 0.198).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let mut env = Envelope::volume(
            RATE,
            EnvelopeTimes {
                delay: -1.0,
                attack: -1.0,
                sustain: 4.0,
                ..instant()
            },
        );
        env.note_on();
        assert_eq!(env.stage(), Stage::Attack);
        assert_eq!(env.next(), 1.0);
        assert_eq!(env.next(), 1.0);
    }
}
