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

//! Generator operators, their merge rules and defaults, and the per-zone generator map.

use super::records::ModulatorRecord;

/// Number of generator operator ids defined by the format. Ids at or above this are ignored.
pub const GENERATOR_COUNT: usize = 61;

/// Frames per unit of a coarse address offset generator.
pub const COARSE_OFFSET_FRAMES: i64 = 32768;

/// Generator operators used by the resolver. Discriminants are the on-disk operator ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum GeneratorOp {
    StartAddrsOffset = 0,
    EndAddrsOffset = 1,
    StartloopAddrsOffset = 2,
    EndloopAddrsOffset = 3,
    StartAddrsCoarseOffset = 4,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    ModEnvToPitch = 7,
    InitialFilterFc = 8,
    InitialFilterQ = 9,
    ModLfoToFilterFc = 10,
    ModEnvToFilterFc = 11,
    EndAddrsCoarseOffset = 12,
    ModLfoToVolume = 13,
    ChorusEffectsSend = 15,
    ReverbEffectsSend = 16,
    Pan = 17,
    DelayModLfo = 21,
    FreqModLfo = 22,
    DelayVibLfo = 23,
    FreqVibLfo = 24,
    DelayModEnv = 25,
    AttackModEnv = 26,
    HoldModEnv = 27,
    DecayModEnv = 28,
    SustainModEnv = 29,
    ReleaseModEnv = 30,
    KeynumToModEnvHold = 31,
    KeynumToModEnvDecay = 32,
    DelayVolEnv = 33,
    AttackVolEnv = 34,
    HoldVolEnv = 35,
    DecayVolEnv = 36,
    SustainVolEnv = 37,
    ReleaseVolEnv = 38,
    KeynumToVolEnvHold = 39,
    KeynumToVolEnvDecay = 40,
    Instrument = 41,
    KeyRange = 43,
    VelRange = 44,
    StartloopAddrsCoarseOffset = 45,
    Keynum = 46,
    Velocity = 47,
    InitialAttenuation = 48,
    EndloopAddrsCoarseOffset = 50,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleModes = 54,
    ScaleTuning = 56,
    ExclusiveClass = 57,
    OverridingRootKey = 58,
}

/// How values from the four zone levels combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// The most recently applied level wins outright.
    Replace,
    /// Values are summed across levels.
    Additive,
}

impl GeneratorOp {
    pub fn id(self) -> usize {
        self as u16 as usize
    }

    pub fn merge_rule(self) -> MergeRule {
        match self {
            GeneratorOp::KeyRange
            | GeneratorOp::VelRange
            | GeneratorOp::Instrument
            | GeneratorOp::SampleId
            | GeneratorOp::SampleModes
            | GeneratorOp::ExclusiveClass
            | GeneratorOp::OverridingRootKey => MergeRule::Replace,
            _ => MergeRule::Additive,
        }
    }

    /// The legal range of a merged amount, for operators that have one.
    pub fn valid_range(self) -> Option<(i32, i32)> {
        use GeneratorOp::*;
        let range = match self {
            ModLfoToPitch | VibLfoToPitch | ModEnvToPitch => (-12000, 12000),
            ModLfoToFilterFc | ModEnvToFilterFc => (-12000, 12000),
            InitialFilterFc => (1500, 13500),
            InitialFilterQ => (0, 960),
            ModLfoToVolume => (-960, 960),
            ChorusEffectsSend | ReverbEffectsSend => (0, 1000),
            Pan => (-500, 500),
            DelayModLfo | DelayVibLfo => (-12000, 5000),
            FreqModLfo | FreqVibLfo => (-16000, 4500),
            DelayModEnv | HoldModEnv | DelayVolEnv | HoldVolEnv => (-12000, 5000),
            AttackModEnv | DecayModEnv | ReleaseModEnv => (-12000, 8000),
            AttackVolEnv | DecayVolEnv | ReleaseVolEnv => (-12000, 8000),
            SustainModEnv => (0, 1000),
            SustainVolEnv | InitialAttenuation => (0, 1440),
            KeynumToModEnvHold | KeynumToModEnvDecay => (-1200, 1200),
            KeynumToVolEnvHold | KeynumToVolEnvDecay => (-1200, 1200),
            CoarseTune => (-120, 120),
            FineTune => (-99, 99),
            ScaleTuning => (0, 1200),
            _ => return None,
        };
        Some(range)
    }

    /// The value used when no zone level sets this operator.
    pub fn default_value(self) -> i32 {
        match self {
            GeneratorOp::DelayModLfo
            | GeneratorOp::DelayVibLfo
            | GeneratorOp::DelayModEnv
            | GeneratorOp::AttackModEnv
            | GeneratorOp::HoldModEnv
            | GeneratorOp::DecayModEnv
            | GeneratorOp::ReleaseModEnv
            | GeneratorOp::DelayVolEnv
            | GeneratorOp::AttackVolEnv
            | GeneratorOp::HoldVolEnv
            | GeneratorOp::DecayVolEnv
            | GeneratorOp::ReleaseVolEnv => -12000,
            GeneratorOp::InitialFilterFc => 13500,
            GeneratorOp::ScaleTuning => 100,
            GeneratorOp::Keynum | GeneratorOp::Velocity | GeneratorOp::OverridingRootKey => -1,
            GeneratorOp::KeyRange | GeneratorOp::VelRange => 0x7f00,
            _ => 0,
        }
    }
}

/// Merge rule for a raw operator id, including ids the resolver has no name for.
pub fn merge_rule_for_id(id: usize) -> MergeRule {
    match id {
        41 | 43 | 44 | 53 | 54 | 57 | 58 => MergeRule::Replace,
        _ => MergeRule::Additive,
    }
}

/// An inclusive key or velocity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub low: u8,
    pub high: u8,
}

impl Range {
    pub const FULL: Range = Range { low: 0, high: 127 };

    /// Unpacks a range amount: low byte is the lower bound, high byte the upper bound.
    /// Both bounds are clamped into [0, 127].
    pub fn from_amount(amount: i16) -> Self {
        let raw = amount as u16;
        let low = (raw & 0xff) as u8;
        let high = (raw >> 8) as u8;
        Range {
            low: low.min(127),
            high: high.min(127),
        }
    }

    /// Packs the range back into a generator amount.
    pub fn to_amount(self) -> i16 {
        (((self.high as u16) << 8) | self.low as u16) as i16
    }

    pub fn contains(&self, value: u8) -> bool {
        self.low <= value && value <= self.high
    }
}

impl Default for Range {
    fn default() -> Self {
        Range::FULL
    }
}

/// A zone: generator amounts keyed by operator id, plus the zone's (unapplied) modulators.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    generators: [Option<i16>; GENERATOR_COUNT],
    modulators: Vec<ModulatorRecord>,
}

impl Default for Zone {
    fn default() -> Self {
        Zone {
            generators: [None; GENERATOR_COUNT],
            modulators: Vec::new(),
        }
    }
}

impl Zone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a raw operator id. Later writes replace earlier ones; unknown ids are dropped.
    pub fn set_raw(&mut self, operator: u16, amount: i16) {
        if let Some(slot) = self.generators.get_mut(operator as usize) {
            *slot = Some(amount);
        }
    }

    pub fn set(&mut self, op: GeneratorOp, amount: i16) {
        self.generators[op.id()] = Some(amount);
    }

    /// Builder-style variant of [`Zone::set`].
    pub fn with(mut self, op: GeneratorOp, amount: i16) -> Self {
        self.set(op, amount);
        self
    }

    pub fn get(&self, op: GeneratorOp) -> Option<i16> {
        self.generators[op.id()]
    }

    pub fn get_raw(&self, id: usize) -> Option<i16> {
        self.generators.get(id).copied().flatten()
    }

    /// The operators this zone sets, as (operator id, amount), in id order.
    pub fn generators(&self) -> impl Iterator<Item = (u16, i16)> + '_ {
        self.generators
            .iter()
            .enumerate()
            .filter_map(|(id, amount)| amount.map(|amount| (id as u16, amount)))
    }

    pub fn contains(&self, op: GeneratorOp) -> bool {
        self.get(op).is_some()
    }

    /// The key or velocity range stored under `op`, or the full range when absent.
    pub fn range(&self, op: GeneratorOp) -> Range {
        self.get(op).map(Range::from_amount).unwrap_or(Range::FULL)
    }

    pub fn add_modulator(&mut self, modulator: ModulatorRecord) {
        self.modulators.push(modulator);
    }

    pub fn modulators(&self) -> &[ModulatorRecord] {
        &self.modulators
    }

    pub fn is_empty(&self) -> bool {
        self.generators.iter().all(Option::is_none)
    }
}
