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

//! Walks a preset's zone hierarchy and flattens it into regions.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::{EnvelopeParams, FilterParams, LfoParams, LoopMode, PitchParams, Region, SampleData};
use crate::bank::{
    merge_rule_for_id, BankFile, GeneratorOp, MergeRule, Range, Zone, COARSE_OFFSET_FRAMES,
    GENERATOR_COUNT,
};
use crate::convert::attenuation_cb_to_linear;

/// Out-of-range references. Fatal for the call; the bank itself is left untouched.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("preset index {index} out of range, bank has {count} presets")]
    PresetOutOfRange { index: usize, count: usize },

    #[error("preset zone references instrument {index}, bank has {count} instruments")]
    InstrumentOutOfRange { index: usize, count: usize },

    #[error("instrument zone references sample {index}, bank has {count} samples")]
    SampleOutOfRange { index: usize, count: usize },
}

/// Why a zone produced no region. Zones like these are skipped and logged, never surfaced.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SkipReason {
    #[error("resolved sample bounds are empty ({start}..{end})")]
    EmptySample { start: usize, end: usize },

    #[error("sample header has a zero sample rate")]
    ZeroSampleRate,
}

/// Options for region building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Scale each decoded sample so its peak reaches full scale.
    pub normalize: bool,
    /// Pair linked left/right sample headers into stereo regions.
    pub stereo_pairing: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            normalize: true,
            stereo_pairing: true,
        }
    }
}

/// Generator values merged across zone levels.
struct Merged {
    values: [Option<i32>; GENERATOR_COUNT],
}

impl Merged {
    /// Applies zones in order. Replace operators take the latest value, all others sum.
    fn from_levels(levels: &[&Zone]) -> Self {
        let mut values = [None; GENERATOR_COUNT];
        for zone in levels {
            for (id, amount) in zone.generators() {
                let slot = &mut values[id as usize];
                *slot = Some(match merge_rule_for_id(id as usize) {
                    MergeRule::Replace => amount as i32,
                    MergeRule::Additive => slot.unwrap_or(0) + amount as i32,
                });
            }
        }
        Merged { values }
    }

    /// The merged amount clamped to the operator's legal range, or its default when unset.
    fn get(&self, op: GeneratorOp) -> i32 {
        match (self.values[op.id()], op.valid_range()) {
            (Some(value), Some((low, high))) => value.clamp(low, high),
            (Some(value), None) => value,
            (None, _) => op.default_value(),
        }
    }

    fn get_f64(&self, op: GeneratorOp) -> f64 {
        self.get(op) as f64
    }

    fn range(&self, op: GeneratorOp) -> Range {
        self.values[op.id()]
            .map(|amount| Range::from_amount(amount as i16))
            .unwrap_or(Range::FULL)
    }

    /// A replace-semantics key/velocity override, `None` when unset or out of MIDI range.
    fn midi_value(&self, op: GeneratorOp) -> Option<u8> {
        match self.get(op) {
            v @ 0..=127 => Some(v as u8),
            _ => None,
        }
    }

    fn envelope(&self, ops: [GeneratorOp; 8], sustain: f64) -> EnvelopeParams {
        let [delay, attack, hold, decay, _, release, key_to_hold, key_to_decay] = ops;
        EnvelopeParams {
            delay: self.get_f64(delay),
            attack: self.get_f64(attack),
            hold: self.get_f64(hold),
            decay: self.get_f64(decay),
            sustain,
            release: self.get_f64(release),
            key_to_hold: self.get_f64(key_to_hold),
            key_to_decay: self.get_f64(key_to_decay),
        }
    }
}

/// Splits a zone list into its optional global zone and the remaining zones.
/// The first zone is global when it lacks the operator that makes a zone concrete.
fn split_global(zones: &[Zone], concrete: GeneratorOp) -> (Option<&Zone>, &[Zone]) {
    match zones.first() {
        Some(first) if !first.contains(concrete) => (Some(first), &zones[1..]),
        _ => (None, zones),
    }
}

/// Builds the regions for preset `preset_index`.
pub fn build_regions(
    bank: &BankFile,
    preset_index: usize,
    options: &ResolveOptions,
) -> Result<Vec<Region>, ResolveError> {
    let count = bank.preset_count();
    if preset_index >= count {
        return Err(ResolveError::PresetOutOfRange {
            index: preset_index,
            count,
        });
    }

    let mut decoder = Decoder::new(bank.pool(), options.normalize);
    let mut regions = Vec::new();

    let (preset_global, preset_zones) =
        split_global(bank.preset_zones(preset_index), GeneratorOp::Instrument);

    for preset_zone in preset_zones {
        let Some(instrument) = preset_zone.get(GeneratorOp::Instrument) else {
            continue;
        };
        let instrument = instrument as u16 as usize;
        if instrument >= bank.instrument_count() {
            return Err(ResolveError::InstrumentOutOfRange {
                index: instrument,
                count: bank.instrument_count(),
            });
        }

        let (instrument_global, instrument_zones) =
            split_global(bank.instrument_zones(instrument), GeneratorOp::SampleId);

        for instrument_zone in instrument_zones {
            if !instrument_zone.contains(GeneratorOp::SampleId) {
                continue;
            }

            let levels: Vec<&Zone> = [
                preset_global,
                Some(preset_zone),
                instrument_global,
                Some(instrument_zone),
            ]
            .into_iter()
            .flatten()
            .collect();
            let merged = Merged::from_levels(&levels);

            match resolve_zone(bank, &merged, options, &mut decoder)? {
                Ok(region) => regions.push(region),
                Err(reason) => debug!(
                    preset = preset_index,
                    instrument,
                    reason = %reason,
                    "Skipping zone"
                ),
            }
        }
    }

    info!(
        preset = preset_index,
        name = bank.preset(preset_index).map(|p| p.name.as_str()).unwrap_or(""),
        regions = regions.len(),
        "Resolved preset regions"
    );

    Ok(regions)
}

/// Resolves one merged zone. The outer error is fatal; the inner one skips the zone.
fn resolve_zone(
    bank: &BankFile,
    merged: &Merged,
    options: &ResolveOptions,
    decoder: &mut Decoder,
) -> Result<Result<Region, SkipReason>, ResolveError> {
    let sample_index = merged.get(GeneratorOp::SampleId) as u16 as usize;
    let header = bank
        .sample_header(sample_index)
        .ok_or(ResolveError::SampleOutOfRange {
            index: sample_index,
            count: bank.sample_count(),
        })?;

    if header.sample_rate == 0 {
        return Ok(Err(SkipReason::ZeroSampleRate));
    }

    let pool_len = bank.pool().len() as i64;
    let offset = |base: u32, fine: GeneratorOp, coarse: GeneratorOp| -> usize {
        let frames = base as i64
            + merged.get(fine) as i64
            + merged.get(coarse) as i64 * COARSE_OFFSET_FRAMES;
        frames.clamp(0, pool_len) as usize
    };

    let start = offset(
        header.start,
        GeneratorOp::StartAddrsOffset,
        GeneratorOp::StartAddrsCoarseOffset,
    );
    let end = offset(
        header.end,
        GeneratorOp::EndAddrsOffset,
        GeneratorOp::EndAddrsCoarseOffset,
    );
    let loop_start = offset(
        header.loop_start,
        GeneratorOp::StartloopAddrsOffset,
        GeneratorOp::StartloopAddrsCoarseOffset,
    );
    let loop_end = offset(
        header.loop_end,
        GeneratorOp::EndloopAddrsOffset,
        GeneratorOp::EndloopAddrsCoarseOffset,
    );

    if end <= start {
        return Ok(Err(SkipReason::EmptySample { start, end }));
    }

    let sample = decoder.sample(bank, sample_index, start, end, options.stereo_pairing);
    let mut region = Region::new(sample);

    region.key_range = merged.range(GeneratorOp::KeyRange);
    region.vel_range = merged.range(GeneratorOp::VelRange);
    region.set_loop(
        LoopMode::from_sample_modes(merged.get(GeneratorOp::SampleModes)),
        loop_start.saturating_sub(start),
        loop_end.saturating_sub(start),
    );

    region.pitch = PitchParams {
        original_key: if header.original_key <= 127 {
            header.original_key
        } else {
            60
        },
        override_key: merged.midi_value(GeneratorOp::OverridingRootKey),
        coarse_tune: merged.get_f64(GeneratorOp::CoarseTune),
        fine_tune: merged.get_f64(GeneratorOp::FineTune),
        correction: header.pitch_correction as f64,
        scale_tuning: merged.get_f64(GeneratorOp::ScaleTuning),
        fixed_key: merged.midi_value(GeneratorOp::Keynum),
        mod_lfo_to_pitch: merged.get_f64(GeneratorOp::ModLfoToPitch),
        vib_lfo_to_pitch: merged.get_f64(GeneratorOp::VibLfoToPitch),
        mod_env_to_pitch: merged.get_f64(GeneratorOp::ModEnvToPitch),
    };

    region.attenuation = merged.get_f64(GeneratorOp::InitialAttenuation);
    region.pan = merged.get_f64(GeneratorOp::Pan);
    region.mod_lfo_to_volume = merged.get_f64(GeneratorOp::ModLfoToVolume);

    let volume_sustain =
        attenuation_cb_to_linear(merged.get_f64(GeneratorOp::SustainVolEnv)).clamp(0.0, 1.0);
    region.volume_envelope = merged.envelope(
        [
            GeneratorOp::DelayVolEnv,
            GeneratorOp::AttackVolEnv,
            GeneratorOp::HoldVolEnv,
            GeneratorOp::DecayVolEnv,
            GeneratorOp::SustainVolEnv,
            GeneratorOp::ReleaseVolEnv,
            GeneratorOp::KeynumToVolEnvHold,
            GeneratorOp::KeynumToVolEnvDecay,
        ],
        volume_sustain,
    );

    // Modulation sustain is stored as 0.1% units of decrease from full.
    let mod_sustain = (1.0 - merged.get_f64(GeneratorOp::SustainModEnv) / 1000.0).clamp(0.0, 1.0);
    region.mod_envelope = merged.envelope(
        [
            GeneratorOp::DelayModEnv,
            GeneratorOp::AttackModEnv,
            GeneratorOp::HoldModEnv,
            GeneratorOp::DecayModEnv,
            GeneratorOp::SustainModEnv,
            GeneratorOp::ReleaseModEnv,
            GeneratorOp::KeynumToModEnvHold,
            GeneratorOp::KeynumToModEnvDecay,
        ],
        mod_sustain,
    );

    region.mod_lfo = LfoParams {
        frequency: merged.get_f64(GeneratorOp::FreqModLfo),
        delay: merged.get_f64(GeneratorOp::DelayModLfo),
    };
    region.vib_lfo = LfoParams {
        frequency: merged.get_f64(GeneratorOp::FreqVibLfo),
        delay: merged.get_f64(GeneratorOp::DelayVibLfo),
    };
    region.filter = FilterParams {
        initial_cutoff: merged.get_f64(GeneratorOp::InitialFilterFc),
        mod_env_depth: merged.get_f64(GeneratorOp::ModEnvToFilterFc),
        mod_lfo_depth: merged.get_f64(GeneratorOp::ModLfoToFilterFc),
    };

    region.exclusive_class = merged
        .get(GeneratorOp::ExclusiveClass)
        .clamp(0, u16::MAX as i32) as u16;
    region.fixed_velocity = merged.midi_value(GeneratorOp::Velocity);

    Ok(Ok(region))
}

/// Decodes pool slices to floats, sharing buffers between zones that use the same slice.
struct Decoder<'a> {
    pool: &'a [i16],
    normalize: bool,
    /// Keyed by sample header, slice bounds and stereo partner.
    cache: HashMap<(usize, usize, usize, Option<usize>), SampleData>,
}

impl<'a> Decoder<'a> {
    fn new(pool: &'a [i16], normalize: bool) -> Self {
        Decoder {
            pool,
            normalize,
            cache: HashMap::new(),
        }
    }

    /// Decodes `[start, end)` of sample `index`, paired with its linked half when possible.
    ///
    /// Pairing is an approximation: it only uses the link index and left/right bits of a
    /// same-rate partner, applying this zone's offsets to the partner's start.
    fn sample(
        &mut self,
        bank: &BankFile,
        index: usize,
        start: usize,
        end: usize,
        stereo_pairing: bool,
    ) -> SampleData {
        let partner = if stereo_pairing {
            self.partner(bank, index, start, end)
        } else {
            None
        };
        let key = (index, start, end, partner.map(|(link, _)| link));
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        // `sample_header` succeeded for `index` in the caller.
        let sample_rate = bank.sample_header(index).map(|h| h.sample_rate).unwrap_or(0);
        let mut own = decode(&self.pool[start..end]);

        let data = match partner {
            Some((link, partner_start)) => {
                let mut other = decode(&self.pool[partner_start..partner_start + own.len()]);
                if self.normalize {
                    normalize(&mut [&mut own, &mut other]);
                }
                let is_right = bank
                    .sample_header(index)
                    .map(|h| h.kind.is_right())
                    .unwrap_or(false);
                debug!(sample = index, link, "Paired stereo sample");
                if is_right {
                    SampleData::stereo(other.into(), own.into(), sample_rate)
                } else {
                    SampleData::stereo(own.into(), other.into(), sample_rate)
                }
            }
            None => {
                if self.normalize {
                    normalize(&mut [&mut own]);
                }
                SampleData::mono(own.into(), sample_rate)
            }
        };

        self.cache.insert(key, data.clone());
        data
    }

    /// Finds the stereo partner of sample `index` and where its matching slice starts.
    fn partner(
        &self,
        bank: &BankFile,
        index: usize,
        start: usize,
        end: usize,
    ) -> Option<(usize, usize)> {
        let header = bank.sample_header(index)?;
        if !(header.kind.is_left() || header.kind.is_right()) {
            return None;
        }
        let link = header.link as usize;
        if link == index {
            return None;
        }
        let linked = bank.sample_header(link)?;
        if linked.sample_rate != header.sample_rate {
            return None;
        }

        let delta = start.checked_sub(header.start as usize)?;
        let partner_start = (linked.start as usize).checked_add(delta)?;
        let partner_end = partner_start.checked_add(end - start)?;
        if partner_end > self.pool.len() {
            return None;
        }
        Some((link, partner_start))
    }
}

/// Converts 16-bit PCM to floats in [-1, 1).
fn decode(pcm: &[i16]) -> Vec<f32> {
    pcm.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Scales the buffers together so the loudest sample among them reaches full scale.
fn normalize(buffers: &mut [&mut Vec<f32>]) {
    let peak = buffers
        .iter()
        .flat_map(|b| b.iter())
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= 0.0 {
        return;
    }
    let scale = 1.0 / peak;
    for buffer in buffers.iter_mut() {
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }
}
