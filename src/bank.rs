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

//! Sound bank container reader.
//!
//! This module provides:
//! - RIFF chunk walking with strict bounds on every declared length
//! - Fixed-size record readers for the preset, instrument and sample tables
//! - Zone construction from the zone-index, generator and modulator tables
//!
//! A parsed [`BankFile`] is immutable. Every table keeps its terminator record so that the
//! sub-range of the last real entry can be computed; accessors never hand the terminator
//! out as data.

mod chunk;
mod error;
mod generator;
mod records;

use std::fs;
use std::ops::Range as IndexRange;
use std::path::Path;

use tracing::{debug, info, warn};

pub use error::FormatError;
pub use generator::{
    merge_rule_for_id, GeneratorOp, MergeRule, Range, Zone, COARSE_OFFSET_FRAMES,
    GENERATOR_COUNT,
};
pub use records::{
    GeneratorRecord, InstrumentHeader, ModulatorRecord, PresetHeader, SampleHeader, SampleKind,
    ZoneIndex,
};

/// Optional descriptive data from the bank's INFO list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankInfo {
    /// Bank name (`INAM`).
    pub name: Option<String>,
    /// Format version (`ifil`), as (major, minor).
    pub version: Option<(u16, u16)>,
}

/// A parsed sound bank.
#[derive(Debug, Clone)]
pub struct BankFile {
    info: BankInfo,
    /// Preset headers, terminator included.
    presets: Vec<PresetHeader>,
    /// One zone per preset zone-index record, terminator excluded.
    preset_zones: Vec<Zone>,
    /// Instrument headers, terminator included.
    instruments: Vec<InstrumentHeader>,
    /// One zone per instrument zone-index record, terminator excluded.
    instrument_zones: Vec<Zone>,
    /// Sample headers, terminator included.
    sample_headers: Vec<SampleHeader>,
    /// The 16-bit mono sample pool.
    pool: Vec<i16>,
}

impl BankFile {
    /// Reads and parses the bank at `path`.
    pub fn load(path: &Path) -> Result<BankFile, FormatError> {
        info!(path = ?path, "Loading sound bank");
        let bytes = fs::read(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        BankFile::parse(&bytes)
    }

    /// Parses a complete bank container held in memory.
    pub fn parse(bytes: &[u8]) -> Result<BankFile, FormatError> {
        let riff = chunk::chunks(bytes)
            .next()
            .ok_or(FormatError::BadSignature)??;
        let body = match riff.list() {
            Some((form, body)) if &riff.id == b"RIFF" && &form == b"sfbk" => body,
            _ => return Err(FormatError::BadSignature),
        };

        let info = match chunk::find_list(body, b"INFO")? {
            Some(list) => read_info(list)?,
            None => BankInfo::default(),
        };

        let sdta = chunk::find_list(body, b"sdta")?.ok_or(FormatError::MissingChunk("sdta"))?;
        let smpl = chunk::find(sdta, b"smpl")?.ok_or(FormatError::MissingChunk("smpl"))?;
        let pool: Vec<i16> = smpl
            .data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        let pdta = chunk::find_list(body, b"pdta")?.ok_or(FormatError::MissingChunk("pdta"))?;
        let presets = records::read_preset_headers(required(pdta, b"phdr", "phdr")?)?;
        let preset_bags = records::read_zone_indices("pbag", required(pdta, b"pbag", "pbag")?)?;
        let preset_mods = match chunk::find(pdta, b"pmod")? {
            Some(c) => records::read_modulators("pmod", c.data)?,
            None => Vec::new(),
        };
        let preset_gens = records::read_generators("pgen", required(pdta, b"pgen", "pgen")?)?;
        let instruments = records::read_instrument_headers(required(pdta, b"inst", "inst")?)?;
        let instrument_bags =
            records::read_zone_indices("ibag", required(pdta, b"ibag", "ibag")?)?;
        let instrument_mods = match chunk::find(pdta, b"imod")? {
            Some(c) => records::read_modulators("imod", c.data)?,
            None => Vec::new(),
        };
        let instrument_gens =
            records::read_generators("igen", required(pdta, b"igen", "igen")?)?;
        let sample_headers = records::read_sample_headers(required(pdta, b"shdr", "shdr")?)?;

        let preset_zones = build_zones("pbag", &preset_bags, &preset_gens, &preset_mods);
        let instrument_zones =
            build_zones("ibag", &instrument_bags, &instrument_gens, &instrument_mods);

        let bank = BankFile {
            info,
            presets,
            preset_zones,
            instruments,
            instrument_zones,
            sample_headers,
            pool,
        };

        info!(
            name = bank.info.name.as_deref().unwrap_or("<unnamed>"),
            presets = bank.preset_count(),
            instruments = bank.instrument_count(),
            samples = bank.sample_count(),
            pool_frames = bank.pool.len(),
            "Parsed sound bank"
        );

        Ok(bank)
    }

    pub fn info(&self) -> &BankInfo {
        &self.info
    }

    /// Number of real presets (the terminator is not counted).
    pub fn preset_count(&self) -> usize {
        self.presets.len().saturating_sub(1)
    }

    /// Real preset headers, without the terminator.
    pub fn presets(&self) -> &[PresetHeader] {
        &self.presets[..self.preset_count()]
    }

    pub fn preset(&self, index: usize) -> Option<&PresetHeader> {
        self.presets().get(index)
    }

    /// Finds the preset index for a MIDI bank/program pair.
    pub fn find_preset(&self, bank: u16, program: u16) -> Option<usize> {
        self.presets()
            .iter()
            .position(|p| p.bank == bank && p.program == program)
    }

    /// The zones belonging to preset `index`, in file order.
    pub fn preset_zones(&self, index: usize) -> &[Zone] {
        if index >= self.preset_count() {
            return &[];
        }
        let range = zone_range(
            self.presets[index].zone_start,
            self.presets[index + 1].zone_start,
            self.preset_zones.len(),
        );
        &self.preset_zones[range]
    }

    /// Number of real instruments (the terminator is not counted).
    pub fn instrument_count(&self) -> usize {
        self.instruments.len().saturating_sub(1)
    }

    pub fn instrument(&self, index: usize) -> Option<&InstrumentHeader> {
        self.instruments[..self.instrument_count()].get(index)
    }

    /// The zones belonging to instrument `index`, in file order.
    pub fn instrument_zones(&self, index: usize) -> &[Zone] {
        if index >= self.instrument_count() {
            return &[];
        }
        let range = zone_range(
            self.instruments[index].zone_start,
            self.instruments[index + 1].zone_start,
            self.instrument_zones.len(),
        );
        &self.instrument_zones[range]
    }

    /// Number of real sample headers (the terminator is not counted).
    pub fn sample_count(&self) -> usize {
        self.sample_headers.len().saturating_sub(1)
    }

    pub fn sample_header(&self, index: usize) -> Option<&SampleHeader> {
        self.sample_headers[..self.sample_count()].get(index)
    }

    /// The 16-bit mono sample pool all sample headers point into.
    pub fn pool(&self) -> &[i16] {
        &self.pool
    }
}

/// Returns the payload of a sub-chunk the bank cannot be read without.
fn required<'a>(
    list: &'a [u8],
    id: &chunk::FourCc,
    name: &'static str,
) -> Result<&'a [u8], FormatError> {
    Ok(chunk::find(list, id)?
        .ok_or(FormatError::MissingChunk(name))?
        .data)
}

/// Converts a [start, next) pair of zone-index entries into a bounded index range.
fn zone_range(start: u16, next: u16, len: usize) -> IndexRange<usize> {
    let start = (start as usize).min(len);
    let end = (next as usize).clamp(start, len);
    start..end
}

/// Builds one zone per zone-index record. The final zone-index record is the terminator
/// and only bounds the previous zone's generator and modulator ranges.
fn build_zones(
    table: &'static str,
    bags: &[ZoneIndex],
    generators: &[GeneratorRecord],
    modulators: &[ModulatorRecord],
) -> Vec<Zone> {
    let real_generators = generators.len().saturating_sub(1);
    let real_modulators = modulators.len().saturating_sub(1);

    let mut zones = Vec::with_capacity(bags.len().saturating_sub(1));
    for pair in bags.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if next.generator_start < current.generator_start
            || next.modulator_start < current.modulator_start
        {
            warn!(
                table,
                zone = zones.len(),
                "Zone index table is not monotonic, zone will be empty"
            );
        }

        let mut zone = Zone::new();
        let gens = zone_range(current.generator_start, next.generator_start, real_generators);
        for generator in &generators[gens] {
            zone.set_raw(generator.operator, generator.amount);
        }
        let mods = zone_range(current.modulator_start, next.modulator_start, real_modulators);
        for modulator in &modulators[mods] {
            zone.add_modulator(*modulator);
        }
        zones.push(zone);
    }

    debug!(table, zones = zones.len(), "Built zones");
    zones
}

fn read_info(list: &[u8]) -> Result<BankInfo, FormatError> {
    let mut info = BankInfo::default();
    for sub in chunk::chunks(list) {
        let sub = sub?;
        match &sub.id {
            b"INAM" => info.name = Some(chunk::fixed_name(sub.data)),
            b"ifil" if sub.data.len() >= 4 => {
                info.version = Some((chunk::le_u16(sub.data, 0), chunk::le_u16(sub.data, 2)))
            }
            _ => debug!(chunk = sub.id_str(), "Skipping INFO sub-chunk"),
        }
    }
    Ok(info)
}
