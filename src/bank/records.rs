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

//! Fixed-size record layouts of the bank's preset/instrument/sample tables.

use super::chunk::{fixed_name, le_i16, le_u16, le_u32};
use super::error::FormatError;

pub const PRESET_HEADER_SIZE: usize = 38;
pub const INSTRUMENT_HEADER_SIZE: usize = 22;
pub const ZONE_INDEX_SIZE: usize = 4;
pub const GENERATOR_SIZE: usize = 4;
pub const MODULATOR_SIZE: usize = 10;
pub const SAMPLE_HEADER_SIZE: usize = 46;

/// A preset header (`phdr`).
#[derive(Debug, Clone, PartialEq)]
pub struct PresetHeader {
    pub name: String,
    /// MIDI program number.
    pub program: u16,
    /// MIDI bank number.
    pub bank: u16,
    /// Index of this preset's first zone in the preset zone-index table.
    pub zone_start: u16,
    pub library: u32,
    pub genre: u32,
    pub morphology: u32,
}

impl PresetHeader {
    fn read(rec: &[u8]) -> Self {
        PresetHeader {
            name: fixed_name(&rec[0..20]),
            program: le_u16(rec, 20),
            bank: le_u16(rec, 22),
            zone_start: le_u16(rec, 24),
            library: le_u32(rec, 26),
            genre: le_u32(rec, 30),
            morphology: le_u32(rec, 34),
        }
    }
}

/// An instrument header (`inst`).
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentHeader {
    pub name: String,
    /// Index of this instrument's first zone in the instrument zone-index table.
    pub zone_start: u16,
}

impl InstrumentHeader {
    fn read(rec: &[u8]) -> Self {
        InstrumentHeader {
            name: fixed_name(&rec[0..20]),
            zone_start: le_u16(rec, 20),
        }
    }
}

/// A zone-index record (`pbag`/`ibag`): where a zone's generators and modulators begin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneIndex {
    pub generator_start: u16,
    pub modulator_start: u16,
}

impl ZoneIndex {
    fn read(rec: &[u8]) -> Self {
        ZoneIndex {
            generator_start: le_u16(rec, 0),
            modulator_start: le_u16(rec, 2),
        }
    }
}

/// A generator record (`pgen`/`igen`). The amount is kept as raw signed bits; range
/// generators reinterpret it as two bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorRecord {
    pub operator: u16,
    pub amount: i16,
}

impl GeneratorRecord {
    fn read(rec: &[u8]) -> Self {
        GeneratorRecord {
            operator: le_u16(rec, 0),
            amount: le_i16(rec, 2),
        }
    }
}

/// A modulator record (`pmod`/`imod`). Parsed and kept with its zone, never applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulatorRecord {
    pub source: u16,
    pub destination: u16,
    pub amount: i16,
    pub amount_source: u16,
    pub transform: u16,
}

impl ModulatorRecord {
    fn read(rec: &[u8]) -> Self {
        ModulatorRecord {
            source: le_u16(rec, 0),
            destination: le_u16(rec, 2),
            amount: le_i16(rec, 4),
            amount_source: le_u16(rec, 6),
            transform: le_u16(rec, 8),
        }
    }
}

/// Sample-type bits of a sample header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleKind(pub u16);

impl SampleKind {
    pub const MONO: u16 = 1;
    pub const RIGHT: u16 = 2;
    pub const LEFT: u16 = 4;
    pub const LINKED: u16 = 8;
    pub const ROM: u16 = 0x8000;

    pub fn is_left(&self) -> bool {
        self.0 & Self::LEFT != 0
    }

    pub fn is_right(&self) -> bool {
        self.0 & Self::RIGHT != 0
    }

    pub fn is_rom(&self) -> bool {
        self.0 & Self::ROM != 0
    }
}

/// A sample header (`shdr`). Offsets are in frames into the bank's sample pool.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleHeader {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u32,
    pub original_key: u8,
    /// Pitch correction in cents.
    pub pitch_correction: i8,
    /// Index of the other half of a stereo pair.
    pub link: u16,
    pub kind: SampleKind,
}

impl SampleHeader {
    fn read(rec: &[u8]) -> Self {
        SampleHeader {
            name: fixed_name(&rec[0..20]),
            start: le_u32(rec, 20),
            end: le_u32(rec, 24),
            loop_start: le_u32(rec, 28),
            loop_end: le_u32(rec, 32),
            sample_rate: le_u32(rec, 36),
            original_key: rec[40],
            pitch_correction: rec[41] as i8,
            link: le_u16(rec, 42),
            kind: SampleKind(le_u16(rec, 44)),
        }
    }
}

/// Splits a table into fixed-size records. The table must hold at least its terminator.
fn read_table<T>(
    table: &'static str,
    data: &[u8],
    record_size: usize,
    read: fn(&[u8]) -> T,
) -> Result<Vec<T>, FormatError> {
    if data.len() % record_size != 0 {
        return Err(FormatError::BadTableSize {
            table,
            len: data.len(),
            record_size,
        });
    }
    if data.is_empty() {
        return Err(FormatError::MissingTerminator(table));
    }
    Ok(data.chunks_exact(record_size).map(read).collect())
}

pub fn read_preset_headers(data: &[u8]) -> Result<Vec<PresetHeader>, FormatError> {
    read_table("phdr", data, PRESET_HEADER_SIZE, PresetHeader::read)
}

pub fn read_instrument_headers(data: &[u8]) -> Result<Vec<InstrumentHeader>, FormatError> {
    read_table("inst", data, INSTRUMENT_HEADER_SIZE, InstrumentHeader::read)
}

pub fn read_zone_indices(
    table: &'static str,
    data: &[u8],
) -> Result<Vec<ZoneIndex>, FormatError> {
    read_table(table, data, ZONE_INDEX_SIZE, ZoneIndex::read)
}

pub fn read_generators(
    table: &'static str,
    data: &[u8],
) -> Result<Vec<GeneratorRecord>, FormatError> {
    read_table(table, data, GENERATOR_SIZE, GeneratorRecord::read)
}

pub fn read_modulators(
    table: &'static str,
    data: &[u8],
) -> Result<Vec<ModulatorRecord>, FormatError> {
    read_table(table, data, MODULATOR_SIZE, ModulatorRecord::read)
}

pub fn read_sample_headers(data: &[u8]) -> Result<Vec<SampleHeader>, FormatError> {
    read_table("shdr", data, SAMPLE_HEADER_SIZE, SampleHeader::read)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_header_layout() {
        let mut rec = vec![0u8; SAMPLE_HEADER_SIZE];
        rec[..4].copy_from_slice(b"Kick");
        rec[20..24].copy_from_slice(&10u32.to_le_bytes());
        rec[24..28].copy_from_slice(&500u32.to_le_bytes());
        rec[28..32].copy_from_slice(&100u32.to_le_bytes());
        rec[32..36].copy_from_slice(&400u32.to_le_bytes());
        rec[36..40].copy_from_slice(&22050u32.to_le_bytes());
        rec[40] = 36;
        rec[41] = (-7i8) as u8;
        rec[42..44].copy_from_slice(&3u16.to_le_bytes());
        rec[44..46].copy_from_slice(&SampleKind::LEFT.to_le_bytes());

        let headers = read_sample_headers(&rec).unwrap();
        assert_eq!(headers.len(), 1);
        let header = &headers[0];
        assert_eq!(header.name, "Kick");
        assert_eq!(header.start, 10);
        assert_eq!(header.end, 500);
        assert_eq!(header.loop_start, 100);
        assert_eq!(header.loop_end, 400);
        assert_eq!(header.sample_rate, 22050);
        assert_eq!(header.original_key, 36);
        assert_eq!(header.pitch_correction, -7);
        assert_eq!(header.link, 3);
        assert!(header.kind.is_left());
        assert!(!header.kind.is_right());
        assert!(!header.kind.is_rom());
    }

    #[test]
    fn test_preset_header_layout() {
        let mut rec = vec![0u8; PRESET_HEADER_SIZE];
        rec[..5].copy_from_slice(b"Organ");
        rec[20..22].copy_from_slice(&19u16.to_le_bytes());
        rec[22..24].copy_from_slice(&128u16.to_le_bytes());
        rec[24..26].copy_from_slice(&7u16.to_le_bytes());

        let headers = read_preset_headers(&rec).unwrap();
        assert_eq!(headers[0].name, "Organ");
        assert_eq!(headers[0].program, 19);
        assert_eq!(headers[0].bank, 128);
        assert_eq!(headers[0].zone_start, 7);
    }

    #[test]
    fn test_bad_table_size() {
        let err = read_generators("pgen", &[0u8; 6]).unwrap_err();
        assert!(matches!(
            err,
            FormatError::BadTableSize {
                table: "pgen",
                len: 6,
                record_size: 4
            }
        ));
    }

    #[test]
    fn test_empty_table_has_no_terminator() {
        let err = read_zone_indices("ibag", &[]).unwrap_err();
        assert!(matches!(err, FormatError::MissingTerminator("ibag")));
    }

    #[test]
    fn test_modulator_layout() {
        let mut rec = vec![0u8; MODULATOR_SIZE];
        rec[0..2].copy_from_slice(&0x0502u16.to_le_bytes());
        rec[2..4].copy_from_slice(&48u16.to_le_bytes());
        rec[4..6].copy_from_slice(&(-960i16).to_le_bytes());

        let mods = read_modulators("pmod", &rec).unwrap();
        assert_eq!(mods[0].source, 0x0502);
        assert_eq!(mods[0].destination, 48);
        assert_eq!(mods[0].amount, -960);
    }
}
