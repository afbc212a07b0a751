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

//! In-memory sound bank writer for tests. Produces byte-exact containers with
//! terminator records, so the reader and resolver can be tested without fixtures.

use std::collections::HashSet;

use crate::bank::{ModulatorRecord, SampleKind, Zone};

/// A sample to place in the pool.
#[derive(Clone)]
pub struct TestSample {
    pub name: String,
    pub data: Vec<i16>,
    pub sample_rate: u32,
    pub root_key: u8,
    pub pitch_correction: i8,
    /// Loop points relative to the sample start.
    pub loop_points: (u32, u32),
    pub link: u16,
    pub kind: u16,
}

impl TestSample {
    pub fn new(name: &str, data: Vec<i16>, sample_rate: u32, root_key: u8) -> Self {
        let len = data.len() as u32;
        TestSample {
            name: name.to_string(),
            data,
            sample_rate,
            root_key,
            pitch_correction: 0,
            loop_points: (0, len),
            link: 0,
            kind: SampleKind::MONO,
        }
    }

    /// A half-scale sine with a period of 100 frames.
    pub fn sine(name: &str, frames: usize, sample_rate: u32, root_key: u8) -> Self {
        let data = (0..frames)
            .map(|i| {
                let phase = i as f64 / 100.0 * std::f64::consts::TAU;
                (phase.sin() * 16384.0) as i16
            })
            .collect();
        Self::new(name, data, sample_rate, root_key)
    }

    /// A constant-valued sample, handy for checking gains exactly.
    pub fn constant(name: &str, frames: usize, value: i16, sample_rate: u32) -> Self {
        Self::new(name, vec![value; frames], sample_rate, 60)
    }

    pub fn with_loop(mut self, start: u32, end: u32) -> Self {
        self.loop_points = (start, end);
        self
    }

    pub fn with_link(mut self, link: u16, kind: u16) -> Self {
        self.link = link;
        self.kind = kind;
        self
    }

    pub fn with_pitch_correction(mut self, cents: i8) -> Self {
        self.pitch_correction = cents;
        self
    }
}

/// An instrument: a name and its zones in file order.
#[derive(Clone)]
pub struct TestInstrument {
    pub name: String,
    pub zones: Vec<Zone>,
}

impl TestInstrument {
    pub fn new(name: &str) -> Self {
        TestInstrument {
            name: name.to_string(),
            zones: Vec::new(),
        }
    }

    pub fn zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }
}

/// A preset: a name, bank/program and its zones in file order.
#[derive(Clone)]
pub struct TestPreset {
    pub name: String,
    pub bank: u16,
    pub program: u16,
    pub zones: Vec<Zone>,
}

impl TestPreset {
    pub fn new(name: &str, bank: u16, program: u16) -> Self {
        TestPreset {
            name: name.to_string(),
            bank,
            program,
            zones: Vec::new(),
        }
    }

    pub fn zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }
}

/// Frames of silence written after every sample, as real banks do.
const SAMPLE_PADDING: usize = 46;

#[derive(Default)]
pub struct BankBuilder {
    samples: Vec<TestSample>,
    instruments: Vec<TestInstrument>,
    presets: Vec<TestPreset>,
    omitted: HashSet<[u8; 4]>,
}

impl BankBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample and returns its sample index.
    pub fn add_sample(&mut self, sample: TestSample) -> usize {
        self.samples.push(sample);
        self.samples.len() - 1
    }

    /// Adds an instrument and returns its instrument index.
    pub fn add_instrument(&mut self, instrument: TestInstrument) -> usize {
        self.instruments.push(instrument);
        self.instruments.len() - 1
    }

    /// Adds a preset and returns its preset index.
    pub fn add_preset(&mut self, preset: TestPreset) -> usize {
        self.presets.push(preset);
        self.presets.len() - 1
    }

    /// Leaves a sub-chunk out of the output, to exercise missing-table errors.
    pub fn omit_chunk(&mut self, id: [u8; 4]) {
        self.omitted.insert(id);
    }

    pub fn build(&self) -> Vec<u8> {
        // Sample pool and headers.
        let mut pool: Vec<u8> = Vec::new();
        let mut shdr: Vec<u8> = Vec::new();
        let mut frame = 0u32;
        for sample in &self.samples {
            let start = frame;
            for value in &sample.data {
                pool.extend_from_slice(&value.to_le_bytes());
            }
            pool.extend(std::iter::repeat(0u8).take(SAMPLE_PADDING * 2));
            frame += (sample.data.len() + SAMPLE_PADDING) as u32;

            push_name(&mut shdr, &sample.name);
            shdr.extend_from_slice(&start.to_le_bytes());
            shdr.extend_from_slice(&(start + sample.data.len() as u32).to_le_bytes());
            shdr.extend_from_slice(&(start + sample.loop_points.0).to_le_bytes());
            shdr.extend_from_slice(&(start + sample.loop_points.1).to_le_bytes());
            shdr.extend_from_slice(&sample.sample_rate.to_le_bytes());
            shdr.push(sample.root_key);
            shdr.push(sample.pitch_correction as u8);
            shdr.extend_from_slice(&sample.link.to_le_bytes());
            shdr.extend_from_slice(&sample.kind.to_le_bytes());
        }
        push_name(&mut shdr, "EOS");
        shdr.extend(std::iter::repeat(0u8).take(26));

        // Instruments.
        let mut inst = Vec::new();
        let mut ibag = Vec::new();
        let mut igen = Vec::new();
        let mut imod = Vec::new();
        let (mut gen_index, mut mod_index, mut bag_index) = (0u16, 0u16, 0u16);
        for instrument in &self.instruments {
            push_name(&mut inst, &instrument.name);
            inst.extend_from_slice(&bag_index.to_le_bytes());
            write_zones(
                &instrument.zones,
                &mut ibag,
                &mut igen,
                &mut imod,
                &mut gen_index,
                &mut mod_index,
            );
            bag_index += instrument.zones.len() as u16;
        }
        push_name(&mut inst, "EOI");
        inst.extend_from_slice(&bag_index.to_le_bytes());
        push_terminators(&mut ibag, &mut igen, &mut imod, gen_index, mod_index);

        // Presets.
        let mut phdr = Vec::new();
        let mut pbag = Vec::new();
        let mut pgen = Vec::new();
        let mut pmod = Vec::new();
        let (mut gen_index, mut mod_index, mut bag_index) = (0u16, 0u16, 0u16);
        for preset in &self.presets {
            push_name(&mut phdr, &preset.name);
            phdr.extend_from_slice(&preset.program.to_le_bytes());
            phdr.extend_from_slice(&preset.bank.to_le_bytes());
            phdr.extend_from_slice(&bag_index.to_le_bytes());
            phdr.extend(std::iter::repeat(0u8).take(12));
            write_zones(
                &preset.zones,
                &mut pbag,
                &mut pgen,
                &mut pmod,
                &mut gen_index,
                &mut mod_index,
            );
            bag_index += preset.zones.len() as u16;
        }
        push_name(&mut phdr, "EOP");
        phdr.extend(std::iter::repeat(0u8).take(4));
        phdr.extend_from_slice(&bag_index.to_le_bytes());
        phdr.extend(std::iter::repeat(0u8).take(12));
        push_terminators(&mut pbag, &mut pgen, &mut pmod, gen_index, mod_index);

        let mut info = Vec::new();
        let mut version = Vec::new();
        version.extend_from_slice(&2u16.to_le_bytes());
        version.extend_from_slice(&1u16.to_le_bytes());
        info.extend(self.chunk(b"ifil", &version));
        info.extend(self.chunk(b"INAM", b"Test Bank\0"));

        let sdta = self.chunk(b"smpl", &pool);

        let mut pdta = Vec::new();
        for (id, data) in [
            (b"phdr", &phdr),
            (b"pbag", &pbag),
            (b"pmod", &pmod),
            (b"pgen", &pgen),
            (b"inst", &inst),
            (b"ibag", &ibag),
            (b"imod", &imod),
            (b"igen", &igen),
            (b"shdr", &shdr),
        ] {
            pdta.extend(self.chunk(id, data));
        }

        let mut body = b"sfbk".to_vec();
        body.extend(list(b"INFO", &info));
        body.extend(list(b"sdta", &sdta));
        body.extend(list(b"pdta", &pdta));
        raw_chunk(b"RIFF", &body)
    }

    fn chunk(&self, id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        if self.omitted.contains(id) {
            return Vec::new();
        }
        raw_chunk(id, payload)
    }
}

fn write_zones(
    zones: &[Zone],
    bags: &mut Vec<u8>,
    gens: &mut Vec<u8>,
    mods: &mut Vec<u8>,
    gen_index: &mut u16,
    mod_index: &mut u16,
) {
    for zone in zones {
        bags.extend_from_slice(&gen_index.to_le_bytes());
        bags.extend_from_slice(&mod_index.to_le_bytes());
        for (operator, amount) in zone.generators() {
            gens.extend_from_slice(&operator.to_le_bytes());
            gens.extend_from_slice(&amount.to_le_bytes());
            *gen_index += 1;
        }
        for modulator in zone.modulators() {
            push_modulator(mods, modulator);
            *mod_index += 1;
        }
    }
}

fn push_terminators(
    bags: &mut Vec<u8>,
    gens: &mut Vec<u8>,
    mods: &mut Vec<u8>,
    gen_index: u16,
    mod_index: u16,
) {
    bags.extend_from_slice(&gen_index.to_le_bytes());
    bags.extend_from_slice(&mod_index.to_le_bytes());
    gens.extend(std::iter::repeat(0u8).take(4));
    mods.extend(std::iter::repeat(0u8).take(10));
}

fn push_modulator(out: &mut Vec<u8>, modulator: &ModulatorRecord) {
    out.extend_from_slice(&modulator.source.to_le_bytes());
    out.extend_from_slice(&modulator.destination.to_le_bytes());
    out.extend_from_slice(&modulator.amount.to_le_bytes());
    out.extend_from_slice(&modulator.amount_source.to_le_bytes());
    out.extend_from_slice(&modulator.transform.to_le_bytes());
}

fn push_name(out: &mut Vec<u8>, name: &str) {
    let mut field = [0u8; 20];
    let bytes = name.as_bytes();
    let len = bytes.len().min(19);
    field[..len].copy_from_slice(&bytes[..len]);
    out.extend_from_slice(&field);
}

fn raw_chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    out.extend_from_slice(id);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(form: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut body = form.to_vec();
    body.extend_from_slice(payload);
    raw_chunk(b"LIST", &body)
}
