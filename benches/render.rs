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
use std::sync::Arc;

use banksynth::engine::{EngineSettings, ScalarBackend, VoiceEngine};
use banksynth::region::{LoopMode, Region, SampleData};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const BLOCK_FRAMES: usize = 256;

fn looped_sine(frames: usize, sample_rate: u32) -> Region {
    let data: Vec<f32> = (0..frames)
        .map(|i| (i as f64 / 100.0 * std::f64::consts::TAU).sin() as f32 * 0.5)
        .collect();
    Region::new(SampleData::mono(data.into(), sample_rate)).with_loop(
        LoopMode::Continuous,
        0,
        frames,
    )
}

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_block");

    for (name, filtered) in [("unfiltered", false), ("filtered", true)] {
        for voices in [1usize, 8, 32] {
            let mut region = looped_sine(44100, 44100);
            if filtered {
                region.filter.initial_cutoff = 8000.0;
                region.pitch.vib_lfo_to_pitch = 20.0;
            }
            let regions: Arc<[Region]> = vec![region].into();

            let mut engine =
                VoiceEngine::new(EngineSettings::default(), ScalarBackend).expect("engine");
            engine.set_regions(regions);
            for note in 0..voices {
                engine.note_on(36 + note as u8, 100);
            }

            let mut out = vec![0.0f32; BLOCK_FRAMES * 2];
            group.bench_with_input(BenchmarkId::new(name, voices), &voices, |b, _| {
                b.iter(|| {
                    engine.render_interleaved(black_box(&mut out));
                    black_box(out[0])
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_render);
criterion_main!(benches);
