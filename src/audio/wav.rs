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
use std::error::Error;
use std::path::Path;

use tracing::info;

use crate::config::TimedCommand;
use crate::engine::{DspBackend, Renderer, SynthHandle, COMMAND_CAPACITY};

/// What an offline render produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    /// Largest absolute sample written.
    pub peak: f32,
}

/// Renders `commands` followed by `tail_frames` of silence into a 32-bit float stereo WAV.
///
/// Blocks are split at command frames, so every command lands on the exact frame it was
/// scheduled for. Commands must be sorted by frame.
pub fn render_to_wav<B: DspBackend>(
    handle: &SynthHandle,
    renderer: &mut Renderer<B>,
    commands: &[TimedCommand],
    tail_frames: u64,
    block_size: usize,
    path: &Path,
) -> Result<RenderSummary, Box<dyn Error>> {
    let sample_rate = renderer.engine().settings().sample_rate;
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;

    let total = commands.last().map(|c| c.frame).unwrap_or(0) + tail_frames;
    let block_size = block_size.max(1) as u64;
    let mut block = vec![0.0f32; block_size as usize * 2];
    let mut pending = commands.iter().peekable();
    let mut frame = 0u64;
    let mut peak = 0.0f32;

    // Rendering an empty block applies queued commands without advancing time.
    renderer.render_interleaved(&mut []);
    while frame < total {
        let mut queued = 0;
        while let Some(timed) = pending.next_if(|timed| timed.frame <= frame) {
            if queued == COMMAND_CAPACITY {
                renderer.render_interleaved(&mut []);
                queued = 0;
            }
            handle.send(timed.command.clone())?;
            queued += 1;
        }

        let until = pending
            .peek()
            .map(|timed| timed.frame.min(total))
            .unwrap_or(total);
        let frames = (until - frame).min(block_size);
        let out = &mut block[..frames as usize * 2];
        renderer.render_interleaved(out);
        for &sample in out.iter() {
            peak = peak.max(sample.abs());
            writer.write_sample(sample)?;
        }
        frame += frames;
    }
    writer.finalize()?;

    info!(
        path = %path.display(),
        frames = total,
        peak,
        "Rendered score."
    );
    Ok(RenderSummary {
        frames: total,
        peak,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{channel, Command, EngineSettings, ScalarBackend};
    use crate::region::LoopMode;
    use crate::testutil::region::constant_region;

    fn at(frame: u64, command: Command) -> TimedCommand {
        TimedCommand { frame, command }
    }

    #[test]
    fn test_render_score() {
        let (mut handle, mut renderer) = channel(EngineSettings::default(), ScalarBackend).unwrap();
        handle
            .set_preset(vec![
                constant_region(0.5, 1000).with_loop(LoopMode::Continuous, 0, 1000)
            ])
            .unwrap();

        let commands = vec![
            at(100, Command::NoteOn {
                note: 60,
                velocity: 127,
            }),
            at(1100, Command::NoteOff { note: 60 }),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let summary = render_to_wav(&handle, &mut renderer, &commands, 4410, 256, &path).unwrap();
        assert_eq!(summary.frames, 1100 + 4410);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);

        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len() as u64, summary.frames * 2);

        // Nothing before the note-on frame, sound while held, silence after the release.
        assert!(samples[..200].iter().all(|&s| s == 0.0));
        assert!(samples[1000 * 2] > 0.3);
        assert!(samples[(1100 + 4000) * 2..].iter().all(|&s| s == 0.0));
        assert!((summary.peak - 0.5 * std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_render_burst_larger_than_queue() {
        let (mut handle, mut renderer) = channel(EngineSettings::default(), ScalarBackend).unwrap();
        handle
            .set_preset(vec![
                constant_region(0.5, 1000).with_loop(LoopMode::Continuous, 0, 1000)
            ])
            .unwrap();

        let mut commands: Vec<TimedCommand> = (0..COMMAND_CAPACITY * 2)
            .map(|_| at(10, Command::NoteOff { note: 61 }))
            .collect();
        commands.push(at(10, Command::NoteOn {
            note: 60,
            velocity: 127,
        }));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("burst.wav");
        let summary = render_to_wav(&handle, &mut renderer, &commands, 1000, 256, &path).unwrap();
        assert!(summary.peak > 0.3);
    }

    #[test]
    fn test_render_empty_score() {
        let (handle, mut renderer) = channel(EngineSettings::default(), ScalarBackend).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        let summary = render_to_wav(&handle, &mut renderer, &[], 100, 64, &path).unwrap();
        assert_eq!(summary.frames, 100);
        assert_eq!(summary.peak, 0.0);
        assert_eq!(hound::WavReader::open(&path).unwrap().duration(), 100);
    }
}
