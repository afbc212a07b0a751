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
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use banksynth::audio::{render_to_wav, OutputDevice};
use banksynth::bank::BankFile;
use banksynth::config::{Score, SynthConfig};
use banksynth::engine::{channel, ScalarBackend};
use banksynth::region::{build_regions, Region, ResolveOptions};
use clap::{crate_version, Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sound bank player."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the presets in a bank file.
    Presets {
        /// The path to the bank file.
        bank_path: PathBuf,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Renders a score to a WAV file.
    Render {
        /// The path to the bank file.
        bank_path: PathBuf,
        /// The preset index, as listed by the presets command.
        preset: usize,
        /// The path to the score.
        score_path: PathBuf,
        /// The WAV file to write.
        output_path: PathBuf,
        /// The path to the synth config.
        #[arg[short, long]]
        config: Option<PathBuf>,
    },
    /// Plays a score through an audio device.
    Play {
        /// The path to the bank file.
        bank_path: PathBuf,
        /// The preset index, as listed by the presets command.
        preset: usize,
        /// The path to the score.
        score_path: PathBuf,
        /// The path to the synth config.
        #[arg[short, long]]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Presets { bank_path } => {
            let bank = BankFile::load(&bank_path)?;
            if let Some(name) = &bank.info().name {
                println!("Bank: {}", name);
            }
            if bank.preset_count() == 0 {
                println!("No presets found in {}.", bank_path.display());
                return Ok(());
            }

            println!("Presets (count: {}):", bank.preset_count());
            for (index, preset) in bank.presets().iter().enumerate() {
                let regions = build_regions(&bank, index, &ResolveOptions::default())?;
                println!(
                    "- {:>3}: {:03}:{:03} {} (regions: {})",
                    index,
                    preset.bank,
                    preset.program,
                    preset.name,
                    regions.len()
                );
            }
        }
        Commands::Devices {} => {
            let devices = OutputDevice::list()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Render {
            bank_path,
            preset,
            score_path,
            output_path,
            config,
        } => {
            let config = SynthConfig::load_or_default(config.as_deref())?;
            let regions = load_preset(&bank_path, preset, &config)?;
            let commands = Score::deserialize(&score_path)?.commands(config.sample_rate())?;

            let (mut handle, mut renderer) = channel(config.engine_settings(), ScalarBackend)?;
            handle.set_preset(regions)?;
            let tail = (config.tail()?.as_secs_f64() * config.sample_rate() as f64) as u64;
            let summary = render_to_wav(
                &handle,
                &mut renderer,
                &commands,
                tail,
                config.block_size(),
                &output_path,
            )?;

            println!(
                "Wrote {} ({:.2}s, peak {:.3}).",
                output_path.display(),
                summary.frames as f64 / config.sample_rate() as f64,
                summary.peak
            );
        }
        Commands::Play {
            bank_path,
            preset,
            score_path,
            config,
        } => {
            let config = SynthConfig::load_or_default(config.as_deref())?;
            let regions = load_preset(&bank_path, preset, &config)?;
            let commands = Score::deserialize(&score_path)?.commands(config.sample_rate())?;
            let device = OutputDevice::get(config.device())?;

            let (mut handle, renderer) = channel(config.engine_settings(), ScalarBackend)?;
            handle.set_preset(regions)?;
            let _playback = device.start(renderer, config.sample_rate(), config.block_size())?;

            let sample_rate = config.sample_rate() as f64;
            let start = Instant::now();
            for timed in commands {
                let due = start + Duration::from_secs_f64(timed.frame as f64 / sample_rate);
                spin_sleep::sleep(due.saturating_duration_since(Instant::now()));
                handle.send(timed.command)?;
            }
            spin_sleep::sleep(config.tail()?);
            info!(device = device.name(), "Finished playing score.");
        }
    }

    Ok(())
}

/// Loads a bank and resolves one of its presets.
fn load_preset(
    bank_path: &Path,
    preset: usize,
    config: &SynthConfig,
) -> Result<Vec<Region>, Box<dyn Error>> {
    let bank = BankFile::load(bank_path)?;
    let regions = build_regions(&bank, preset, &config.resolve_options())?;
    if regions.is_empty() {
        return Err(format!("preset {} has no playable regions", preset).into());
    }
    Ok(regions)
}
