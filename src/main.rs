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
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use hapsynth::hap::Hap;
use hapsynth::render::{Renderer, Trigger};
use hapsynth::samples::loader::FileBufferLoader;
use hapsynth::samples::SampleRegistry;
use hapsynth::scheduler::Scheduler;
use hapsynth::{audio, config};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Time between rendering a tone and its onset.
const TONE_LEAD: f64 = 0.1;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays pattern events as synthesized tones and samples."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Plays a hap sequence through the configured audio device.
    Play {
        /// The path to the player config.
        player_path: String,
        /// The path to the sequence.
        sequence_path: String,
        /// The number of cycles to play. Plays forever if not given.
        #[arg(short, long)]
        cycles: Option<f64>,
    },
    /// Plays a single synthesized note.
    Tone {
        /// The path to the player config.
        player_path: String,
        /// A note name (e.g. c3) or MIDI number.
        note: String,
        /// The waveform: sine, square, triangle or sawtooth.
        #[arg(short, long, default_value = "triangle")]
        wave: String,
        /// Length of the note in seconds.
        #[arg(short, long, default_value_t = 1.0)]
        duration: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            player_path,
            sequence_path,
            cycles,
        } => {
            let player_path = PathBuf::from(player_path);
            let player = config::load_player(&player_path)?;
            let sequence = config::load_sequence(&PathBuf::from(sequence_path))?;

            let (registry, base_path) = match player.samples(&player_path) {
                Some(samples_path) => {
                    let samples = config::load_samples(&samples_path)?;
                    (samples.registry, samples.base_path)
                }
                None => (
                    SampleRegistry::new(),
                    player_path
                        .parent()
                        .map(PathBuf::from)
                        .unwrap_or_default(),
                ),
            };

            let clock = audio::get_clock(player.audio())?;
            let sample_rate = clock.sample_rate();
            let loader = FileBufferLoader::new(base_path, sample_rate);
            let mut renderer = Renderer::new(clock, Arc::new(registry), Arc::new(loader))
                .with_transposition(player.transpose());
            if let Some(instruments) = player.instruments() {
                let directory = player_path.parent().map(PathBuf::from).unwrap_or_default();
                let loader = Arc::new(FileBufferLoader::new(directory, sample_rate));
                renderer = renderer.with_instruments(Arc::new(instruments.resolver(loader)));
            }

            let cps = sequence.cps;
            let scheduler = Scheduler::new(Arc::new(sequence), Arc::new(renderer), cps)
                .with_latency(player.audio().latency()?);
            scheduler.run(cycles).await;

            // Let the last events ring out.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        Commands::Tone {
            player_path,
            note,
            wave,
            duration,
        } => {
            let player = config::load_player(&PathBuf::from(player_path))?;
            let clock = audio::get_clock(player.audio())?;
            let loader = FileBufferLoader::new(PathBuf::new(), clock.sample_rate());
            let renderer = Renderer::new(clock, Arc::new(SampleRegistry::new()), Arc::new(loader));

            let note = match note.parse::<f64>() {
                Ok(midi) => json!(midi),
                Err(_) => json!(note),
            };
            let trigger = Trigger {
                hap: Hap::new(0.0, duration, json!({"s": wave, "note": note})),
                onset: TONE_LEAD,
                reference: 0.0,
                cps: 1.0,
            };

            let scheduled = renderer.try_render(&trigger).await?;
            let remaining = scheduled.stop - scheduled.start + TONE_LEAD;
            tokio::time::sleep(Duration::try_from_secs_f64(remaining.max(0.0))?).await;
        }
    }

    Ok(())
}
