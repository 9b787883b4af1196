//! midiscope - a terminal MIDI player with a live waveform.
//!
//! Plays a Standard MIDI File through a SoundFont and draws the most recent
//! output as a scrolling waveform.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- TimGM6mb.sf2 flourish.mid                 # Play with the waveform view
//! cargo run -- TimGM6mb.sf2 flourish.mid --export out.wav # Render to WAV instead
//! ```
//!
//! Press space to pause and `q` to quit.

use anyhow::{Context, Result};
use midiscope::audio::{export_to_wav, load_song, AudioStreamBridge, Playback};
use midiscope::config::{self, Command, Config, USAGE};
use midiscope::ui;
use std::path::Path;
use tracing::info;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let command = match config::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    match command {
        Command::Help => {
            eprintln!("{}", USAGE);
            Ok(())
        }
        Command::Export { config, output } => export(&config, &output),
        Command::Play(config) => play(&config),
    }
}

/// Loads the song, starts audio output and runs the viewer.
fn play(config: &Config) -> Result<()> {
    info!(?config, "starting playback");

    let (sequencer, song) = load_song(config)?;
    let bridge = AudioStreamBridge::new(sequencer, config.history_len)
        .context("Failed to create audio bridge")?;
    let playback = Playback::start(bridge, config)?;

    ui::run(&playback, &song, config)
}

/// Renders the song to a WAV file, printing progress to stderr.
fn export(config: &Config, output: &Path) -> Result<()> {
    let mut last_percent = 0;
    let progress = |fraction: f32| {
        let percent = (fraction * 100.0) as u32;
        if percent >= last_percent + 10 {
            eprintln!("Exporting... {}%", percent);
            last_percent = percent;
        }
    };

    export_to_wav(config, output, Some(progress))?;
    eprintln!("Exported to {}", output.display());
    Ok(())
}
