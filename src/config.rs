//! Startup configuration.
//!
//! Everything the player needs to know before it starts: where the SoundFont
//! and MIDI file live, the output sample rate, how many samples the waveform
//! window keeps, and how the terminal view is paced and scaled.
//!
//! Values come from built-in defaults, then an optional JSON file given with
//! `--config`, then individual command-line flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sample rate for synthesis and output (44.1 kHz standard).
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Number of combined samples kept for the waveform view.
pub const DEFAULT_HISTORY_LEN: usize = 512;

/// Frames rendered per output callback. A tenth of a second at 44.1 kHz.
pub const DEFAULT_BLOCK_FRAMES: usize = 4410;

/// Lowest and highest sample rates accepted by `validate`.
const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8000..=192_000;

/// Errors raised while building or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value the player cannot run with.
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid JSON for this structure.
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A flag that takes a value was the last argument.
    #[error("{0} requires a value")]
    MissingValue(String),
    /// An argument that is neither a known flag nor a recognised file.
    #[error("unknown option: {0}")]
    UnknownOption(String),
}

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SoundFont file (.sf2).
    pub soundfont: PathBuf,
    /// Path to the Standard MIDI File to play.
    pub midi: PathBuf,
    /// Synthesis and output sample rate in Hz.
    pub sample_rate: u32,
    /// Length of the rolling waveform window, in samples.
    pub history_len: usize,
    /// Frames rendered per output callback.
    pub block_frames: usize,
    /// Restart the song when it ends.
    pub loop_playback: bool,
    /// Delay between UI redraws in milliseconds.
    pub frame_interval_ms: u64,
    /// Vertical scale of the waveform as a fraction of the view height.
    pub gain: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            soundfont: PathBuf::from("TimGM6mb.sf2"),
            midi: PathBuf::from("song.mid"),
            sample_rate: DEFAULT_SAMPLE_RATE,
            history_len: DEFAULT_HISTORY_LEN,
            block_frames: DEFAULT_BLOCK_FRAMES,
            loop_playback: true,
            frame_interval_ms: 16,
            gain: 0.25,
        }
    }
}

impl Config {
    /// Loads a config from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_len == 0 {
            return Err(invalid("history_len", "must be at least 1"));
        }
        if self.block_frames == 0 {
            return Err(invalid("block_frames", "must be at least 1"));
        }
        if !SAMPLE_RATE_RANGE.contains(&self.sample_rate) {
            return Err(invalid(
                "sample_rate",
                format!(
                    "{} Hz is outside {}..={} Hz",
                    self.sample_rate,
                    SAMPLE_RATE_RANGE.start(),
                    SAMPLE_RATE_RANGE.end()
                ),
            ));
        }
        if !self.gain.is_finite() || self.gain <= 0.0 {
            return Err(invalid("gain", "must be a positive number"));
        }
        if self.frame_interval_ms == 0 {
            return Err(invalid("frame_interval_ms", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// What the command line asked the program to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play the song with the live waveform view.
    Play(Config),
    /// Render the song to a WAV file and exit.
    Export { config: Config, output: PathBuf },
    /// Print usage and exit.
    Help,
}

/// Usage text printed for `--help`.
pub const USAGE: &str = "\
midiscope - play a MIDI file and watch the waveform

Usage: midiscope [OPTIONS] [SOUNDFONT.sf2] [SONG.mid]

Options:
  -c, --config PATH       Load settings from a JSON file
  -sf, --soundfont PATH   SoundFont file (.sf2)
  -m, --midi PATH         MIDI file (.mid)
  -r, --sample-rate HZ    Output sample rate
  -w, --history N         Waveform window length in samples
  -b, --block N           Frames rendered per audio callback
      --no-loop           Stop at the end of the song instead of looping
  -e, --export PATH       Render to a WAV file instead of playing
  -h, --help              Print this help message";

/// Parses command-line arguments (without the program name).
///
/// A `--config` file is applied first wherever it appears, so flags always
/// override values from the file. The resulting config is validated.
pub fn parse_args<I, S>(args: I) -> Result<Command, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    let mut config = match config_file_arg(&args)? {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    let mut export: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => return Ok(Command::Help),
            "--config" | "-c" => i += 1,
            "--soundfont" | "-sf" => config.soundfont = PathBuf::from(value(&args, i)?),
            "--midi" | "-m" => config.midi = PathBuf::from(value(&args, i)?),
            "--sample-rate" | "-r" => config.sample_rate = number(&args, i, "sample_rate")?,
            "--history" | "-w" => config.history_len = number(&args, i, "history_len")?,
            "--block" | "-b" => config.block_frames = number(&args, i, "block_frames")?,
            "--export" | "-e" => export = Some(PathBuf::from(value(&args, i)?)),
            "--no-loop" => config.loop_playback = false,
            other => {
                let lower = other.to_ascii_lowercase();
                if lower.ends_with(".sf2") {
                    config.soundfont = PathBuf::from(other);
                } else if lower.ends_with(".mid") || lower.ends_with(".midi") {
                    config.midi = PathBuf::from(other);
                } else {
                    return Err(ConfigError::UnknownOption(other.to_string()));
                }
            }
        }
        if takes_value(flag) {
            i += 1;
        }
        i += 1;
    }

    config.validate()?;

    Ok(match export {
        Some(output) => Command::Export { config, output },
        None => Command::Play(config),
    })
}

fn takes_value(flag: &str) -> bool {
    matches!(
        flag,
        "--soundfont"
            | "-sf"
            | "--midi"
            | "-m"
            | "--sample-rate"
            | "-r"
            | "--history"
            | "-w"
            | "--block"
            | "-b"
            | "--export"
            | "-e"
    )
}

fn config_file_arg(args: &[String]) -> Result<Option<&str>, ConfigError> {
    match args.iter().position(|a| a == "--config" || a == "-c") {
        Some(i) => value(args, i).map(Some),
        None => Ok(None),
    }
}

fn value(args: &[String], i: usize) -> Result<&str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue(args[i].clone()))
}

fn number<T: std::str::FromStr>(
    args: &[String],
    i: usize,
    field: &'static str,
) -> Result<T, ConfigError> {
    let raw = value(args, i)?;
    raw.parse()
        .map_err(|_| invalid(field, format!("'{}' is not a valid number", raw)))
}
