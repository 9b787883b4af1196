//! midiscope - play a MIDI file and watch the waveform in the terminal.
//!
//! This library provides the audio bridge, output source, export and
//! terminal view used by the `midiscope` binary.

pub mod audio;
pub mod config;
pub mod ui;

// Re-export commonly used types
pub use audio::{AudioStreamBridge, BridgeError, SynthesisEngine, WaveHistory};
pub use config::{Command, Config, ConfigError};
