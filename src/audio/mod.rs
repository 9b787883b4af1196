//! Audio rendering and output.
//!
//! This module connects rustysynth synthesis to rodio playback:
//! - Loading SoundFont and MIDI files into a playing sequencer
//! - The streaming bridge that renders blocks and keeps the waveform window
//! - A rodio source that drives the bridge from the audio thread
//! - WAV export through the same bridge

pub mod bridge;
pub mod engine;
pub mod export;
pub mod output;

pub use bridge::{AudioStreamBridge, BridgeError, WaveHistory};
pub use engine::{load_song, SongInfo, SynthesisEngine};
pub use export::export_to_wav;
pub use output::Playback;
