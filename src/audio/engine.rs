//! Synthesis engines for the audio bridge.
//!
//! The bridge only needs something that can fill a left and right buffer
//! with the next chunk of audio. That capability is the [`SynthesisEngine`]
//! trait. rustysynth's sequencer and raw synthesizer both implement it, and
//! this module also loads the SoundFont and MIDI file they play from.

use crate::config::Config;
use anyhow::{Context, Result};
use rustysynth::{MidiFile, MidiFileSequencer, SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Something that produces stereo audio on demand.
///
/// Implementations fill both buffers with exactly `left.len()` new frames
/// and advance their playback position. Both buffers always have the same
/// length. Rendering cannot fail; an engine with nothing to play writes
/// silence.
pub trait SynthesisEngine: Send {
    /// Renders the next `left.len()` frames.
    fn render(&mut self, left: &mut [f32], right: &mut [f32]);
}

impl SynthesisEngine for MidiFileSequencer {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        MidiFileSequencer::render(self, left, right);
    }
}

impl SynthesisEngine for Synthesizer {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        Synthesizer::render(self, left, right);
    }
}

impl<E: SynthesisEngine + ?Sized> SynthesisEngine for Box<E> {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        (**self).render(left, right);
    }
}

/// Loads a SoundFont file.
///
/// # Errors
///
/// Returns error if the file cannot be opened or is not a valid SoundFont.
pub fn load_soundfont<P: AsRef<Path>>(path: P) -> Result<Arc<SoundFont>> {
    let path = path.as_ref();
    let mut file = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open SoundFont: {}", path.display()))?,
    );
    let soundfont = SoundFont::new(&mut file)
        .map_err(|e| anyhow::anyhow!("Failed to load SoundFont {}: {:?}", path.display(), e))?;

    info!(
        path = %path.display(),
        presets = soundfont.get_presets().len(),
        "loaded SoundFont"
    );
    Ok(Arc::new(soundfont))
}

/// Loads a Standard MIDI File.
///
/// # Errors
///
/// Returns error if the file cannot be opened or parsed.
pub fn load_midi_file<P: AsRef<Path>>(path: P) -> Result<Arc<MidiFile>> {
    let path = path.as_ref();
    let mut file = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open MIDI file: {}", path.display()))?,
    );
    let midi = MidiFile::new(&mut file)
        .map_err(|e| anyhow::anyhow!("Failed to parse MIDI file {}: {:?}", path.display(), e))?;

    info!(
        path = %path.display(),
        length_secs = midi.get_length(),
        "loaded MIDI file"
    );
    Ok(Arc::new(midi))
}

/// Creates a sequencer playing `midi` through `soundfont`.
///
/// Playback starts immediately; the first `render` call produces the start
/// of the song.
pub fn build_sequencer(
    soundfont: &Arc<SoundFont>,
    midi: &Arc<MidiFile>,
    sample_rate: u32,
    loop_playback: bool,
) -> Result<MidiFileSequencer> {
    let settings = SynthesizerSettings::new(sample_rate as i32);
    let synth = Synthesizer::new(soundfont, &settings)
        .map_err(|e| anyhow::anyhow!("Failed to create synthesizer: {:?}", e))?;

    let mut sequencer = MidiFileSequencer::new(synth);
    sequencer.play(midi, loop_playback);
    Ok(sequencer)
}

/// Display information about the song being played.
#[derive(Debug, Clone, PartialEq)]
pub struct SongInfo {
    /// File name of the MIDI file.
    pub midi_name: String,
    /// File name of the SoundFont.
    pub soundfont_name: String,
    /// Song length in seconds.
    pub length_secs: f64,
}

impl SongInfo {
    fn new(config: &Config, midi: &MidiFile) -> Self {
        Self {
            midi_name: file_name(&config.midi),
            soundfont_name: file_name(&config.soundfont),
            length_secs: midi.get_length(),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Loads both input files named by `config` and returns a playing sequencer.
///
/// # Errors
///
/// Returns error if either file is missing or invalid, or if the
/// synthesizer rejects the configured sample rate.
pub fn load_song(config: &Config) -> Result<(MidiFileSequencer, SongInfo)> {
    let soundfont = load_soundfont(&config.soundfont)?;
    let midi = load_midi_file(&config.midi)?;
    let sequencer = build_sequencer(&soundfont, &midi, config.sample_rate, config.loop_playback)?;
    Ok((sequencer, SongInfo::new(config, &midi)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Constant(f32);

    impl SynthesisEngine for Constant {
        fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
            left.fill(self.0);
            right.fill(-self.0);
        }
    }

    #[test]
    fn test_boxed_engine_delegates() {
        let mut engine: Box<dyn SynthesisEngine> = Box::new(Constant(0.5));
        let mut left = [0.0; 3];
        let mut right = [0.0; 3];
        engine.render(&mut left, &mut right);
        assert_eq!(left, [0.5; 3]);
        assert_eq!(right, [-0.5; 3]);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("fonts/TimGM6mb.sf2")), "TimGM6mb.sf2");
        assert_eq!(file_name(Path::new("song.mid")), "song.mid");
    }

    #[test]
    fn test_missing_files_report_path() {
        let err = load_soundfont("/no/such/font.sf2").unwrap_err();
        assert!(format!("{:#}", err).contains("/no/such/font.sf2"));

        let err = load_midi_file("/no/such/song.mid").unwrap_err();
        assert!(format!("{:#}", err).contains("/no/such/song.mid"));
    }

    #[test]
    #[ignore] // Requires SoundFont and MIDI files
    fn test_load_song() {
        let config = Config {
            soundfont: PathBuf::from("assets/TimGM6mb.sf2"),
            midi: PathBuf::from("assets/flourish.mid"),
            ..Config::default()
        };
        let (mut sequencer, info) = load_song(&config).unwrap();
        assert!(info.length_secs > 0.0);

        let mut left = vec![0.0; 1024];
        let mut right = vec![0.0; 1024];
        SynthesisEngine::render(&mut sequencer, &mut left, &mut right);
    }

    #[test]
    #[ignore] // Requires SoundFont file
    fn test_synthesizer_through_bridge() {
        use crate::audio::AudioStreamBridge;

        let soundfont = load_soundfont("assets/TimGM6mb.sf2").unwrap();
        let settings = SynthesizerSettings::new(44100);
        let mut synth = Synthesizer::new(&soundfont, &settings).unwrap();
        synth.note_on(0, 60, 100);

        let mut bridge = AudioStreamBridge::new(synth, 256).unwrap();
        let mut left = vec![0.0; 4410];
        let mut right = vec![0.0; 4410];
        bridge.render(&mut left, &mut right);

        let mut window = vec![0.0; 256];
        bridge.snapshot(&mut window);
        assert!(left.iter().any(|&s| s != 0.0));
        assert!(window.iter().any(|&s| s != 0.0));
    }
}
