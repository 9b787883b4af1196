//! Offline rendering to WAV.
//!
//! Renders the whole song through the same bridge used for live playback
//! and writes the result as 16-bit stereo.

use super::bridge::AudioStreamBridge;
use super::engine::{build_sequencer, load_midi_file, load_soundfont, SynthesisEngine};
use crate::config::Config;
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;
use tracing::info;

/// Buffer size for rendering chunks.
/// Larger buffers are more efficient but use more memory.
const RENDER_BUFFER_SIZE: usize = 4096;

/// Silence rendered after the last event so releases can ring out.
const TAIL_SECONDS: f64 = 2.0;

/// Exports the configured song to a WAV file.
///
/// The song is rendered once without looping, followed by a short tail.
///
/// # Arguments
///
/// * `config` - SoundFont, MIDI file and sample rate to use
/// * `output_path` - Path for the output WAV file
/// * `progress_callback` - Optional callback for progress updates (0.0 to 1.0)
///
/// # Errors
///
/// Returns error if:
/// - The SoundFont or MIDI file cannot be loaded
/// - Output file cannot be created or written
pub fn export_to_wav<P, F>(
    config: &Config,
    output_path: P,
    progress_callback: Option<F>,
) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(f32),
{
    let output_path = output_path.as_ref();
    let soundfont = load_soundfont(&config.soundfont)?;
    let midi = load_midi_file(&config.midi)?;
    let sequencer = build_sequencer(&soundfont, &midi, config.sample_rate, false)?;
    let mut bridge = AudioStreamBridge::new(sequencer, config.history_len)?;

    let duration_seconds = midi.get_length() + TAIL_SECONDS;
    let total_frames = (duration_seconds * config.sample_rate as f64) as usize;

    let spec = WavSpec {
        channels: 2,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(output_path, spec).with_context(|| {
        format!(
            "Failed to create output WAV file: {}",
            output_path.display()
        )
    })?;

    info!(
        path = %output_path.display(),
        seconds = duration_seconds,
        "exporting"
    );

    render_frames(&mut bridge, &mut writer, total_frames, progress_callback)?;
    writer.finalize().context("Failed to finalize WAV file")?;

    info!(path = %output_path.display(), frames = total_frames, "export finished");
    Ok(())
}

/// Renders `total_frames` frames from `bridge` into `writer`.
fn render_frames<E, W, F>(
    bridge: &mut AudioStreamBridge<E>,
    writer: &mut WavWriter<W>,
    total_frames: usize,
    mut progress_callback: Option<F>,
) -> Result<()>
where
    E: SynthesisEngine,
    W: Write + Seek,
    F: FnMut(f32),
{
    let mut left_buf = vec![0.0f32; RENDER_BUFFER_SIZE];
    let mut right_buf = vec![0.0f32; RENDER_BUFFER_SIZE];
    let mut current_frame = 0usize;

    while current_frame < total_frames {
        let frames = (total_frames - current_frame).min(RENDER_BUFFER_SIZE);
        bridge.render(&mut left_buf[..frames], &mut right_buf[..frames]);

        // Write to WAV (interleaved stereo, 16-bit)
        for (&left, &right) in left_buf[..frames].iter().zip(&right_buf[..frames]) {
            writer.write_sample(to_i16(left))?;
            writer.write_sample(to_i16(right))?;
        }

        current_frame += frames;

        if let Some(ref mut callback) = progress_callback {
            callback(current_frame as f32 / total_frames as f32);
        }
    }

    Ok(())
}

/// Converts f32 (-1.0 to 1.0) to i16, clipping out-of-range samples.
fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
