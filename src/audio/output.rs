//! Audio output through rodio.
//!
//! rodio pulls interleaved samples from a [`Source`] on its own mixer thread.
//! [`BridgeSource`] answers those pulls by asking the bridge for a block of
//! frames at a time and handing the samples out one by one.

use super::bridge::{AudioStreamBridge, WaveHistory};
use super::engine::SynthesisEngine;
use crate::config::Config;
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// State shared between the player and the audio thread.
/// Uses atomics for lock-free access from the audio thread.
#[derive(Debug, Default)]
pub struct TransportState {
    /// While set the source outputs silence and stops rendering.
    paused: AtomicBool,
}

impl TransportState {
    /// Returns whether the source is outputting silence.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Pauses or resumes rendering.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Flips the paused flag in one atomic step. Returns the new state.
    pub fn toggle(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::Relaxed)
    }
}

/// Audio source that renders through an [`AudioStreamBridge`].
/// Implements rodio's Source trait for playback.
pub struct BridgeSource<E> {
    /// The bridge, owned by the audio thread once playback starts.
    bridge: AudioStreamBridge<E>,
    /// Shared pause flag.
    transport: Arc<TransportState>,
    /// Left channel block.
    left_buf: Vec<f32>,
    /// Right channel block.
    right_buf: Vec<f32>,
    /// Current frame in the block.
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
    /// Output sample rate reported to rodio.
    sample_rate: u32,
}

impl<E: SynthesisEngine> BridgeSource<E> {
    pub fn new(
        bridge: AudioStreamBridge<E>,
        transport: Arc<TransportState>,
        block_frames: usize,
        sample_rate: u32,
    ) -> Self {
        let block_frames = block_frames.max(1);
        Self {
            bridge,
            transport,
            left_buf: vec![0.0; block_frames],
            right_buf: vec![0.0; block_frames],
            buf_pos: block_frames, // Start at end to trigger first render
            channel: 0,
            sample_rate,
        }
    }

    /// Fills the block with new audio, or silence while paused.
    fn refill(&mut self) {
        if self.transport.is_paused() {
            self.left_buf.fill(0.0);
            self.right_buf.fill(0.0);
        } else {
            self.bridge.render(&mut self.left_buf, &mut self.right_buf);
        }
        self.buf_pos = 0;
    }
}

impl<E: SynthesisEngine> Iterator for BridgeSource<E> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= self.left_buf.len() {
            self.refill();
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl<E: SynthesisEngine> Source for BridgeSource<E> {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2 // Stereo
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// A running output stream.
///
/// Playback continues until this is dropped.
pub struct Playback {
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    /// Audio output handle for playback.
    _stream_handle: OutputStreamHandle,
    /// Shared pause flag.
    transport: Arc<TransportState>,
    /// The waveform window fed by the audio thread.
    history: Arc<WaveHistory>,
}

impl Playback {
    /// Opens the default output device and starts pulling from `bridge`.
    ///
    /// # Errors
    ///
    /// Returns error if the audio device cannot be opened or refuses the
    /// stream.
    pub fn start<E>(bridge: AudioStreamBridge<E>, config: &Config) -> Result<Self>
    where
        E: SynthesisEngine + 'static,
    {
        let history = bridge.history();
        let transport = Arc::new(TransportState::default());

        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to open audio output")?;

        let source = BridgeSource::new(
            bridge,
            Arc::clone(&transport),
            config.block_frames,
            config.sample_rate,
        );
        stream_handle
            .play_raw(source)
            .context("Failed to start audio playback")?;

        info!(
            sample_rate = config.sample_rate,
            block_frames = config.block_frames,
            "audio output started"
        );

        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            transport,
            history,
        })
    }

    /// The waveform window for the UI thread.
    pub fn history(&self) -> &Arc<WaveHistory> {
        &self.history
    }

    /// Returns whether output is paused.
    pub fn is_paused(&self) -> bool {
        self.transport.is_paused()
    }

    /// Pauses or resumes output. Returns the new paused state.
    ///
    /// Called while the terminal view owns the screen, so it logs at debug
    /// level only.
    pub fn toggle_pause(&self) -> bool {
        toggle_logged(&self.transport)
    }
}

fn toggle_logged(transport: &TransportState) -> bool {
    let paused = transport.toggle();
    debug!(paused, "playback toggled");
    paused
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Left = frame number, right = minus half of it.
    struct Ramp {
        next: f32,
    }

    impl SynthesisEngine for Ramp {
        fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                *l = self.next;
                *r = -self.next / 2.0;
                self.next += 1.0;
            }
        }
    }

    fn source(block: usize, history: usize) -> (BridgeSource<Ramp>, Arc<TransportState>) {
        let bridge = AudioStreamBridge::new(Ramp { next: 1.0 }, history).unwrap();
        let transport = Arc::new(TransportState::default());
        (
            BridgeSource::new(bridge, Arc::clone(&transport), block, 44100),
            transport,
        )
    }

    #[test]
    fn test_interleaves_left_then_right() {
        let (source, _) = source(2, 4);
        let samples: Vec<f32> = source.take(8).collect();
        assert_eq!(samples, vec![1.0, -0.5, 2.0, -1.0, 3.0, -1.5, 4.0, -2.0]);
    }

    #[test]
    fn test_renders_whole_blocks() {
        let (mut source, _) = source(3, 8);
        let history = source.bridge.history();

        // First sample triggers one block of three frames
        source.next();
        assert_eq!(history.frames_rendered(), 3);

        // The rest of the block is served without rendering
        for _ in 0..5 {
            source.next();
        }
        assert_eq!(history.frames_rendered(), 3);

        source.next();
        assert_eq!(history.frames_rendered(), 6);
    }

    #[test]
    fn test_pause_outputs_silence_and_freezes_history() {
        let (mut source, transport) = source(2, 4);
        let history = source.bridge.history();

        let _: Vec<f32> = source.by_ref().take(4).collect();
        let mut before = [0.0; 4];
        history.snapshot(&mut before);
        assert_eq!(before, [0.0, 0.0, 0.5, 1.0]);

        transport.set_paused(true);
        let paused: Vec<f32> = source.by_ref().take(8).collect();
        assert!(paused.iter().all(|&s| s == 0.0));

        let mut after = [0.0; 4];
        history.snapshot(&mut after);
        assert_eq!(before, after);
        assert_eq!(history.frames_rendered(), 2);

        // Resuming continues where the engine left off
        transport.set_paused(false);
        let resumed: Vec<f32> = source.take(2).collect();
        assert_eq!(resumed, vec![3.0, -1.5]);
    }

    #[test]
    fn test_toggle_flips_and_reports_new_state() {
        let transport = TransportState::default();
        assert!(transport.toggle());
        assert!(transport.is_paused());
        assert!(!transport.toggle());
        assert!(!transport.is_paused());

        transport.set_paused(true);
        assert!(!transport.toggle());
    }

    #[test]
    fn test_toggle_from_many_threads() {
        // An even number of atomic flips always lands back on "playing"
        let transport = Arc::new(TransportState::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let transport = Arc::clone(&transport);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        transport.toggle();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(!transport.is_paused());
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged_at(level: tracing::Level, f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_pause_toggle_silent_at_info() {
        let transport = TransportState::default();

        let info = logged_at(tracing::Level::INFO, || {
            toggle_logged(&transport);
        });
        assert!(info.is_empty(), "toggle logged over the view: {}", info);

        let debug = logged_at(tracing::Level::DEBUG, || {
            toggle_logged(&transport);
        });
        assert!(debug.contains("playback toggled"));
        assert!(!transport.is_paused());
    }

    #[test]
    fn test_source_metadata() {
        let (source, _) = source(16, 4);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 44100);
        assert_eq!(source.total_duration(), None);
        assert_eq!(source.current_frame_len(), None);
    }

    #[test]
    fn test_zero_block_is_clamped() {
        let (source, _) = source(0, 4);
        assert_eq!(source.left_buf.len(), 1);
        let samples: Vec<f32> = source.take(4).collect();
        assert_eq!(samples, vec![1.0, -0.5, 2.0, -1.0]);
    }
}
