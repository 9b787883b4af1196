//! Hand-off between the audio thread and the waveform view.
//!
//! [`AudioStreamBridge`] sits on the audio thread. Each `render` call asks
//! the synthesis engine for the next block, copies it to the output, and
//! records the sum of left and right for every frame in a fixed-length ring.
//! The ring lives in a [`WaveHistory`] that the UI thread holds through an
//! `Arc` and snapshots at its own pace.
//!
//! Synthesis runs before the lock is taken. The lock covers only the copy
//! loop in `render` and the W-sample copy in `snapshot`, so neither side can
//! hold up the other for longer than that.

use super::engine::SynthesisEngine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Errors raised when constructing a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The waveform window must hold at least one sample.
    #[error("history length must be at least 1")]
    EmptyHistory,
}

/// Circular buffer contents. Always accessed under the mutex.
struct Ring {
    samples: Box<[f32]>,
    /// Slot the next sample goes into, which is also the oldest sample.
    write_cursor: usize,
}

/// Rolling window of the most recent combined-channel samples.
///
/// Shared between the audio thread (writer) and any number of readers.
pub struct WaveHistory {
    ring: Mutex<Ring>,
    len: usize,
    frames_rendered: AtomicU64,
}

#[allow(clippy::len_without_is_empty)] // never empty, see `new`
impl WaveHistory {
    /// Creates a window of `len` samples, all zero.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::EmptyHistory`] if `len` is zero.
    pub fn new(len: usize) -> Result<Self, BridgeError> {
        if len == 0 {
            return Err(BridgeError::EmptyHistory);
        }
        Ok(Self {
            ring: Mutex::new(Ring {
                samples: vec![0.0; len].into_boxed_slice(),
                write_cursor: 0,
            }),
            len,
            frames_rendered: AtomicU64::new(0),
        })
    }

    /// Number of samples in the window.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Total frames rendered since the bridge was created.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// Copies the window into `dest`, oldest sample first.
    ///
    /// `dest` should be exactly [`len`](Self::len) samples long. The last
    /// element receives the most recently rendered sample.
    pub fn snapshot(&self, dest: &mut [f32]) {
        let len = self.len;
        let ring = self.lock();
        debug_assert_eq!(dest.len(), len, "snapshot buffer must match history length");

        // Oldest samples run from the cursor to the end, then wrap to the start
        let (newer, older) = ring.samples.split_at(ring.write_cursor);
        let n = dest.len().min(len);
        let head = n.min(older.len());
        dest[..head].copy_from_slice(&older[..head]);
        dest[head..n].copy_from_slice(&newer[..n - head]);
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        // The ring is consistent between any two samples, so a panic while
        // holding the lock cannot leave it half-updated.
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Renders audio for the output device and feeds the waveform window.
///
/// Owned by the audio thread. The UI thread reaches the window through
/// [`history`](Self::history).
pub struct AudioStreamBridge<E> {
    engine: E,
    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
    history: Arc<WaveHistory>,
}

impl<E: SynthesisEngine> AudioStreamBridge<E> {
    /// Creates a bridge around `engine` keeping `history_len` samples.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::EmptyHistory`] if `history_len` is zero.
    pub fn new(engine: E, history_len: usize) -> Result<Self, BridgeError> {
        Ok(Self {
            engine,
            scratch_left: Vec::new(),
            scratch_right: Vec::new(),
            history: Arc::new(WaveHistory::new(history_len)?),
        })
    }

    /// Renders `left_out.len()` new frames into the two output buffers.
    ///
    /// Both buffers should be the same length; if they differ only the
    /// shorter length is rendered. Each frame's `left + right` is appended
    /// to the waveform window.
    pub fn render(&mut self, left_out: &mut [f32], right_out: &mut [f32]) {
        debug_assert_eq!(left_out.len(), right_out.len());
        let frames = left_out.len().min(right_out.len());

        if self.scratch_left.len() < frames {
            debug!(
                from = self.scratch_left.len(),
                to = frames,
                "growing render scratch buffers"
            );
            self.scratch_left.resize(frames, 0.0);
            self.scratch_right.resize(frames, 0.0);
        }

        let left = &mut self.scratch_left[..frames];
        let right = &mut self.scratch_right[..frames];
        self.engine.render(left, right);

        {
            let mut ring = self.history.lock();
            let Ring {
                samples,
                write_cursor,
            } = &mut *ring;
            let len = self.history.len;

            for i in 0..frames {
                left_out[i] = left[i];
                right_out[i] = right[i];

                samples[*write_cursor] = left[i] + right[i];
                *write_cursor += 1;
                if *write_cursor == len {
                    *write_cursor = 0;
                }
            }
        }

        self.history
            .frames_rendered
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Copies the waveform window into `dest`, oldest sample first.
    pub fn snapshot(&self, dest: &mut [f32]) {
        self.history.snapshot(dest);
    }

    /// Handle to the waveform window for another thread.
    pub fn history(&self) -> Arc<WaveHistory> {
        Arc::clone(&self.history)
    }

    /// Number of samples in the waveform window.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Current capacity of the scratch buffers, in frames.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch_left.len()
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The wrapped engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
