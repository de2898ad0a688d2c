//! Frame slicer: turns interleaved PCM into pre-emphasized, windowed
//! analysis frames at the 100 Hz frame rate.

use crate::core::ring_buffer::RingBuffer;
use crate::core::window::{apply_window, hann_window};

/// One windowed analysis frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame index; index times frame step is the starting input sample.
    pub index: u64,
    /// Pre-emphasized, Hann-windowed samples.
    pub samples: Vec<f32>,
}

/// Sliding-window frame producer.
///
/// Multi-channel input is reduced to a mono mixdown by averaging; the
/// pre-emphasis high-pass runs on the mixdown with one sample of state that
/// persists across frames and pushes.
#[derive(Debug)]
pub struct FrameSlicer {
    size: usize,
    step: usize,
    channels: usize,
    preemphasis: f32,
    window: Vec<f32>,
    /// Pre-emphasized mono samples not yet consumed by a frame.
    pending: RingBuffer,
    /// Previous raw mixdown sample, carried across pushes.
    prev_raw: f32,
    next_index: u64,
    flushed: bool,
}

impl FrameSlicer {
    /// Creates a slicer for the given frame geometry.
    ///
    /// `extra_capacity` bounds the largest chunk a single push may deliver.
    pub fn new(
        size: usize,
        step: usize,
        channels: usize,
        preemphasis: f32,
        extra_capacity: usize,
    ) -> Self {
        Self {
            size,
            step,
            channels,
            preemphasis,
            window: hann_window(size),
            pending: RingBuffer::with_capacity(size + step + extra_capacity),
            prev_raw: 0.0,
            next_index: 0,
            flushed: false,
        }
    }

    /// Number of frames emitted so far.
    #[inline]
    pub fn frames_emitted(&self) -> u64 {
        self.next_index
    }

    /// Appends interleaved samples; `samples.len()` must be a multiple of the
    /// channel count.
    pub fn push(&mut self, samples: &[f32]) {
        debug_assert_eq!(samples.len() % self.channels, 0);
        for chunk in samples.chunks_exact(self.channels) {
            let mixed = chunk.iter().sum::<f32>() / self.channels as f32;
            let emphasized = mixed - self.preemphasis * self.prev_raw;
            self.prev_raw = mixed;
            let pushed = self.pending.push_slice(&[emphasized]);
            debug_assert_eq!(pushed, 1, "slicer ring sized below push capacity");
        }
    }

    /// Produces the next frame if a full window has accumulated.
    pub fn try_frame(&mut self) -> Option<Frame> {
        if self.pending.len() < self.size {
            return None;
        }
        Some(self.emit(self.size))
    }

    /// Marks end of input and emits the zero-padded final frame, if any real
    /// samples remain past the last full window.
    pub fn flush(&mut self) -> Option<Frame> {
        if self.flushed {
            return None;
        }
        self.flushed = true;
        let remaining = self.pending.len();
        if remaining == 0 {
            return None;
        }
        Some(self.emit(remaining))
    }

    fn emit(&mut self, available: usize) -> Frame {
        let mut samples = vec![0.0f32; self.size];
        let copied = self.pending.peek_slice(&mut samples[..available.min(self.size)]);
        debug_assert_eq!(copied, available.min(self.size));
        apply_window(&mut samples, &self.window);
        self.pending.discard(self.step.min(self.pending.len()));
        let index = self.next_index;
        self.next_index += 1;
        Frame { index, samples }
    }
}
