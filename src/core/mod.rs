//! Core types, the analysis window, the FFT seam, and the ring buffer.

pub mod fft;
pub mod ring_buffer;
pub mod types;
pub mod window;

pub use types::*;
pub use window::{apply_window, hann_window};
