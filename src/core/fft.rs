//! Real-FFT seam for the spectral front end.
//!
//! The analyzer only needs one forward real transform per frame, so the FFT
//! sits behind a minimal trait and the shipped implementation delegates to
//! `rustfft` with buffers planned once and reused.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Zero-valued complex number, used for FFT buffer initialization.
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Forward real-to-complex transform of a fixed size.
///
/// Implementations produce `len() / 2 + 1` non-redundant bins for a real
/// input of `len()` samples.
pub trait ForwardReal {
    /// Transform size in samples.
    fn len(&self) -> usize;

    /// Computes the spectrum of `input` into `output`.
    ///
    /// `input` must hold exactly `len()` samples and `output` at least
    /// `len() / 2 + 1` bins.
    fn forward_real(&mut self, input: &[f32], output: &mut [Complex<f32>]);
}

/// `rustfft`-backed [`ForwardReal`] implementation.
///
/// Uses a complex plan of the full size; the redundant upper half of the
/// spectrum is simply not copied out.
pub struct RustFft {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFft {
    /// Plans a forward transform of the given size.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![COMPLEX_ZERO; fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![COMPLEX_ZERO; size],
            scratch,
        }
    }
}

impl ForwardReal for RustFft {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn forward_real(&mut self, input: &[f32], output: &mut [Complex<f32>]) {
        debug_assert_eq!(input.len(), self.buffer.len());
        for (slot, &s) in self.buffer.iter_mut().zip(input.iter()) {
            *slot = Complex::new(s, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let bins = self.buffer.len() / 2 + 1;
        output[..bins].copy_from_slice(&self.buffer[..bins]);
    }
}

impl std::fmt::Debug for RustFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustFft").field("size", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn dc_signal_lands_in_bin_zero() {
        let size = 64;
        let mut fft = RustFft::new(size);
        let input = vec![1.0f32; size];
        let mut output = vec![COMPLEX_ZERO; size / 2 + 1];
        fft.forward_real(&input, &mut output);
        assert!((output[0].norm() - size as f32).abs() < 1e-3);
        for bin in &output[1..] {
            assert!(bin.norm() < 1e-3);
        }
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let size = 256;
        let cycles = 8.0;
        let mut fft = RustFft::new(size);
        let input: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * cycles * i as f32 / size as f32).sin())
            .collect();
        let mut output = vec![COMPLEX_ZERO; size / 2 + 1];
        fft.forward_real(&input, &mut output);

        let peak = output
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
            .unwrap()
            .0;
        assert_eq!(peak, cycles as usize);
    }

    #[test]
    fn non_power_of_two_size() {
        // Analysis sizes like 662 are not powers of two.
        let size = 662;
        let mut fft = RustFft::new(size);
        let input = vec![0.5f32; size];
        let mut output = vec![COMPLEX_ZERO; size / 2 + 1];
        fft.forward_real(&input, &mut output);
        assert!((output[0].norm() - 0.5 * size as f32).abs() < 1e-2);
    }
}
