//! Spectral front end: per-frame magnitude spectrum and the scalar features
//! consumed by the tension estimator.

use rustfft::num_complex::Complex;

use crate::analysis::slicer::Frame;
use crate::core::fft::{ForwardReal, RustFft, COMPLEX_ZERO};

/// Upper edge of the low band, in Hz.
const LOW_BAND_HZ: f64 = 1000.0;
/// Speech-relevant band for the active-bin score, in Hz.
const SPEECH_BAND_LO_HZ: f64 = 100.0;
const SPEECH_BAND_HI_HZ: f64 = 4000.0;
/// Guard against division by zero on silent frames.
const ENERGY_EPSILON: f32 = 1e-12;

/// Scalar features derived from one frame's magnitude spectrum.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralFeatures {
    /// Frame index this spectrum belongs to.
    pub frame: u64,
    /// Total energy, sum of squared magnitudes over all bins.
    pub energy: f32,
    /// Energy in bins below ~1 kHz.
    pub low_energy: f32,
    /// Energy-weighted fraction of active bins in the speech band.
    pub speech_score: f32,
}

/// Stateless per-frame spectrum analysis.
///
/// All temporal smoothing lives in the tension estimator; this stage only
/// turns one frame into one [`SpectralFeatures`].
pub struct SpectralFrontEnd {
    fft: Box<dyn ForwardReal>,
    spectrum: Vec<Complex<f32>>,
    power: Vec<f32>,
    low_band_end: usize,
    speech_band: (usize, usize),
    bin_threshold_divisor: f32,
}

impl SpectralFrontEnd {
    /// Creates a front end for the given frame size and sample rate.
    pub fn new(size: usize, sample_rate: u32, bin_threshold_divisor: f32) -> Self {
        let bins = size / 2;
        let hz_per_bin = sample_rate as f64 / size as f64;
        let clamp_bin = |hz: f64| ((hz / hz_per_bin).round() as usize).min(bins);
        Self {
            fft: Box::new(RustFft::new(size)),
            spectrum: vec![COMPLEX_ZERO; size / 2 + 1],
            power: vec![0.0; bins],
            low_band_end: clamp_bin(LOW_BAND_HZ),
            speech_band: (clamp_bin(SPEECH_BAND_LO_HZ).max(1), clamp_bin(SPEECH_BAND_HI_HZ)),
            bin_threshold_divisor,
        }
    }

    /// Analyzes one frame.
    pub fn analyze(&mut self, frame: &Frame) -> SpectralFeatures {
        self.fft.forward_real(&frame.samples, &mut self.spectrum);
        for (p, c) in self.power.iter_mut().zip(self.spectrum.iter()) {
            *p = c.norm_sqr();
        }

        let energy: f32 = self.power.iter().sum();
        let low_energy: f32 = self.power[..self.low_band_end].iter().sum();

        // Bins carrying more than 1/divisor of the frame's energy count as
        // active; the score is their energy share within the speech band.
        let threshold = energy / self.bin_threshold_divisor;
        let (lo, hi) = self.speech_band;
        let active_energy: f32 = self.power[lo..hi]
            .iter()
            .filter(|&&p| p > threshold)
            .sum();
        let speech_score = active_energy / (energy + ENERGY_EPSILON);

        SpectralFeatures {
            frame: frame.index,
            energy,
            low_energy,
            speech_score,
        }
    }
}

impl std::fmt::Debug for SpectralFrontEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralFrontEnd")
            .field("size", &self.fft.len())
            .field("low_band_end", &self.low_band_end)
            .field("speech_band", &self.speech_band)
            .finish()
    }
}
