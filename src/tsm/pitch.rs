//! Pitch-period estimation for the overlap-add scaler.
//!
//! Uses a normalized average magnitude difference function (AMDF) over the
//! plausible speech pitch range. Unvoiced or ambiguous input falls back to a
//! fixed period so splice sizes stay reasonable.

use crate::core::types::{MAX_PITCH_HZ, MIN_PITCH_HZ, UNVOICED_PITCH_HZ};

/// A candidate minimum must undercut the mean difference by this ratio to
/// count as voiced.
const VOICED_RATIO: f32 = 0.5;

/// Streaming pitch-period estimator.
#[derive(Debug)]
pub struct PitchPeriodEstimator {
    min_period: usize,
    max_period: usize,
    fallback_period: usize,
    last_period: usize,
}

impl PitchPeriodEstimator {
    pub fn new(sample_rate: u32) -> Self {
        let min_period = (sample_rate / MAX_PITCH_HZ).max(2) as usize;
        let max_period = (sample_rate / MIN_PITCH_HZ).max(4) as usize;
        let fallback_period = (sample_rate / UNVOICED_PITCH_HZ)
            .max(2)
            .clamp(min_period as u32, max_period as u32) as usize;
        Self {
            min_period,
            max_period,
            fallback_period,
            last_period: fallback_period,
        }
    }

    /// Longest period the search considers.
    #[inline]
    pub fn max_period(&self) -> usize {
        self.max_period
    }

    /// Number of mono samples [`PitchPeriodEstimator::estimate`] wants for a
    /// full-range search.
    #[inline]
    pub fn window_len(&self) -> usize {
        2 * self.max_period
    }

    /// Estimates the pitch period from the given mono window.
    ///
    /// Returns the fallback period when the window is too short, silent, or
    /// has no clear difference minimum.
    pub fn estimate(&mut self, window: &[f32]) -> usize {
        let search_max = self.max_period.min(window.len() / 2);
        if search_max < self.min_period {
            return self.last_period;
        }

        let mut best_period = 0usize;
        let mut best_diff = f32::INFINITY;
        let mut diff_sum = 0.0f32;
        let mut candidates = 0usize;

        for period in self.min_period..=search_max {
            let mut diff = 0.0f32;
            for i in 0..period {
                diff += (window[i] - window[i + period]).abs();
            }
            let diff = diff / period as f32;
            diff_sum += diff;
            candidates += 1;
            if diff < best_diff {
                best_diff = diff;
                best_period = period;
            }
        }

        let mean_diff = diff_sum / candidates as f32;
        let voiced = mean_diff > 0.0 && best_diff < VOICED_RATIO * mean_diff;
        self.last_period = if voiced {
            best_period
        } else {
            self.fallback_period
        };
        self.last_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 22050;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn finds_period_of_a_tone() {
        let mut est = PitchPeriodEstimator::new(SAMPLE_RATE);
        let window = sine(147.0, est.window_len());
        let period = est.estimate(&window);
        let true_period = (SAMPLE_RATE as f32 / 147.0).round() as usize;
        assert!(
            (period as i64 - true_period as i64).unsigned_abs() <= 2,
            "expected period near {}, got {}",
            true_period,
            period
        );
    }

    #[test]
    fn finds_period_of_an_impulse_train() {
        let mut est = PitchPeriodEstimator::new(SAMPLE_RATE);
        let mut window = vec![0.0f32; est.window_len()];
        for i in (0..window.len()).step_by(220) {
            window[i] = 1.0;
        }
        let period = est.estimate(&window);
        assert_eq!(period, 220);
    }

    #[test]
    fn silence_falls_back() {
        let mut est = PitchPeriodEstimator::new(SAMPLE_RATE);
        let window = vec![0.0f32; est.window_len()];
        assert_eq!(est.estimate(&window), 220);
    }

    #[test]
    fn noise_falls_back() {
        let mut est = PitchPeriodEstimator::new(SAMPLE_RATE);
        // Deterministic wideband noise with no periodicity in range.
        let window: Vec<f32> = (0..est.window_len())
            .map(|i| {
                let x = (i as u64)
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((x >> 40) as f32 / (1u64 << 24) as f32) - 0.5
            })
            .collect();
        assert_eq!(est.estimate(&window), 220);
    }

    #[test]
    fn short_window_returns_previous() {
        let mut est = PitchPeriodEstimator::new(SAMPLE_RATE);
        let window = sine(200.0, est.window_len());
        let voiced = est.estimate(&window);
        assert_eq!(est.estimate(&[0.0; 8]), voiced);
    }

    #[test]
    fn period_bounds_track_sample_rate() {
        let est = PitchPeriodEstimator::new(44100);
        assert_eq!(est.max_period(), 44100 / 60);
        assert_eq!(est.window_len(), 2 * (44100 / 60));
    }
}
