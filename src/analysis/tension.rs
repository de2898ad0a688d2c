//! Tension estimator: smooths per-frame spectral features over a past/future
//! hysteresis window into a compressibility score in [0, 1].

use crate::analysis::spectrum::SpectralFeatures;

/// Offset values at which the estimator is purely change-driven. The
/// configured offsets act relative to these, shifting the operating point up
/// or down.
const ENERGY_OFFSET_NEUTRAL: f32 = 0.7;
const SPEECH_OFFSET_NEUTRAL: f32 = 1.0;
/// Guard for the energy normalizer on silent windows.
const NORM_EPSILON: f32 = 1e-10;

/// Tunables of the tension estimator.
#[derive(Debug, Clone, Copy)]
pub struct TensionParams {
    pub low_energy_threshold_scale: f32,
    pub energy_weight: f32,
    pub speech_weight: f32,
    pub energy_offset: f32,
    pub speech_offset: f32,
    pub speech_change_cap_multiplier: f32,
    pub past: usize,
    pub future: usize,
}

/// Sliding-window tension estimator.
///
/// Holds the last `past + future + 1` feature frames in a fixed ring. A frame
/// finalizes once its full future half has arrived (or input has ended, in
/// which case the future half shrinks to what exists). A finalized tension is
/// emitted exactly once.
#[derive(Debug)]
pub struct TensionEstimator {
    params: TensionParams,
    ring: Vec<SpectralFeatures>,
    frames_seen: u64,
    next_finalize: u64,
    flushed: bool,
}

impl TensionEstimator {
    pub fn new(params: TensionParams) -> Self {
        let capacity = params.past + params.future + 1;
        Self {
            params,
            ring: vec![SpectralFeatures::default(); capacity],
            frames_seen: 0,
            next_finalize: 0,
            flushed: false,
        }
    }

    /// Records the features of the next frame. Frames must arrive in index
    /// order with no gaps.
    pub fn update(&mut self, features: SpectralFeatures) {
        debug_assert_eq!(features.frame, self.frames_seen, "frames must be consecutive");
        let slot = (features.frame % self.ring.len() as u64) as usize;
        self.ring[slot] = features;
        self.frames_seen += 1;
    }

    /// Marks end of input: remaining frames finalize with a shortened future
    /// half.
    pub fn set_flushed(&mut self) {
        self.flushed = true;
    }

    /// Returns the next finalized `(frame_index, tension)`, if any.
    pub fn try_tension(&mut self) -> Option<(u64, f32)> {
        if self.frames_seen == 0 || self.next_finalize >= self.frames_seen {
            return None;
        }
        let f = self.next_finalize;
        let last_seen = self.frames_seen - 1;
        if !self.flushed && last_seen < f + self.params.future as u64 {
            return None;
        }

        let lo = f.saturating_sub(self.params.past as u64);
        let hi = (f + self.params.future as u64).min(last_seen);
        let tension = self.compute(f, lo, hi);
        self.next_finalize += 1;
        Some((f, tension))
    }

    fn at(&self, index: u64) -> &SpectralFeatures {
        &self.ring[(index % self.ring.len() as u64) as usize]
    }

    fn compute(&self, f: u64, lo: u64, hi: u64) -> f32 {
        let count = (hi - lo + 1) as f32;
        let mut mean_e = 0.0f32;
        let mut max_e = 0.0f32;
        let mut mean_p = 0.0f32;
        let mut mean_p2 = 0.0f32;
        for i in lo..=hi {
            let feat = self.at(i);
            mean_e += feat.energy;
            max_e = max_e.max(feat.energy);
            mean_p += feat.speech_score;
            mean_p2 += feat.speech_score * feat.speech_score;
        }
        mean_e /= count;
        mean_p /= count;
        mean_p2 /= count;

        let current = self.at(f);
        let p = &self.params;

        // Energy change, normalized so quiet passages do not read as change.
        let norm = p.low_energy_threshold_scale * max_e + NORM_EPSILON;
        let delta_e = ((current.energy - mean_e) / norm).clamp(-1.0, 1.0);

        // Speech-likeness change, capped at a multiple of its local spread.
        let sigma_p = (mean_p2 - mean_p * mean_p).max(0.0).sqrt();
        let cap = p.speech_change_cap_multiplier * sigma_p;
        let delta_p = (current.speech_score - mean_p).clamp(-cap, cap);

        // Deviation from the local mean in either feature lowers tension
        // (change points are stretched, steady spans compressed). The
        // configured offsets move the operating point relative to neutral.
        let tension = 0.5
            - p.energy_weight * (delta_e - (p.energy_offset - ENERGY_OFFSET_NEUTRAL))
            - p.speech_weight * (delta_p - (p.speech_offset - SPEECH_OFFSET_NEUTRAL));
        tension.clamp(0.0, 1.0)
    }
}
