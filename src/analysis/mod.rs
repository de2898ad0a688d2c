//! Spectral analysis pipeline: frame slicing, the spectral front end, and
//! tension estimation, driven as one push-based unit.

pub mod slicer;
pub mod spectrum;
pub mod tension;

pub use slicer::{Frame, FrameSlicer};
pub use spectrum::{SpectralFeatures, SpectralFrontEnd};
pub use tension::{TensionEstimator, TensionParams};

use crate::core::types::EngineConfig;

/// Push-driven analyzer: PCM in, finalized tension values out.
///
/// Feeds every emitted frame straight through the front end into the tension
/// estimator, so the only latency is the estimator's future half.
#[derive(Debug)]
pub struct Analyzer {
    slicer: FrameSlicer,
    front_end: SpectralFrontEnd,
    tension: TensionEstimator,
}

impl Analyzer {
    /// Builds the pipeline for a stream configuration.
    ///
    /// `max_push` bounds the largest interleaved chunk a single
    /// [`Analyzer::push`] may deliver, in samples per channel.
    pub fn new(config: &EngineConfig, max_push: usize) -> Self {
        let size = config.frame_size();
        let step = config.frame_step();
        Self {
            slicer: FrameSlicer::new(
                size,
                step,
                config.channels,
                config.preemphasis_factor,
                max_push,
            ),
            front_end: SpectralFrontEnd::new(
                size,
                config.sample_rate,
                config.bin_threshold_divisor,
            ),
            tension: TensionEstimator::new(TensionParams {
                low_energy_threshold_scale: config.low_energy_threshold_scale,
                energy_weight: config.energy_weight,
                speech_weight: config.speech_weight,
                energy_offset: config.energy_offset,
                speech_offset: config.speech_offset,
                speech_change_cap_multiplier: config.speech_change_cap_multiplier,
                past: config.hysteresis_past,
                future: config.hysteresis_future,
            }),
        }
    }

    /// Feeds interleaved samples and advances the frame pipeline.
    pub fn push(&mut self, samples: &[f32]) {
        self.slicer.push(samples);
        while let Some(frame) = self.slicer.try_frame() {
            let features = self.front_end.analyze(&frame);
            self.tension.update(features);
        }
    }

    /// Marks end of input: the zero-padded tail frame is analyzed and the
    /// remaining tensions finalize with a shortened future half.
    pub fn finish(&mut self) {
        if let Some(frame) = self.slicer.flush() {
            let features = self.front_end.analyze(&frame);
            self.tension.update(features);
        }
        self.tension.set_flushed();
    }

    /// Returns the next finalized `(frame_index, tension)`, if any.
    #[inline]
    pub fn try_tension(&mut self) -> Option<(u64, f32)> {
        self.tension.try_tension()
    }

    /// Number of frames that have entered the estimator.
    #[inline]
    pub fn frames_analyzed(&self) -> u64 {
        self.slicer.frames_emitted()
    }
}
