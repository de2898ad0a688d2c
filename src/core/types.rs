//! Core types shared across the crate: samples, analysis constants, and the
//! engine configuration.

use crate::error::SpeedError;

/// A single audio sample (32-bit float, nominal range -1.0 to 1.0).
pub type Sample = f32;

/// Analysis frame rate in Hz. One tension value is produced per frame.
pub const FRAME_RATE_HZ: u32 = 100;

/// Lowest pitch considered by the period search, in Hz.
pub const MIN_PITCH_HZ: u32 = 60;

/// Highest pitch considered by the period search, in Hz.
pub const MAX_PITCH_HZ: u32 = 400;

/// Pitch assumed for unvoiced segments, in Hz.
pub const UNVOICED_PITCH_HZ: u32 = 100;

/// Returns the analysis frame step in samples for the given sample rate.
#[inline]
pub fn frame_step(sample_rate: u32) -> usize {
    (sample_rate / FRAME_RATE_HZ) as usize
}

/// Returns the analysis frame (and FFT) size in samples for the given sample
/// rate: twice 1.5 frame steps, i.e. 50% overlap plus lookahead.
#[inline]
pub fn frame_size(sample_rate: u32) -> usize {
    2 * ((1.5 * sample_rate as f64 / FRAME_RATE_HZ as f64).round() as usize)
}

/// Immutable configuration for a [`crate::StreamProcessor`].
///
/// Groups every tunable of the analyzer and the time-scale modifier. A config
/// is validated once at stream creation; the only values adjustable on a live
/// stream are the global speed, the nonlinear factor, the duration feedback
/// strength, and the pitch rate.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: usize,
    /// Global target speedup ratio Rg (0.5 to 4.0).
    pub speed: f32,
    /// Nonlinear factor λ: 0.0 = uniform scaling, 1.0 = fully speech-aware.
    pub nonlinear: f32,
    /// Duration feedback strength (0.0 to 0.5).
    pub duration_feedback: f32,
    /// Incidental pitch rate (resampling factor applied after synthesis).
    pub rate: f32,
    /// First-order pre-emphasis coefficient α.
    pub preemphasis_factor: f32,
    /// Denominator floor scale for the energy-change normalizer.
    pub low_energy_threshold_scale: f32,
    /// Divides per-frame total energy to set the active-bin threshold.
    pub bin_threshold_divisor: f32,
    /// Weight of the energy-change component in tension.
    pub energy_weight: f32,
    /// Weight of the speech-change component in tension.
    pub speech_weight: f32,
    /// Operating-point offset for the energy-change component.
    pub energy_offset: f32,
    /// Operating-point offset for the speech-change component.
    pub speech_offset: f32,
    /// Clamp on the speech-change component, in units of its local σ.
    pub speech_change_cap_multiplier: f32,
    /// Past half of the tension hysteresis window, in frames.
    pub hysteresis_past: usize,
    /// Future half of the tension hysteresis window, in frames.
    pub hysteresis_future: usize,
}

impl EngineConfig {
    /// Creates a configuration with the published defaults.
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            speed: 1.0,
            nonlinear: 0.0,
            duration_feedback: 0.1,
            rate: 1.0,
            preemphasis_factor: 0.97,
            low_energy_threshold_scale: 0.04,
            bin_threshold_divisor: 100.0,
            energy_weight: 0.5,
            speech_weight: 0.25,
            energy_offset: 0.7,
            speech_offset: 1.0,
            speech_change_cap_multiplier: 4.0,
            hysteresis_past: 8,
            hysteresis_future: 12,
        }
    }

    /// Sets the global target speedup ratio Rg.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the nonlinear factor λ.
    pub fn with_nonlinear(mut self, nonlinear: f32) -> Self {
        self.nonlinear = nonlinear;
        self
    }

    /// Sets the duration feedback strength.
    pub fn with_duration_feedback(mut self, feedback: f32) -> Self {
        self.duration_feedback = feedback;
        self
    }

    /// Sets the incidental pitch rate.
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the pre-emphasis coefficient α.
    pub fn with_preemphasis_factor(mut self, alpha: f32) -> Self {
        self.preemphasis_factor = alpha;
        self
    }

    /// Sets the low-energy denominator floor scale.
    pub fn with_low_energy_threshold_scale(mut self, scale: f32) -> Self {
        self.low_energy_threshold_scale = scale;
        self
    }

    /// Sets the active-bin threshold divisor.
    pub fn with_bin_threshold_divisor(mut self, divisor: f32) -> Self {
        self.bin_threshold_divisor = divisor;
        self
    }

    /// Sets the tension component weights (energy, speech).
    pub fn with_tension_weights(mut self, energy: f32, speech: f32) -> Self {
        self.energy_weight = energy;
        self.speech_weight = speech;
        self
    }

    /// Sets the tension component offsets (energy, speech).
    pub fn with_tension_offsets(mut self, energy: f32, speech: f32) -> Self {
        self.energy_offset = energy;
        self.speech_offset = speech;
        self
    }

    /// Sets the speech-change cap, in units of local σ.
    pub fn with_speech_change_cap_multiplier(mut self, multiplier: f32) -> Self {
        self.speech_change_cap_multiplier = multiplier;
        self
    }

    /// Sets the hysteresis window halves (past, future) in frames.
    pub fn with_hysteresis(mut self, past: usize, future: usize) -> Self {
        self.hysteresis_past = past;
        self.hysteresis_future = future;
        self
    }

    /// Returns the analysis frame step for this configuration.
    #[inline]
    pub fn frame_step(&self) -> usize {
        frame_step(self.sample_rate)
    }

    /// Returns the analysis frame (FFT) size for this configuration.
    #[inline]
    pub fn frame_size(&self) -> usize {
        frame_size(self.sample_rate)
    }

    /// Validates every field against its admissible range.
    pub fn validate(&self) -> Result<(), SpeedError> {
        if self.sample_rate == 0 || frame_step(self.sample_rate) == 0 {
            return Err(SpeedError::InvalidConfiguration(format!(
                "sample rate must be at least {} Hz, got {}",
                FRAME_RATE_HZ, self.sample_rate
            )));
        }
        if self.channels == 0 {
            return Err(SpeedError::InvalidConfiguration(
                "channel count must be at least 1".into(),
            ));
        }
        validate_speed(self.speed)?;
        validate_nonlinear(self.nonlinear)?;
        validate_feedback(self.duration_feedback)?;
        validate_rate(self.rate)?;
        if !(0.0..1.0).contains(&self.preemphasis_factor) {
            return Err(SpeedError::InvalidConfiguration(format!(
                "preemphasis factor must be in [0, 1), got {}",
                self.preemphasis_factor
            )));
        }
        if self.low_energy_threshold_scale <= 0.0 {
            return Err(SpeedError::InvalidConfiguration(
                "low energy threshold scale must be positive".into(),
            ));
        }
        if self.bin_threshold_divisor <= 0.0 {
            return Err(SpeedError::InvalidConfiguration(
                "bin threshold divisor must be positive".into(),
            ));
        }
        if self.speech_change_cap_multiplier < 0.0 {
            return Err(SpeedError::InvalidConfiguration(
                "speech change cap multiplier must be non-negative".into(),
            ));
        }
        if self.hysteresis_past == 0 || self.hysteresis_future == 0 {
            return Err(SpeedError::InvalidConfiguration(
                "hysteresis window halves must be at least 1 frame".into(),
            ));
        }
        Ok(())
    }
}

/// Validates a global speed ratio Rg.
pub fn validate_speed(speed: f32) -> Result<(), SpeedError> {
    if !speed.is_finite() || !(0.5..=4.0).contains(&speed) {
        return Err(SpeedError::InvalidConfiguration(format!(
            "speed must be in [0.5, 4.0], got {}",
            speed
        )));
    }
    Ok(())
}

/// Validates a nonlinear factor λ.
pub fn validate_nonlinear(nonlinear: f32) -> Result<(), SpeedError> {
    if !nonlinear.is_finite() || !(0.0..=1.0).contains(&nonlinear) {
        return Err(SpeedError::InvalidConfiguration(format!(
            "nonlinear factor must be in [0, 1], got {}",
            nonlinear
        )));
    }
    Ok(())
}

/// Validates a duration feedback strength.
pub fn validate_feedback(feedback: f32) -> Result<(), SpeedError> {
    if !feedback.is_finite() || !(0.0..=0.5).contains(&feedback) {
        return Err(SpeedError::InvalidConfiguration(format!(
            "duration feedback must be in [0, 0.5], got {}",
            feedback
        )));
    }
    Ok(())
}

/// Validates an incidental pitch rate.
pub fn validate_rate(rate: f32) -> Result<(), SpeedError> {
    if !rate.is_finite() || !(0.25..=4.0).contains(&rate) {
        return Err(SpeedError::InvalidConfiguration(format!(
            "pitch rate must be in [0.25, 4.0], got {}",
            rate
        )));
    }
    Ok(())
}
