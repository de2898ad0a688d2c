//! Streaming nonlinear speedup processor.
//!
//! Couples the analyzer (tension), the speed controller, and the overlap-add
//! scaler into the public write/read/flush surface. The scaler is only
//! allowed to consume input the analyzer has already finalized, so every
//! synthesized sample was produced at the speed its own frame's tension
//! implied.

use crate::analysis::Analyzer;
use crate::control::SpeedController;
use crate::core::types::{self, EngineConfig, FRAME_RATE_HZ, MIN_PITCH_HZ};
use crate::error::SpeedError;
use crate::tsm::SolaEngine;

/// Scale factor between int16 and float samples.
const I16_SCALE: f32 = 32768.0;
/// Conversion chunk for the int16 API, in samples.
const CONVERT_CHUNK: usize = 4096;

/// Lifecycle of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    /// Accepts writes.
    Open,
    /// No more writes; draining remaining output.
    Flushing,
    /// Terminal; all reads return 0.
    Drained,
}

/// Streaming time-scale modification engine.
///
/// One `StreamProcessor` handles one logical input stream. It is not
/// re-entrant; drive it from a single thread. Independent streams share
/// nothing and may live on different threads.
pub struct StreamProcessor {
    config: EngineConfig,
    state: StreamState,
    analyzer: Analyzer,
    controller: SpeedController,
    tsm: SolaEngine,
    /// Per-channel input frames the scaler may consume so far.
    frontier: u64,
    step: usize,
    profile_enabled: bool,
    profile: Vec<(u64, f32)>,
    convert: Vec<f32>,
}

impl StreamProcessor {
    /// Creates a stream for the given configuration.
    pub fn new(config: EngineConfig) -> Result<Self, SpeedError> {
        config.validate()?;

        let step = config.frame_step();
        let max_period = (config.sample_rate / MIN_PITCH_HZ) as usize;
        // Enough for the analysis lookahead, a pitch search window, and a
        // comfortable write chunk on top.
        let lookahead = config.frame_size()
            + (config.hysteresis_past + config.hysteresis_future) * step;
        let input_capacity_frames = 2 * lookahead + 8 * max_period + 8192;

        let analyzer = Analyzer::new(&config, input_capacity_frames);
        let controller =
            SpeedController::new(config.speed, config.nonlinear, config.duration_feedback);
        let tsm = SolaEngine::new(
            config.sample_rate,
            config.channels,
            config.rate,
            input_capacity_frames,
        )?;

        Ok(Self {
            config,
            state: StreamState::Open,
            analyzer,
            controller,
            tsm,
            frontier: 0,
            step,
            profile_enabled: false,
            profile: Vec::new(),
            convert: Vec::new(),
        })
    }

    /// Writes interleaved float samples.
    ///
    /// Returns the number of frames (samples per channel) accepted. A short
    /// write means the input ring is full; drain output via
    /// [`StreamProcessor::read_float`] and resubmit the tail.
    pub fn write_float(&mut self, interleaved: &[f32]) -> Result<usize, SpeedError> {
        if self.state != StreamState::Open {
            return Err(SpeedError::InvalidState("write after flush"));
        }
        if interleaved.len() % self.config.channels != 0 {
            return Err(SpeedError::InvalidConfiguration(format!(
                "write length {} is not a multiple of {} channels",
                interleaved.len(),
                self.config.channels
            )));
        }

        let accepted = self.tsm.write(interleaved);
        self.analyzer
            .push(&interleaved[..accepted * self.config.channels]);
        self.pump()?;
        Ok(accepted)
    }

    /// Writes interleaved int16 samples (affine-scaled by 2^15).
    pub fn write_short(&mut self, interleaved: &[i16]) -> Result<usize, SpeedError> {
        if self.state != StreamState::Open {
            return Err(SpeedError::InvalidState("write after flush"));
        }
        let channels = self.config.channels;
        if interleaved.len() % channels != 0 {
            return Err(SpeedError::InvalidConfiguration(format!(
                "write length {} is not a multiple of {} channels",
                interleaved.len(),
                channels
            )));
        }

        let mut written = 0usize;
        let chunk_frames = (CONVERT_CHUNK / channels).max(1);
        let mut convert = std::mem::take(&mut self.convert);
        for chunk in interleaved.chunks(chunk_frames * channels) {
            convert.clear();
            convert.extend(chunk.iter().map(|&s| s as f32 / I16_SCALE));
            let accepted = self.write_float(&convert)?;
            written += accepted;
            if accepted * channels < chunk.len() {
                break;
            }
        }
        self.convert = convert;
        Ok(written)
    }

    /// Reads up to `out.len() / channels` frames of interleaved output.
    ///
    /// Returns 0 when the stream is dry; after a flush, a 0 return means the
    /// stream has fully drained.
    pub fn read_float(&mut self, out: &mut [f32]) -> usize {
        let frames = self.tsm.read(out);
        self.update_drained();
        frames
    }

    /// Reads interleaved int16 output, saturating on conversion.
    pub fn read_short(&mut self, out: &mut [i16]) -> usize {
        let channels = self.config.channels;
        let mut convert = std::mem::take(&mut self.convert);
        convert.resize(out.len(), 0.0);
        let frames = self.tsm.read(&mut convert);
        for (dst, &src) in out.iter_mut().zip(convert.iter()).take(frames * channels) {
            *dst = (src.clamp(-1.0, 1.0) * (I16_SCALE - 1.0)).round() as i16;
        }
        self.convert = convert;
        self.update_drained();
        frames
    }

    /// Ends input. The analyzer finalizes its tail, the scaler drains, and
    /// the output length is reconciled against the speed profile's integral.
    ///
    /// Idempotent; calling flush on a flushing or drained stream is a no-op.
    pub fn flush(&mut self) -> Result<(), SpeedError> {
        if self.state != StreamState::Open {
            return Ok(());
        }
        self.analyzer.finish();
        self.pump()?;
        self.tsm.synthesize(u64::MAX, true)?;
        self.reconcile_duration()?;
        self.state = StreamState::Flushing;
        self.update_drained();
        Ok(())
    }

    /// Output frames ready to read, per channel.
    #[inline]
    pub fn samples_available(&self) -> usize {
        self.tsm.output_frames()
    }

    /// Sets the global target speedup ratio Rg. Takes effect at the next
    /// finalized frame; already-synthesized output is not revised.
    pub fn set_speed(&mut self, speed: f32) -> Result<(), SpeedError> {
        self.controller.set_speed(speed)
    }

    /// Returns the global target speedup ratio Rg.
    #[inline]
    pub fn get_speed(&self) -> f32 {
        self.controller.speed()
    }

    /// Sets the incidental pitch rate.
    pub fn set_rate(&mut self, rate: f32) -> Result<(), SpeedError> {
        types::validate_rate(rate)?;
        self.tsm.set_rate(rate);
        Ok(())
    }

    /// Sets the nonlinear factor λ: 0 is uniform scaling at Rg, 1 is fully
    /// tension-driven.
    pub fn enable_nonlinear(&mut self, nonlinear: f32) -> Result<(), SpeedError> {
        self.controller.set_nonlinear(nonlinear)
    }

    /// Sets the duration feedback strength.
    pub fn set_duration_feedback(&mut self, feedback: f32) -> Result<(), SpeedError> {
        self.controller.set_feedback(feedback)
    }

    /// Turns on speed-profile accumulation.
    pub fn enable_speed_profile(&mut self) {
        self.profile_enabled = true;
    }

    /// Returns the `(frame_index, speed)` points accumulated since the last
    /// drain. Frame indices are strictly increasing.
    pub fn drain_speed_profile(&mut self) -> Vec<(u64, f32)> {
        std::mem::take(&mut self.profile)
    }

    /// Analysis frame rate in Hz.
    #[inline]
    pub fn frame_rate() -> f32 {
        FRAME_RATE_HZ as f32
    }

    /// Spectral analysis FFT size for this stream.
    #[inline]
    pub fn fft_size(&self) -> usize {
        self.config.frame_size()
    }

    /// Analysis frame size in samples (equal to the FFT size).
    #[inline]
    pub fn input_frame_size(&self) -> usize {
        self.config.frame_size()
    }

    /// Analysis frame step in samples.
    #[inline]
    pub fn input_frame_step(&self) -> usize {
        self.step
    }

    /// Number of analysis frames produced so far.
    #[inline]
    pub fn frames_analyzed(&self) -> u64 {
        self.analyzer.frames_analyzed()
    }

    /// Returns the stream's configuration.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the stream to its just-created state, keeping the
    /// configuration and live knob values.
    pub fn reset(&mut self) -> Result<(), SpeedError> {
        let mut config = self.config.clone();
        config.speed = self.controller.speed();
        config.nonlinear = self.controller.nonlinear();
        config.duration_feedback = self.controller.feedback();
        config.rate = self.tsm.rate();
        *self = Self::new(config)?;
        Ok(())
    }

    /// Finalizes pending tensions and lets the scaler advance to the new
    /// frontier, one frame's speed at a time. Sub-period remainders are left
    /// for the final drain so splices never degrade mid-stream.
    fn pump(&mut self) -> Result<(), SpeedError> {
        while let Some((frame, tension)) = self.analyzer.try_tension() {
            let speed = self.controller.speed_for(
                tension,
                self.tsm.frames_consumed(),
                self.tsm.frames_synthesized(),
            );
            if self.profile_enabled {
                self.profile.push((frame, speed));
            }
            self.tsm.set_speed(speed);
            self.frontier = self.frontier.saturating_add(self.step as u64);
            self.tsm.synthesize(self.frontier, false)?;
        }
        Ok(())
    }

    /// Pads or trims the tail so the total output matches the integral of
    /// the speed profile over the consumed input.
    fn reconcile_duration(&mut self) -> Result<(), SpeedError> {
        let target = self.tsm.expected_frames().round() as i64;
        let actual = self.tsm.frames_synthesized() as i64;
        let correction = target - actual;
        if correction > 0 {
            self.tsm.pad_output(correction as usize)?;
        } else if correction < 0 {
            let rate = self.tsm.rate() as f64;
            let post_rate = ((-correction) as f64 / rate).round() as usize;
            self.tsm.trim_output(post_rate);
        }
        Ok(())
    }

    fn update_drained(&mut self) {
        if self.state == StreamState::Flushing
            && self.tsm.output_frames() == 0
            && self.tsm.input_frames() == 0
        {
            self.state = StreamState::Drained;
        }
    }
}

impl std::fmt::Debug for StreamProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProcessor")
            .field("state", &self.state)
            .field("sample_rate", &self.config.sample_rate)
            .field("channels", &self.config.channels)
            .field("speed", &self.controller.speed())
            .field("nonlinear", &self.controller.nonlinear())
            .field("frames_analyzed", &self.analyzer.frames_analyzed())
            .field("frontier", &self.frontier)
            .finish()
    }
}
