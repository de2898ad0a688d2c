//! Period-synchronous overlap-add time scaler.
//!
//! Splices pitch-period-sized blocks with raised-cosine cross-fades to change
//! duration without changing pitch. Multi-channel streams share one period
//! estimate (taken on a mixdown) and cross-fade per channel at identical
//! offsets, keeping channels phase-locked.

use crate::core::ring_buffer::RingBuffer;
use crate::error::SpeedError;
use crate::tsm::pitch::PitchPeriodEstimator;

/// Speeds within this band of 1.0 copy input straight through.
const UNITY_BAND: f32 = 1e-3;
/// Hard cap on any single ring allocation, in samples.
const MAX_BUFFER_SAMPLES: usize = 1 << 27;

/// Streaming overlap-add engine driven by a time-varying speed.
pub struct SolaEngine {
    channels: usize,
    speed: f32,
    rate: f32,
    max_period: usize,
    pitch: PitchPeriodEstimator,
    input: RingBuffer,
    output: RingBuffer,
    output_max: usize,
    /// Straight-copy samples still owed from a previous splice step.
    remaining_copy: usize,
    /// Per-channel input frames consumed.
    consumed: u64,
    /// Per-channel frames synthesized (before pitch-rate resampling).
    synthesized: u64,
    /// Output frames the speed profile implies, `Σ consumed / s`.
    expected: f64,
    // Reusable scratch.
    step_in: Vec<f32>,
    step_out: Vec<f32>,
    mixdown: Vec<f32>,
    rate_out: Vec<f32>,
    // Linear-interpolation resampler state for the pitch-rate path.
    rate_pos: f64,
    rate_prev: Vec<f32>,
}

impl SolaEngine {
    /// Creates an engine with the given input capacity in per-channel frames.
    pub fn new(
        sample_rate: u32,
        channels: usize,
        rate: f32,
        input_capacity_frames: usize,
    ) -> Result<Self, SpeedError> {
        let pitch = PitchPeriodEstimator::new(sample_rate);
        let max_period = pitch.max_period();

        let input_capacity = input_capacity_frames
            .checked_mul(channels)
            .filter(|&n| n <= MAX_BUFFER_SAMPLES)
            .ok_or(SpeedError::AllocationFailed {
                buffer: "input_ring",
                requested: usize::MAX,
                capacity: MAX_BUFFER_SAMPLES,
            })?;
        let output_max = input_capacity_frames
            .checked_mul(16)
            .and_then(|n| n.checked_mul(channels))
            .filter(|&n| n <= MAX_BUFFER_SAMPLES)
            .ok_or(SpeedError::AllocationFailed {
                buffer: "output_ring",
                requested: usize::MAX,
                capacity: MAX_BUFFER_SAMPLES,
            })?;

        let step_cap = 2 * max_period * channels;
        Ok(Self {
            channels,
            speed: 1.0,
            rate,
            max_period,
            pitch,
            input: RingBuffer::with_capacity(input_capacity),
            output: RingBuffer::with_capacity((step_cap * 8).min(output_max)),
            output_max,
            remaining_copy: 0,
            consumed: 0,
            synthesized: 0,
            expected: 0.0,
            step_in: vec![0.0; step_cap],
            step_out: vec![0.0; step_cap],
            mixdown: vec![0.0; 2 * max_period],
            rate_out: Vec::new(),
            rate_pos: 0.0,
            rate_prev: vec![0.0; channels],
        })
    }

    /// Free input space in per-channel frames.
    #[inline]
    pub fn input_space_frames(&self) -> usize {
        self.input.available() / self.channels
    }

    /// Buffered input in per-channel frames.
    #[inline]
    pub fn input_frames(&self) -> usize {
        self.input.len() / self.channels
    }

    /// Synthesized output ready to read, in per-channel frames.
    #[inline]
    pub fn output_frames(&self) -> usize {
        self.output.len() / self.channels
    }

    #[inline]
    pub fn frames_consumed(&self) -> u64 {
        self.consumed
    }

    #[inline]
    pub fn frames_synthesized(&self) -> u64 {
        self.synthesized
    }

    /// Output length the speed profile implies for the input consumed so far.
    #[inline]
    pub fn expected_frames(&self) -> f64 {
        self.expected
    }

    #[inline]
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    #[inline]
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    /// Current pitch rate.
    #[inline]
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Appends interleaved input; returns the number of frames accepted.
    pub fn write(&mut self, interleaved: &[f32]) -> usize {
        debug_assert_eq!(interleaved.len() % self.channels, 0);
        let frames = (interleaved.len() / self.channels).min(self.input_space_frames());
        let pushed = self.input.push_slice(&interleaved[..frames * self.channels]);
        debug_assert_eq!(pushed, frames * self.channels);
        frames
    }

    /// Drains up to `out.len() / channels` frames of output.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let frames = (out.len() / self.channels).min(self.output_frames());
        let popped = self.output.pop_slice(&mut out[..frames * self.channels]);
        debug_assert_eq!(popped, frames * self.channels);
        frames
    }

    /// Runs synthesis steps while input, the consumption frontier, and output
    /// space allow.
    ///
    /// `frontier` bounds total consumption in per-channel frames (pass
    /// `u64::MAX` for no bound). With `flushing` set, sub-period remainders
    /// are copied straight through so the input ring fully drains.
    pub fn synthesize(&mut self, frontier: u64, flushing: bool) -> Result<(), SpeedError> {
        loop {
            let allowed = frontier.saturating_sub(self.consumed);
            let avail = (self.input_frames() as u64).min(allowed) as usize;
            if avail == 0 {
                return Ok(());
            }
            if !self.ensure_output_room(2 * self.max_period, flushing)? {
                return Ok(());
            }

            if self.remaining_copy > 0 {
                let n = self.remaining_copy.min(avail).min(2 * self.max_period);
                self.copy_through(n);
                self.remaining_copy -= n;
                continue;
            }

            if !flushing && avail < self.pitch.window_len() {
                return Ok(());
            }

            let period = self.refresh_period(avail);
            let s = self.speed;

            if (s - 1.0).abs() <= UNITY_BAND {
                let n = period.min(avail);
                self.copy_through(n);
                continue;
            }

            if s > 1.0 {
                // Drop one period by cross-fading the current block into the
                // block one period ahead.
                let n = if s >= 2.0 {
                    (((period as f32) / (s - 1.0)).round() as usize).max(1)
                } else {
                    period
                };
                if period + n > avail {
                    if flushing {
                        self.copy_through(avail);
                        continue;
                    }
                    return Ok(());
                }
                self.splice_skip(period, n);
                if s < 2.0 {
                    self.remaining_copy =
                        ((period as f32) * (2.0 - s) / (s - 1.0)).round() as usize;
                }
            } else {
                // Insert a cross-faded repeat of the current period.
                let n = if s < 0.5 {
                    (((period as f32) * s / (1.0 - s)).round() as usize).max(1)
                } else {
                    period
                };
                if period + n > avail {
                    if flushing {
                        self.copy_through(avail);
                        continue;
                    }
                    return Ok(());
                }
                self.splice_insert(period, n);
                if s >= 0.5 {
                    self.remaining_copy =
                        ((period as f32) * (2.0 * s - 1.0) / (1.0 - s)).round() as usize;
                }
            }
        }
    }

    /// Emits `frames` of silence through the normal output path.
    pub fn pad_output(&mut self, frames: usize) -> Result<(), SpeedError> {
        let chunk = 2 * self.max_period;
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(chunk);
            self.ensure_output_room(n, true)?;
            self.step_out[..n * self.channels].fill(0.0);
            let out = std::mem::take(&mut self.step_out);
            self.emit(&out[..n * self.channels]);
            self.step_out = out;
            self.synthesized += n as u64;
            remaining -= n;
        }
        Ok(())
    }

    /// Removes up to `frames` from the back of the output ring. Returns the
    /// number of frames removed.
    pub fn trim_output(&mut self, frames: usize) -> usize {
        let n = frames.min(self.output_frames());
        self.output.truncate_back(n * self.channels);
        n
    }

    /// Re-estimates the pitch period from the upcoming input block.
    fn refresh_period(&mut self, avail: usize) -> usize {
        let frames = self.pitch.window_len().min(avail);
        let samples = frames * self.channels;
        let copied = self.input.peek_slice(&mut self.step_in[..samples]);
        debug_assert_eq!(copied, samples);
        for (i, slot) in self.mixdown[..frames].iter_mut().enumerate() {
            let frame = &self.step_in[i * self.channels..(i + 1) * self.channels];
            *slot = frame.iter().sum::<f32>() / self.channels as f32;
        }
        self.pitch.estimate(&self.mixdown[..frames])
    }

    /// Copies `n` frames from the input head to the output unchanged.
    fn copy_through(&mut self, n: usize) {
        let samples = n * self.channels;
        let copied = self.input.peek_slice(&mut self.step_in[..samples]);
        debug_assert_eq!(copied, samples);
        let buf = std::mem::take(&mut self.step_in);
        self.emit(&buf[..samples]);
        self.step_in = buf;
        self.input.discard(samples);
        self.account(n, n);
    }

    /// Cross-fades the current block into the block one period ahead,
    /// emitting `n` frames while consuming `period + n`.
    fn splice_skip(&mut self, period: usize, n: usize) {
        let c = self.channels;
        let samples = (period + n) * c;
        let copied = self.input.peek_slice(&mut self.step_in[..samples]);
        debug_assert_eq!(copied, samples);

        for i in 0..n {
            let fade_in = raised_cosine(i, n);
            let fade_out = 1.0 - fade_in;
            for ch in 0..c {
                self.step_out[i * c + ch] = self.step_in[i * c + ch] * fade_out
                    + self.step_in[(i + period) * c + ch] * fade_in;
            }
        }
        let out = std::mem::take(&mut self.step_out);
        self.emit(&out[..n * c]);
        self.step_out = out;
        self.input.discard(samples);
        self.account(period + n, n);
    }

    /// Copies one period, then cross-fades from the continuation back to a
    /// repeat of it, emitting `period + n` frames while consuming `n`.
    fn splice_insert(&mut self, period: usize, n: usize) {
        let c = self.channels;
        let samples = (period + n) * c;
        let copied = self.input.peek_slice(&mut self.step_in[..samples]);
        debug_assert_eq!(copied, samples);

        self.step_out[..period * c].copy_from_slice(&self.step_in[..period * c]);
        for i in 0..n {
            let fade_in = raised_cosine(i, n);
            let fade_out = 1.0 - fade_in;
            for ch in 0..c {
                self.step_out[(period + i) * c + ch] = self.step_in[(period + i) * c + ch]
                    * fade_out
                    + self.step_in[i * c + ch] * fade_in;
            }
        }
        let out = std::mem::take(&mut self.step_out);
        self.emit(&out[..(period + n) * c]);
        self.step_out = out;
        self.input.discard(n * c);
        self.account(n, period + n);
    }

    fn account(&mut self, consumed: usize, emitted: usize) {
        self.consumed += consumed as u64;
        self.synthesized += emitted as u64;
        self.expected += consumed as f64 / self.speed as f64;
    }

    /// Pushes synthesized frames into the output ring, resampling by the
    /// pitch rate when it is not unity.
    fn emit(&mut self, interleaved: &[f32]) {
        if self.rate == 1.0 {
            let pushed = self.output.push_slice(interleaved);
            debug_assert_eq!(pushed, interleaved.len());
            return;
        }

        let c = self.channels;
        let frames = interleaved.len() / c;
        let mut rate_out = std::mem::take(&mut self.rate_out);
        rate_out.clear();

        // Positions are measured from the previously emitted frame, which
        // sits at index -1 of the incoming block.
        let mut pos = self.rate_pos;
        while pos < frames as f64 {
            let base = pos.floor();
            let frac = (pos - base) as f32;
            let i1 = base as usize;
            for ch in 0..c {
                let a = if i1 == 0 {
                    self.rate_prev[ch]
                } else {
                    interleaved[(i1 - 1) * c + ch]
                };
                let b = interleaved[i1 * c + ch];
                rate_out.push(a + (b - a) * frac);
            }
            pos += self.rate as f64;
        }
        self.rate_pos = pos - frames as f64;
        self.rate_prev
            .copy_from_slice(&interleaved[(frames - 1) * c..]);

        let pushed = self.output.push_slice(&rate_out);
        debug_assert_eq!(pushed, rate_out.len());
        self.rate_out = rate_out;
    }

    /// Makes room in the output ring for `frames` of pre-rate synthesis,
    /// growing the ring if needed.
    ///
    /// Returns `false` when the ring is at its limit and the caller should
    /// yield to the reader; with `flushing` set, hitting the limit is an
    /// error instead, since flush must drain the whole input.
    fn ensure_output_room(&mut self, frames: usize, flushing: bool) -> Result<bool, SpeedError> {
        let post_rate = (frames as f64 / self.rate as f64).ceil() as usize + 2;
        let needed = post_rate * self.channels;
        if self.output.available() >= needed {
            return Ok(true);
        }
        let target = (self.output.capacity() * 2)
            .max(self.output.len() + needed)
            .min(self.output_max);
        if target > self.output.capacity() {
            self.output.grow_to(target);
        }
        if self.output.available() >= needed {
            return Ok(true);
        }
        if flushing {
            return Err(SpeedError::AllocationFailed {
                buffer: "output_ring",
                requested: self.output.len() + needed,
                capacity: self.output_max,
            });
        }
        Ok(false)
    }
}

impl std::fmt::Debug for SolaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolaEngine")
            .field("channels", &self.channels)
            .field("speed", &self.speed)
            .field("rate", &self.rate)
            .field("input_frames", &self.input_frames())
            .field("output_frames", &self.output_frames())
            .field("consumed", &self.consumed)
            .field("synthesized", &self.synthesized)
            .finish()
    }
}

#[inline]
fn raised_cosine(i: usize, n: usize) -> f32 {
    let t = i as f32 / n as f32;
    0.5 * (1.0 - (std::f32::consts::PI * t).cos())
}
