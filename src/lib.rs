#![forbid(unsafe_code)]
//! Nonlinear speech time-scale modification in pure Rust.
//!
//! `speechstretch` shortens speech without changing its pitch, compressing
//! vowels and low-information spans more aggressively than consonants and
//! onsets. A spectral analyzer scores each 10 ms frame with a *tension*
//! value in `[0, 1]`; a speed controller maps tension to an instantaneous
//! speed around the global target; and a pitch-synchronous overlap-add
//! scaler resynthesizes the audio at that speed. A duration feedback loop
//! keeps the overall output length on target.
//!
//! # Quick Start
//!
//! ```
//! use speechstretch::{speed_up, EngineConfig};
//!
//! // 2 seconds of a 440 Hz tone at 22.05 kHz.
//! let input: Vec<f32> = (0..44100)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22050.0).sin())
//!     .collect();
//!
//! let config = EngineConfig::new(22050, 1).with_speed(2.0);
//! let output = speed_up(&input, &config).unwrap();
//! assert_eq!(output.len(), input.len() / 2);
//! ```
//!
//! # Streaming
//!
//! For incremental use, drive a [`StreamProcessor`] directly:
//!
//! ```
//! use speechstretch::{EngineConfig, StreamProcessor};
//!
//! let config = EngineConfig::new(22050, 1).with_speed(1.5).with_nonlinear(1.0);
//! let mut stream = StreamProcessor::new(config).unwrap();
//! // stream.write_float(&chunk)? for each buffer, stream.read_float(&mut out)
//! // to drain, stream.flush()? at end of input.
//! ```

pub mod analysis;
pub mod control;
pub mod core;
pub mod error;
pub mod stream;
pub mod tsm;

pub use crate::core::types::{EngineConfig, Sample, FRAME_RATE_HZ};
pub use error::SpeedError;
pub use stream::StreamProcessor;

/// One-shot nonlinear speedup of an interleaved buffer.
///
/// Wraps create / write / flush / drain around a [`StreamProcessor`]. The
/// input length must be a multiple of the configured channel count.
///
/// # Errors
///
/// Returns [`SpeedError::InvalidConfiguration`] for an invalid config or a
/// misaligned input length.
///
/// # Example
///
/// ```
/// use speechstretch::{speed_up, EngineConfig};
///
/// let input: Vec<f32> = (0..22050)
///     .map(|i| (2.0 * std::f32::consts::PI * 330.0 * i as f32 / 22050.0).sin())
///     .collect();
/// let config = EngineConfig::new(22050, 1).with_speed(1.5).with_nonlinear(1.0);
/// let output = speed_up(&input, &config).unwrap();
/// assert!(output.len() < input.len());
/// ```
pub fn speed_up(input: &[f32], config: &EngineConfig) -> Result<Vec<f32>, SpeedError> {
    let mut stream = StreamProcessor::new(config.clone())?;
    let channels = config.channels;
    if input.len() % channels != 0 {
        return Err(SpeedError::InvalidConfiguration(format!(
            "input length {} is not a multiple of {} channels",
            input.len(),
            channels
        )));
    }

    let mut output = Vec::with_capacity(input.len() / config.speed.max(1.0) as usize + 1024);
    let mut buf = vec![0.0f32; 8192 * channels];
    let mut remaining = input;
    while !remaining.is_empty() {
        let accepted = stream.write_float(remaining)?;
        remaining = &remaining[accepted * channels..];
        loop {
            let n = stream.read_float(&mut buf);
            if n == 0 {
                break;
            }
            output.extend_from_slice(&buf[..n * channels]);
        }
    }

    stream.flush()?;
    loop {
        let n = stream.read_float(&mut buf);
        if n == 0 {
            break;
        }
        output.extend_from_slice(&buf[..n * channels]);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        let config = EngineConfig::new(22050, 1).with_speed(2.0);
        let output = speed_up(&[], &config).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn misaligned_input_is_rejected() {
        let config = EngineConfig::new(22050, 2);
        assert!(speed_up(&[0.0; 101], &config).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig::new(22050, 1).with_speed(9.0);
        assert!(speed_up(&[0.0; 1024], &config).is_err());
    }

    #[test]
    fn stereo_output_stays_interleaved() {
        let frames = 22050usize;
        let mut input = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f32 / 22050.0;
            let s = (2.0 * std::f32::consts::PI * 330.0 * t).sin();
            input.push(s);
            input.push(s);
        }
        let config = EngineConfig::new(22050, 2).with_speed(2.0);
        let output = speed_up(&input, &config).unwrap();
        assert_eq!(output.len() % 2, 0);
        assert_eq!(output.len(), input.len() / 2);
        for frame in output.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }
}
