#![allow(dead_code)]

use speechstretch::StreamProcessor;

pub const SAMPLE_RATE: u32 = 22050;

/// Mono sine wave at the test sample rate.
pub fn sine(freq: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// Impulse train: zeros with a 1.0 every `period` samples.
pub fn impulse_train(num_samples: usize, period: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; num_samples];
    for i in (0..num_samples).step_by(period) {
        out[i] = 1.0;
    }
    out
}

/// Deterministic wideband noise in [-0.5, 0.5].
pub fn noise(num_samples: usize, seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..num_samples)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
        })
        .collect()
}

pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|x| x * x).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Magnitude of the signal's projection onto a frequency, normalized by
/// length. Sharp enough to separate tones a few Hz apart on long signals.
pub fn projection(signal: &[f32], freq: f32) -> f64 {
    let (mut re, mut im) = (0.0f64, 0.0f64);
    for (i, &s) in signal.iter().enumerate() {
        let angle = 2.0 * std::f64::consts::PI * freq as f64 * i as f64 / SAMPLE_RATE as f64;
        re += s as f64 * angle.cos();
        im += s as f64 * angle.sin();
    }
    (re * re + im * im).sqrt() / signal.len() as f64
}

/// Counts distinct impulses above `threshold`, merging peaks closer than
/// `min_gap` samples.
pub fn count_impulses(signal: &[f32], threshold: f32, min_gap: usize) -> usize {
    let mut count = 0;
    let mut last: Option<usize> = None;
    for (i, &s) in signal.iter().enumerate() {
        if s.abs() < threshold {
            continue;
        }
        if let Some(prev) = last {
            if i - prev < min_gap {
                last = Some(i);
                continue;
            }
        }
        count += 1;
        last = Some(i);
    }
    count
}

/// Writes `input` in chunks, draining between writes, then flushes and
/// drains to completion. Returns the full interleaved output.
pub fn drive(stream: &mut StreamProcessor, input: &[f32], chunk_frames: usize) -> Vec<f32> {
    let channels = stream.config().channels;
    let mut output = Vec::new();
    let mut buf = vec![0.0f32; 8192 * channels];
    let mut offset = 0;
    while offset < input.len() {
        let end = (offset + chunk_frames * channels).min(input.len());
        let mut slice = &input[offset..end];
        while !slice.is_empty() {
            let accepted = stream.write_float(slice).expect("write");
            slice = &slice[accepted * channels..];
            loop {
                let n = stream.read_float(&mut buf);
                if n == 0 {
                    break;
                }
                output.extend_from_slice(&buf[..n * channels]);
            }
        }
        offset = end;
    }
    stream.flush().expect("flush");
    loop {
        let n = stream.read_float(&mut buf);
        if n == 0 {
            break;
        }
        output.extend_from_slice(&buf[..n * channels]);
    }
    output
}
