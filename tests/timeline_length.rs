//! Duration contracts: output length versus the global target.

mod common;

use common::*;
use speechstretch::{EngineConfig, StreamProcessor};

/// Speech-like test signal: wideband noise gated at syllable rate (4 Hz,
/// half loud, half quiet).
fn modulated_noise(num_samples: usize) -> Vec<f32> {
    let carrier = noise(num_samples, 7);
    carrier
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let envelope = if (4.0 * t).fract() < 0.5 { 1.0 } else { 0.15 };
            s * envelope
        })
        .collect()
}

#[test]
fn uniform_mode_hits_target_within_one_frame() {
    let input = sine(440.0, SAMPLE_RATE as usize * 3);
    for &speed in &[0.5f32, 0.75, 1.5, 2.0, 3.0, 4.0] {
        let mut stream = StreamProcessor::new(
            EngineConfig::new(SAMPLE_RATE, 1)
                .with_speed(speed)
                .with_duration_feedback(0.1),
        )
        .unwrap();
        let output = drive(&mut stream, &input, 4096);
        let target = input.len() as f64 / speed as f64;
        assert!(
            (output.len() as f64 - target).abs() <= 220.0,
            "speed {}: expected {} +/- 220, got {}",
            speed,
            target,
            output.len()
        );
    }
}

#[test]
fn nonlinear_mode_hits_target_within_two_percent() {
    let input = modulated_noise(SAMPLE_RATE as usize * 5);
    for &speed in &[1.5f32, 2.0, 3.0] {
        let mut stream = StreamProcessor::new(
            EngineConfig::new(SAMPLE_RATE, 1)
                .with_speed(speed)
                .with_nonlinear(1.0)
                .with_duration_feedback(0.1),
        )
        .unwrap();
        let output = drive(&mut stream, &input, 4096);
        let target = input.len() as f64 / speed as f64;
        let rel = (output.len() as f64 - target).abs() / target;
        assert!(
            rel <= 0.02,
            "speed {}: expected {} within 2%, got {} ({:.2}%)",
            speed,
            target,
            output.len(),
            rel * 100.0
        );
    }
}

#[test]
fn output_length_respects_speed_bounds() {
    // bytes_out stays between bytes_in / max_speed and bytes_in / min_speed.
    let input = modulated_noise(SAMPLE_RATE as usize * 3);
    let speed = 2.0f32;
    let mut stream = StreamProcessor::new(
        EngineConfig::new(SAMPLE_RATE, 1)
            .with_speed(speed)
            .with_nonlinear(1.0)
            .with_duration_feedback(0.1),
    )
    .unwrap();
    let output = drive(&mut stream, &input, 4096);

    let max_speed = (speed * 4.0).max(4.0) as f64;
    let min_speed = 0.5f64;
    assert!(output.len() as f64 <= input.len() as f64 / min_speed + 256.0);
    assert!(output.len() as f64 >= input.len() as f64 / max_speed - 256.0);
}

#[test]
fn flush_drains_in_finitely_many_reads() {
    let input = sine(440.0, SAMPLE_RATE as usize);
    let mut stream = StreamProcessor::new(
        EngineConfig::new(SAMPLE_RATE, 1)
            .with_speed(2.0)
            .with_nonlinear(1.0),
    )
    .unwrap();

    let mut remaining: &[f32] = &input;
    while !remaining.is_empty() {
        let n = stream.write_float(remaining).unwrap();
        remaining = &remaining[n..];
        let mut sink = vec![0.0f32; 8192];
        while stream.read_float(&mut sink) > 0 {}
    }
    stream.flush().unwrap();

    let mut total = 0usize;
    let mut buf = vec![0.0f32; 1024];
    let mut reads = 0;
    loop {
        let n = stream.read_float(&mut buf);
        if n == 0 {
            break;
        }
        total += n;
        reads += 1;
        assert!(reads < 10_000, "flush must drain in finitely many reads");
    }
    assert_eq!(stream.read_float(&mut buf), 0, "drained stream reads zero");
    assert!(total > 0, "flush should surface the buffered tail");
}

#[test]
fn short_input_still_approximates_target() {
    // Shorter than the hysteresis lookahead: everything finalizes at flush.
    let input = sine(440.0, 2000);
    let mut stream = StreamProcessor::new(
        EngineConfig::new(SAMPLE_RATE, 1)
            .with_speed(2.0)
            .with_nonlinear(1.0),
    )
    .unwrap();
    let output = drive(&mut stream, &input, 512);
    let target = input.len() as f64 / 2.0;
    assert!(
        (output.len() as f64 - target).abs() <= 400.0,
        "expected ~{}, got {}",
        target,
        output.len()
    );
}
