//! Channel downmix and sample-rate conversion.
//!
//! Capture devices deliver audio at whatever rate and channel count the
//! hardware prefers; the recorder needs mono samples at the configured
//! target rate before container encoding.  Two conversion steps:
//!
//! 1. [`downmix_mono`] — average interleaved channels into one.
//! 2. [`resample`] — linear-interpolation rate conversion.
//!
//! Linear interpolation is adequate for speech headed to a transcription
//! model; a windowed-sinc upgrade via the `rubato` crate (already in
//! `Cargo.toml`) is the drop-in replacement if music-grade quality is ever
//! needed.

// ---------------------------------------------------------------------------
// downmix_mono
// ---------------------------------------------------------------------------

/// Average interleaved multi-channel audio down to a single channel.
///
/// Output length is `samples.len() / channels`.  Already-mono input is
/// returned as an owned copy without averaging; zero channels yields an
/// empty vector.
pub fn downmix_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Convert mono `samples` from `source_rate` Hz to `target_rate` Hz.
///
/// Matching rates and empty input are no-op fast paths.  Output length is
/// approximately `samples.len() * target_rate / source_rate`.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
