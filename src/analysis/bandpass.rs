// Bandpass preprocessing - QRS energy emphasis
//
// At the reference rate (200 Hz by default) the integer-coefficient
// cascade from the Pan-Tompkins article is applied verbatim:
//   low-pass:  y[n] = 2y[n-1] - y[n-2] + x[n] - 2x[n-6] + x[n-12]
//   high-pass: y[n] = -y[n-1] - z[n] + 32z[n-16] + z[n-32]
// Any other rate goes through a Butterworth low-pass then high-pass pair.
// An optional notch removes mains interference before either path.

use crate::analysis::filter::{Biquad, FilterKind};
use crate::config::{seconds_to_samples, DetectorConfig};
use crate::error::DetectionError;

/// Group delay of the fixed-tap cascade in samples (6 low-pass + 16 high-pass)
pub const REFERENCE_GROUP_DELAY: usize = 6 + 16;

/// Empirical compensation for the recursive cascade, in seconds
const RECURSIVE_DELAY_SECONDS: f64 = 0.06;

/// Band-pass output with the delay it introduced
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub filtered: Vec<f64>,
    pub group_delay: usize,
}

/// Band-pass `signal` for QRS detection
///
/// # Returns
/// Filtered sequence (same length as `signal`) and the group delay in
/// samples that the delay compensator should remove.
pub fn preprocess(
    signal: &[f64],
    sampling_rate: f64,
    config: &DetectorConfig,
) -> Result<Preprocessed, DetectionError> {
    let notched;
    let input = match config.notch_hz {
        Some(notch_hz) => {
            let mut notch = Biquad::new(notch_hz, sampling_rate, FilterKind::BandReject)?;
            notched = notch.process(signal);
            &notched[..]
        }
        None => signal,
    };

    if config.uses_reference_filter(sampling_rate) {
        tracing::debug!("[Bandpass] Using fixed-tap cascade at {} Hz", sampling_rate);
        let low = reference_low_pass(input);
        Ok(Preprocessed {
            filtered: reference_high_pass(&low),
            group_delay: REFERENCE_GROUP_DELAY,
        })
    } else {
        let mut low_pass = Biquad::new(config.low_pass_hz, sampling_rate, FilterKind::LowPass)?;
        let mut high_pass = Biquad::new(config.high_pass_hz, sampling_rate, FilterKind::HighPass)?;
        let group_delay = seconds_to_samples(RECURSIVE_DELAY_SECONDS, sampling_rate);
        tracing::debug!(
            "[Bandpass] Using recursive cascade {}-{} Hz at {} Hz (delay {} samples)",
            config.high_pass_hz,
            config.low_pass_hz,
            sampling_rate,
            group_delay
        );

        let filtered = input
            .iter()
            .map(|&sample| high_pass.apply(low_pass.apply(sample)))
            .collect();
        Ok(Preprocessed {
            filtered,
            group_delay,
        })
    }
}

/// Integer-tap low-pass (~11 Hz at 200 Hz), zero before the sequence start
fn reference_low_pass(x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; x.len()];
    for n in 0..x.len() {
        let mut value = x[n];
        if n >= 1 {
            value += 2.0 * y[n - 1];
        }
        if n >= 2 {
            value -= y[n - 2];
        }
        if n >= 6 {
            value -= 2.0 * x[n - 6];
        }
        if n >= 12 {
            value += x[n - 12];
        }
        y[n] = value;
    }
    y
}

/// Integer-tap high-pass (~5 Hz at 200 Hz) applied to the low-pass output
fn reference_high_pass(z: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; z.len()];
    for n in 0..z.len() {
        let mut value = -z[n];
        if n >= 1 {
            value -= y[n - 1];
        }
        if n >= 16 {
            value += 32.0 * z[n - 16];
        }
        if n >= 32 {
            value += z[n - 32];
        }
        y[n] = value;
    }
    y
}
