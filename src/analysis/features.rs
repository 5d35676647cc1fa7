// Feature extraction - slope and energy emphasis
//
// The band-passed signal is scaled to unit peak, differentiated with a
// five-point central difference and squared, so steep QRS slopes dominate
// the energy that the integrator accumulates.

use crate::config::MIN_SIGNAL_LEN;
use crate::error::DetectionError;

/// Five-point derivative approximation
///
/// `out[i] = (-s[i-2] - 2s[i-1] + 2s[i+1] + s[i+2]) / 8` for interior
/// samples. The two samples at each edge copy the nearest interior value.
pub fn derivative(signal: &[f64]) -> Result<Vec<f64>, DetectionError> {
    let n = signal.len();
    if n < MIN_SIGNAL_LEN {
        return Err(DetectionError::InvalidInput {
            length: n,
            minimum: MIN_SIGNAL_LEN,
        });
    }

    let mut output = vec![0.0; n];
    for i in 2..n - 2 {
        output[i] =
            (-signal[i - 2] - 2.0 * signal[i - 1] + 2.0 * signal[i + 1] + signal[i + 2]) / 8.0;
    }
    output[0] = output[2];
    output[1] = output[2];
    output[n - 1] = output[n - 3];
    output[n - 2] = output[n - 3];
    Ok(output)
}

/// Scale `signal` in place so its largest magnitude becomes 1
///
/// # Errors
/// `DegenerateSignal` when the largest magnitude is zero or not finite,
/// instead of dividing through and producing NaN/inf.
pub fn normalize(signal: &mut [f64], stage: &str) -> Result<(), DetectionError> {
    // f64::max drops NaN, so carry it through explicitly
    let peak = signal.iter().fold(0.0f64, |acc, v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            acc.max(v.abs())
        }
    });
    if peak == 0.0 || !peak.is_finite() {
        return Err(DetectionError::DegenerateSignal {
            stage: stage.to_string(),
        });
    }
    signal.iter_mut().for_each(|v| *v /= peak);
    Ok(())
}

/// Elementwise square, in place
pub fn square(signal: &mut [f64]) {
    signal.iter_mut().for_each(|v| *v *= *v);
}
