// Moving window integration
//
// Causal box average over `window_size` samples, kept as a running sum.
// The divisor stays at `window_size` even before the window has filled,
// so the first samples are biased low.

use crate::error::DetectionError;

/// Causal sliding-window average of `signal`
pub fn integrate(signal: &[f64], window_size: usize) -> Result<Vec<f64>, DetectionError> {
    if window_size == 0 {
        return Err(DetectionError::configuration(
            "integration window must be at least one sample",
        ));
    }

    let width = window_size as f64;
    let mut sum = 0.0;
    let mut output = Vec::with_capacity(signal.len());
    for (i, &value) in signal.iter().enumerate() {
        sum += value;
        if i >= window_size {
            sum -= signal[i - window_size];
        }
        output.push(sum / width);
    }
    Ok(output)
}
