// Biquad - second-order recursive (IIR) filter primitive
//
// Coefficients are computed once at construction from a cutoff frequency
// and sampling rate; history is carried sample by sample until `reset`.
//
// Low-pass / high-pass use the bilinear-transform Butterworth design:
//   B = tan(pi * fc / fs), S = 1 + sqrt(2) * B + B^2
// Band-reject is a fixed-width notch with leak factor MU.

use std::f64::consts::{PI, SQRT_2};

use crate::error::DetectionError;

/// Leak factor controlling the notch width of [`FilterKind::BandReject`]
const NOTCH_MU: f64 = 0.005;

/// Response shape of a [`Biquad`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandReject,
}

/// Normalized difference-equation coefficients (a0 == 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    fn butterworth(cutoff: f64, high_pass: bool) -> Self {
        let b = (cutoff * PI).tan();
        let bb = b * b;
        let s = 1.0 + SQRT_2 * b + bb;

        let (b0, b1) = if high_pass {
            let b0 = 1.0 / s;
            (b0, -2.0 * b0)
        } else {
            let b0 = bb / s;
            (b0, 2.0 * b0)
        };

        Self {
            b0,
            b1,
            b2: b0,
            a1: 2.0 * (bb - 1.0) / s,
            a2: (1.0 - SQRT_2 * b + bb) / s,
        }
    }

    fn notch(cutoff: f64) -> Self {
        let b0 = 1.0 - NOTCH_MU;
        let b1 = (2.0 * PI * cutoff).cos() * (2.0 * NOTCH_MU - 2.0);
        Self {
            b0,
            b1,
            b2: b0,
            a1: b1,
            a2: 1.0 - 2.0 * NOTCH_MU,
        }
    }
}

/// Stateful 2-pole/2-zero filter
///
/// Owned per preprocessing pass and driven through `&mut self`; never
/// shared between signals without an explicit [`Biquad::reset`].
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    coeffs: BiquadCoefficients,
    x0: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Design a filter for `cutoff_hz` at `sampling_rate`
    ///
    /// # Errors
    /// `DetectionError::Configuration` if the rate is not positive or the
    /// cutoff is not strictly between 0 and Nyquist (the pre-warp tangent
    /// diverges at Nyquist).
    pub fn new(
        cutoff_hz: f64,
        sampling_rate: f64,
        kind: FilterKind,
    ) -> Result<Self, DetectionError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(DetectionError::configuration(format!(
                "filter sampling rate must be positive (got {})",
                sampling_rate
            )));
        }
        let nyquist = sampling_rate / 2.0;
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= nyquist {
            return Err(DetectionError::configuration(format!(
                "{:?} cutoff {} Hz must lie in (0, {}) Hz",
                kind, cutoff_hz, nyquist
            )));
        }

        let cutoff = cutoff_hz / sampling_rate;
        let coeffs = match kind {
            FilterKind::LowPass => BiquadCoefficients::butterworth(cutoff, false),
            FilterKind::HighPass => BiquadCoefficients::butterworth(cutoff, true),
            FilterKind::BandReject => BiquadCoefficients::notch(cutoff),
        };

        Ok(Self {
            kind,
            coeffs,
            x0: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        })
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coeffs
    }

    /// Filter one sample, advancing the history
    #[inline]
    pub fn apply(&mut self, sample: f64) -> f64 {
        let c = &self.coeffs;
        self.x2 = self.x1;
        self.x1 = self.x0;
        self.x0 = sample;
        let y = c.b0 * self.x0 + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Filter a whole sequence, continuing from the current history
    pub fn process(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&sample| self.apply(sample)).collect()
    }

    /// Clear history; coefficients are kept
    pub fn reset(&mut self) {
        self.x0 = 0.0;
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
