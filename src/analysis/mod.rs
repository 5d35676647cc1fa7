// Analysis module - batch QRS detection pipeline
//
// This module orchestrates the complete detection pipeline over an
// in-memory ECG recording and produces one mark per input sample.
//
// Architecture:
// - bandpass: fixed-tap (reference rate) or recursive band-pass, reports delay
// - features: normalize -> five-point derivative -> square
// - integrator: causal moving-window energy
// - threshold: adaptive dual-threshold decision engine with search-back
// - delay: shifts marks back by the band-pass group delay
//
// Every call owns its filters, scratch buffers and engine state, so
// independent signals can be processed concurrently.

use serde::Serialize;

use crate::config::{DetectorConfig, SampleWidths, MIN_SIGNAL_LEN};
use crate::error::{log_detection_error, DetectionError};

pub mod bandpass;
pub mod delay;
pub mod features;
pub mod filter;
pub mod integrator;
pub mod threshold;

use filter::{Biquad, FilterKind};
use threshold::{DecisionEngine, SearchBackWindow, ThresholdState};

/// Detection result with the diagnostics gathered along the way
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    /// One flag per input sample, delay compensated
    #[serde(skip)]
    pub marks: Vec<bool>,
    /// Indices of the `true` marks, ascending
    pub beats: Vec<usize>,
    /// Samples removed by delay compensation
    pub group_delay: usize,
    /// Window and interval widths used for this rate
    pub widths: SampleWidths,
    /// Search-back passes, in integrated-signal (uncompensated) indices
    pub search_backs: Vec<SearchBackWindow>,
    /// SPKI/NPKI and thresholds when the scan finished
    pub final_thresholds: ThresholdState,
}

impl Detection {
    pub fn beat_count(&self) -> usize {
        self.beats.len()
    }

    /// Beat positions in seconds from the start of the signal
    pub fn beat_times(&self, sampling_rate: f64) -> Vec<f64> {
        self.beats
            .iter()
            .map(|&i| i as f64 / sampling_rate)
            .collect()
    }
}

/// Integrated energy (stages 1-4) and the band-pass delay it carries
#[derive(Debug, Clone)]
pub struct EnergyTrace {
    pub integrated: Vec<f64>,
    pub group_delay: usize,
}

/// QRS detector bound to one sampling rate and configuration
///
/// Holds no per-signal state; `run` may be called any number of times and
/// from several threads at once.
#[derive(Debug, Clone)]
pub struct QrsDetector {
    sampling_rate: f64,
    config: DetectorConfig,
    widths: SampleWidths,
}

impl QrsDetector {
    /// Validate `config` against `sampling_rate`
    ///
    /// Filter cutoffs are checked here too, so a cutoff at or above Nyquist
    /// fails at construction rather than on the first signal.
    pub fn new(sampling_rate: f64, config: DetectorConfig) -> Result<Self, DetectionError> {
        let widths = config.validate(sampling_rate)?;

        if let Some(notch_hz) = config.notch_hz {
            Biquad::new(notch_hz, sampling_rate, FilterKind::BandReject)?;
        }
        if !config.uses_reference_filter(sampling_rate) {
            Biquad::new(config.low_pass_hz, sampling_rate, FilterKind::LowPass)?;
            Biquad::new(config.high_pass_hz, sampling_rate, FilterKind::HighPass)?;
        }

        Ok(Self {
            sampling_rate,
            config,
            widths,
        })
    }

    pub fn with_defaults(sampling_rate: f64) -> Result<Self, DetectionError> {
        Self::new(sampling_rate, DetectorConfig::default())
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn widths(&self) -> SampleWidths {
        self.widths
    }

    /// Run stages 1-4: band-pass, normalize, derivative, square, integrate
    pub fn energy(&self, signal: &[f64]) -> Result<EnergyTrace, DetectionError> {
        check_length(signal)?;

        let pre = bandpass::preprocess(signal, self.sampling_rate, &self.config)?;
        let mut filtered = pre.filtered;
        features::normalize(&mut filtered, "bandpass")?;

        let mut energy = features::derivative(&filtered)?;
        features::square(&mut energy);

        let integrated = integrator::integrate(&energy, self.widths.window)?;
        tracing::debug!(
            "[QrsDetector] Energy trace ready: {} samples, window {} samples, delay {} samples",
            integrated.len(),
            self.widths.window,
            pre.group_delay
        );

        Ok(EnergyTrace {
            integrated,
            group_delay: pre.group_delay,
        })
    }

    /// Run the full pipeline over `signal`
    pub fn run(&self, signal: &[f64]) -> Result<Detection, DetectionError> {
        let trace = self.energy(signal)?;

        let mut engine = DecisionEngine::new(&self.widths);
        let outcome = engine.run(&trace.integrated)?;
        let raw_count = outcome.marks.iter().filter(|&&m| m).count();

        let mut marks = outcome.marks;
        delay::compensate(&mut marks, trace.group_delay);

        let beats: Vec<usize> = marks
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| m.then_some(i))
            .collect();

        if beats.len() < raw_count {
            tracing::debug!(
                "[QrsDetector] Delay compensation dropped {} mark(s) at the signal start",
                raw_count - beats.len()
            );
        }
        tracing::info!(
            "[QrsDetector] Detected {} beats in {} samples at {} Hz ({} search-back pass(es))",
            beats.len(),
            signal.len(),
            self.sampling_rate,
            outcome.search_backs.len()
        );

        Ok(Detection {
            marks,
            beats,
            group_delay: trace.group_delay,
            widths: self.widths,
            search_backs: outcome.search_backs,
            final_thresholds: engine.thresholds(),
        })
    }
}

fn check_length(signal: &[f64]) -> Result<(), DetectionError> {
    if signal.len() < MIN_SIGNAL_LEN {
        return Err(DetectionError::InvalidInput {
            length: signal.len(),
            minimum: MIN_SIGNAL_LEN,
        });
    }
    Ok(())
}

/// Detect QRS complexes with the default configuration
///
/// # Returns
/// One flag per sample of `signal`; `true` where a beat was detected
pub fn detect(signal: &[f64], sampling_rate: f64) -> Result<Vec<bool>, DetectionError> {
    detect_with_config(signal, sampling_rate, &DetectorConfig::default())
}

/// Detect QRS complexes with an explicit configuration
pub fn detect_with_config(
    signal: &[f64],
    sampling_rate: f64,
    config: &DetectorConfig,
) -> Result<Vec<bool>, DetectionError> {
    QrsDetector::new(sampling_rate, config.clone())
        .and_then(|detector| detector.run(signal))
        .map(|detection| detection.marks)
        .inspect_err(|err| log_detection_error(err, "detect"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(rate: f64, seconds: f64, beat_times: &[f64]) -> Vec<f64> {
        let n = (rate * seconds) as usize;
        let sigma = 0.01 * rate;
        (0..n)
            .map(|i| {
                beat_times
                    .iter()
                    .map(|&t| {
                        let d = (i as f64 - t * rate) / sigma;
                        (-0.5 * d * d).exp()
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn test_marks_match_input_length() {
        for n in [5, 6, 17, 400, 1001] {
            let signal: Vec<f64> = (0..n).map(|i| ((i * 13) % 7) as f64 - 3.0).collect();
            let marks = detect(&signal, 200.0).unwrap();
            assert_eq!(marks.len(), n);
        }
    }

    #[test]
    fn test_short_signal_rejected() {
        let err = detect(&[1.0, 2.0, 3.0, 4.0], 200.0).unwrap_err();
        assert_eq!(
            err,
            DetectionError::InvalidInput {
                length: 4,
                minimum: 5
            }
        );
    }

    #[test]
    fn test_all_zero_signal_is_degenerate() {
        let err = detect(&vec![0.0; 2000], 360.0).unwrap_err();
        assert!(matches!(err, DetectionError::DegenerateSignal { .. }));
    }

    #[test]
    fn test_nyquist_cutoff_rejected_at_construction() {
        let config = DetectorConfig {
            low_pass_hz: 30.0,
            ..DetectorConfig::default()
        };
        let err = QrsDetector::new(50.0, config).unwrap_err();
        assert!(matches!(err, DetectionError::Configuration { .. }));
    }

    #[test]
    fn test_reference_rate_pulse_train() {
        let rate = 200.0;
        let times: Vec<f64> = (0..8).map(|k| 0.5 + 0.8 * k as f64).collect();
        let signal = pulse_train(rate, 7.0, &times);

        let detection = QrsDetector::with_defaults(rate).unwrap().run(&signal).unwrap();
        assert_eq!(detection.group_delay, 22);
        assert_eq!(detection.beat_count(), times.len());
        for (beat, t) in detection.beat_times(rate).iter().zip(times.iter()) {
            assert!((beat - t).abs() <= 0.16, "beat {} vs pulse {}", beat, t);
        }
    }

    #[test]
    fn test_energy_trace_is_non_negative() {
        let signal = pulse_train(360.0, 3.0, &[0.5, 1.3, 2.1]);
        let trace = QrsDetector::with_defaults(360.0)
            .unwrap()
            .energy(&signal)
            .unwrap();
        assert_eq!(trace.integrated.len(), signal.len());
        assert!(trace.integrated.iter().all(|&v| v >= 0.0));
        assert_eq!(trace.group_delay, 22);
    }

    #[test]
    fn test_marks_and_beats_agree() {
        let signal = pulse_train(250.0, 5.0, &[0.5, 1.4, 2.3, 3.2, 4.1]);
        let detection = QrsDetector::with_defaults(250.0).unwrap().run(&signal).unwrap();
        let from_marks: Vec<usize> = detection
            .marks
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| m.then_some(i))
            .collect();
        assert_eq!(from_marks, detection.beats);
    }
}
