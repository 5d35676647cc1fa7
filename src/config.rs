//! Detector configuration
//!
//! Runtime parameters for the QRS detection pipeline, loadable from JSON
//! so thresholds and windows can be tuned per recording set without
//! recompilation. Field names use camelCase on the wire
//! (`windowSeconds`, `minRrSeconds`, ...); missing fields take defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DetectionError;

/// Smallest signal the pipeline can evaluate (five-point derivative and
/// the ±2 neighbor test both need two samples on each side).
pub const MIN_SIGNAL_LEN: usize = 5;

/// QRS detection parameters, expressed in seconds and hertz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Moving-window integration length
    pub window_seconds: f64,
    /// Refractory interval: candidates closer than this compete for one mark
    pub min_rr_seconds: f64,
    /// Beat gap after which search-back re-scans with the lower threshold
    pub max_rr_seconds: f64,
    /// Rate at which the fixed-tap band-pass is used verbatim
    pub reference_sampling_rate: f64,
    /// Low-pass corner of the recursive band-pass cascade
    pub low_pass_hz: f64,
    /// High-pass corner of the recursive band-pass cascade
    pub high_pass_hz: f64,
    /// Optional mains interference notch applied before band-pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notch_hz: Option<f64>,
    /// Initial span used to seed the signal/noise peak estimates
    ///
    /// 0 (the default) starts SPKI and NPKI at zero.
    pub learning_seconds: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_seconds: 0.16,
            min_rr_seconds: 0.2,
            max_rr_seconds: 2.0,
            reference_sampling_rate: 200.0,
            low_pass_hz: 11.0,
            high_pass_hz: 5.0,
            notch_hz: None,
            learning_seconds: 0.0,
        }
    }
}

/// Configuration resolved against a sampling rate, in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWidths {
    pub window: usize,
    pub min_rr: usize,
    pub max_rr: usize,
    pub learning: usize,
}

/// Convert a duration to the nearest whole number of samples
pub fn seconds_to_samples(seconds: f64, sampling_rate: f64) -> usize {
    (seconds * sampling_rate).round().max(0.0) as usize
}

impl DetectorConfig {
    /// Check every field and resolve time spans into sample counts
    ///
    /// # Returns
    /// * `Ok(SampleWidths)` - Window, refractory, search-back and learning widths
    /// * `Err(DetectionError::Configuration)` - First offending field
    pub fn validate(&self, sampling_rate: f64) -> Result<SampleWidths, DetectionError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(DetectionError::configuration(format!(
                "sampling rate must be positive (got {})",
                sampling_rate
            )));
        }
        if !self.reference_sampling_rate.is_finite() || self.reference_sampling_rate <= 0.0 {
            return Err(DetectionError::configuration(format!(
                "referenceSamplingRate must be positive (got {})",
                self.reference_sampling_rate
            )));
        }
        require_positive("windowSeconds", self.window_seconds)?;
        require_positive("minRrSeconds", self.min_rr_seconds)?;
        require_positive("maxRrSeconds", self.max_rr_seconds)?;
        require_positive("lowPassHz", self.low_pass_hz)?;
        require_positive("highPassHz", self.high_pass_hz)?;
        if let Some(notch) = self.notch_hz {
            require_positive("notchHz", notch)?;
        }
        if !self.learning_seconds.is_finite() || self.learning_seconds < 0.0 {
            return Err(DetectionError::configuration(format!(
                "learningSeconds must be zero or positive (got {})",
                self.learning_seconds
            )));
        }

        let window = seconds_to_samples(self.window_seconds, sampling_rate);
        if window == 0 {
            return Err(DetectionError::configuration(format!(
                "integration window of {}s is shorter than one sample at {} Hz",
                self.window_seconds, sampling_rate
            )));
        }

        let min_rr = seconds_to_samples(self.min_rr_seconds, sampling_rate);
        let max_rr = seconds_to_samples(self.max_rr_seconds, sampling_rate);
        if min_rr == 0 {
            return Err(DetectionError::configuration(format!(
                "minRrSeconds of {}s is shorter than one sample at {} Hz",
                self.min_rr_seconds, sampling_rate
            )));
        }
        if max_rr <= min_rr {
            return Err(DetectionError::configuration(format!(
                "maxRrSeconds ({}) must exceed minRrSeconds ({})",
                self.max_rr_seconds, self.min_rr_seconds
            )));
        }

        Ok(SampleWidths {
            window,
            min_rr,
            max_rr,
            learning: seconds_to_samples(self.learning_seconds, sampling_rate),
        })
    }

    /// True when the fixed-tap band-pass applies at this rate
    pub fn uses_reference_filter(&self, sampling_rate: f64) -> bool {
        (sampling_rate - self.reference_sampling_rate).abs() < 1e-9
    }

    /// Read configuration from a JSON file, failing on any I/O or parse error
    ///
    /// Used when the caller named the file explicitly.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading detector config {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing detector config {}", path.display()))?;
        log::info!("[Config] Loaded detector configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        Self::read_from_file(&path).unwrap_or_else(|err| {
            log::warn!("[Config] {:#}. Using defaults.", err);
            Self::default()
        })
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), DetectionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DetectionError::configuration(format!(
            "{} must be positive (got {})",
            field, value
        )))
    }
}
