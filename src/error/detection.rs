// Detection error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Detection error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`DetectionError::code`], so callers can match on them without
/// constructing an error value.
///
/// Error code range: 3001-3003
pub struct DetectionErrorCodes {}

impl DetectionErrorCodes {
    /// Signal too short for the five-point derivative / neighbor test
    pub const INVALID_INPUT: i32 = 3001;

    /// Normalization hit a zero maximum
    pub const DEGENERATE_SIGNAL: i32 = 3002;

    /// Rejected detector or filter parameters
    pub const CONFIGURATION: i32 = 3003;
}

/// Log a detection error with structured context
///
/// This function logs detection errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_detection_error(err: &DetectionError, context: &str) {
    error!(
        "Detection error in {}: code={}, component=QrsDetector, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// QRS detection errors
///
/// All variants are terminal for the call that produced them; the pipeline
/// is a pure function over its input so there is nothing to retry.
///
/// Error code range: 3001-3003
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// Signal is shorter than the minimum the pipeline can evaluate
    InvalidInput { length: usize, minimum: usize },

    /// Normalization found a zero (or non-finite) maximum
    DegenerateSignal { stage: String },

    /// Detector, filter or window parameters are unusable
    Configuration { reason: String },
}

impl DetectionError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        DetectionError::Configuration {
            reason: reason.into(),
        }
    }
}

impl ErrorCode for DetectionError {
    fn code(&self) -> i32 {
        match self {
            DetectionError::InvalidInput { .. } => DetectionErrorCodes::INVALID_INPUT,
            DetectionError::DegenerateSignal { .. } => DetectionErrorCodes::DEGENERATE_SIGNAL,
            DetectionError::Configuration { .. } => DetectionErrorCodes::CONFIGURATION,
        }
    }

    fn message(&self) -> String {
        match self {
            DetectionError::InvalidInput { length, minimum } => {
                format!(
                    "Signal too short: need at least {} samples, got {}",
                    minimum, length
                )
            }
            DetectionError::DegenerateSignal { stage } => {
                format!("Degenerate signal: no non-zero maximum after {}", stage)
            }
            DetectionError::Configuration { reason } => {
                format!("Invalid configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DetectionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DetectionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_error_codes() {
        assert_eq!(
            DetectionError::InvalidInput {
                length: 3,
                minimum: 5
            }
            .code(),
            3001
        );
        assert_eq!(
            DetectionError::DegenerateSignal {
                stage: "bandpass".to_string()
            }
            .code(),
            3002
        );
        assert_eq!(DetectionError::configuration("bad").code(), 3003);
    }

    #[test]
    fn test_codes_match_constants() {
        assert_eq!(
            DetectionError::configuration("x").code(),
            DetectionErrorCodes::CONFIGURATION
        );
        assert_eq!(
            DetectionError::DegenerateSignal {
                stage: "x".to_string()
            }
            .code(),
            DetectionErrorCodes::DEGENERATE_SIGNAL
        );
    }

    #[test]
    fn test_detection_error_display() {
        let err = DetectionError::InvalidInput {
            length: 3,
            minimum: 5,
        };
        assert!(err.message().contains("at least 5"));
        assert!(err.message().contains("got 3"));

        let err = DetectionError::DegenerateSignal {
            stage: "bandpass".to_string(),
        };
        assert!(err.to_string().contains("code 3002"));
        assert!(err.to_string().contains("bandpass"));
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), DetectionError> {
            Err(DetectionError::configuration("window must be positive"))
        }

        fn caller() -> Result<(), DetectionError> {
            may_fail()?;
            Ok(())
        }

        let err = caller().unwrap_err();
        assert!(err.message().contains("window must be positive"));
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = DetectionError::configuration("cutoff").into();
        assert!(err.to_string().contains("cutoff"));
    }
}
