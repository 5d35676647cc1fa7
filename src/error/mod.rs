// Error types for the QRS detection pipeline
//
// This module defines the structured error type returned by the detection
// core, with numeric error codes for programmatic handling.

mod detection;

pub use detection::{log_detection_error, DetectionError, DetectionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
