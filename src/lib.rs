// QRS Detection Core - batch ECG beat detection
// Pan-Tompkins style pipeline over in-memory single-lead recordings

// Module declarations
pub mod analysis;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod recording;
pub mod testing;

// Re-exports for convenience
pub use analysis::{detect, detect_with_config, Detection, QrsDetector};
pub use config::DetectorConfig;
pub use error::DetectionError;
pub use recording::Recording;
