//! Fixture and testability utilities.
//!
//! Deterministic signal sources used by unit tests, the integration suite
//! and the `qrs_cli synth` command.

pub mod synthetic;

pub use synthetic::{SyntheticBeat, SyntheticEcg};
