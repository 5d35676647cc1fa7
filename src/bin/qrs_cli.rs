use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qrs_detection::analysis::Detection;
use qrs_detection::config::seconds_to_samples;
use qrs_detection::evaluation::{evaluate, EvaluationSummary};
use qrs_detection::testing::SyntheticEcg;
use qrs_detection::{DetectorConfig, QrsDetector, Recording};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "qrs_cli",
    about = "Batch QRS detection harness for ECG recordings"
)]
struct Cli {
    /// Emit debug-level pipeline tracing on stderr (warnings are always shown)
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect beats in a recording and print a JSON report
    Detect {
        #[arg(long)]
        input: PathBuf,
        /// Detector configuration JSON (camelCase fields)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 0.0)]
        begin_sec: f64,
        #[arg(long)]
        end_sec: Option<f64>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score detections against the recording's reference annotations
    Evaluate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 150.0)]
        tolerance_ms: f64,
        #[arg(long, default_value_t = 0.9)]
        min_sensitivity: f64,
        #[arg(long, default_value_t = 0.9)]
        min_ppv: f64,
    },
    /// Write a synthetic annotated recording in the text format
    Synth {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 200.0)]
        rate: f64,
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        #[arg(long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Detect {
            input,
            config,
            begin_sec,
            end_sec,
            output,
        } => run_detect(&input, config, begin_sec, end_sec, output),
        Commands::Evaluate {
            input,
            config,
            tolerance_ms,
            min_sensitivity,
            min_ppv,
        } => run_evaluate(&input, config, tolerance_ms, min_sensitivity, min_ppv),
        Commands::Synth {
            output,
            rate,
            duration,
            bpm,
            noise,
            seed,
        } => run_synth(&output, rate, duration, bpm, noise, seed),
    }
}

/// Picked up from the working directory when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "qrs_config.json";

fn load_config(path: Option<PathBuf>) -> Result<DetectorConfig> {
    match path {
        Some(path) => DetectorConfig::read_from_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(DetectorConfig::load_from_file(DEFAULT_CONFIG_FILE))
        }
        None => Ok(DetectorConfig::default()),
    }
}

fn detect_recording(recording: &Recording, config: DetectorConfig) -> Result<Detection> {
    let detector = QrsDetector::new(recording.sampling_rate, config)?;
    let detection = detector
        .run(&recording.samples)
        .context("running QRS detection")?;
    Ok(detection)
}

fn run_detect(
    input: &Path,
    config_path: Option<PathBuf>,
    begin_sec: f64,
    end_sec: Option<f64>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let recording = Recording::load(input)?;
    let recording = if begin_sec > 0.0 || end_sec.is_some() {
        recording.slice_seconds(begin_sec, end_sec)?
    } else {
        recording
    };

    let detection = detect_recording(&recording, load_config(config_path)?)?;
    let report = DetectReportPayload {
        input: input.display().to_string(),
        sampling_rate: recording.sampling_rate,
        sample_count: recording.len(),
        beat_count: detection.beat_count(),
        beat_times: detection.beat_times(recording.sampling_rate),
        detection: &detection,
    };
    emit_report(&report, output_path)?;

    Ok(ExitCode::from(0))
}

fn run_evaluate(
    input: &Path,
    config_path: Option<PathBuf>,
    tolerance_ms: f64,
    min_sensitivity: f64,
    min_ppv: f64,
) -> Result<ExitCode> {
    let recording = Recording::load(input)?;
    let detection = detect_recording(&recording, load_config(config_path)?)?;
    let tolerance = seconds_to_samples(tolerance_ms / 1000.0, recording.sampling_rate);
    let summary = evaluate(&detection.beats, &recording.annotations, tolerance);

    emit_report(&summary, None)?;

    if recording.annotations.is_empty() {
        eprintln!("Recording {} has no reference annotations", input.display());
        return Ok(ExitCode::from(2));
    }
    if !summary.meets(min_sensitivity, min_ppv) {
        emit_shortfall(&summary, min_sensitivity, min_ppv)?;
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::from(0))
}

fn run_synth(
    output: &Path,
    rate: f64,
    duration: f64,
    bpm: f64,
    noise: f64,
    seed: u64,
) -> Result<ExitCode> {
    let recording = SyntheticEcg::new(rate, duration)
        .with_rhythm(bpm, 0.5)
        .with_noise(noise, seed)
        .generate();
    recording.write_text(output)?;
    println!(
        "Wrote {} samples with {} beats to {}",
        recording.len(),
        recording.annotations.len(),
        output.display()
    );
    Ok(ExitCode::from(0))
}

fn emit_report<T: Serialize>(report: &T, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_shortfall(summary: &EvaluationSummary, min_sensitivity: f64, min_ppv: f64) -> Result<()> {
    let json = serde_json::to_string_pretty(&serde_json::json!({
        "sensitivity": summary.sensitivity,
        "minSensitivity": min_sensitivity,
        "positivePredictivity": summary.positive_predictivity,
        "minPositivePredictivity": min_ppv,
    }))?;
    eprintln!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct DetectReportPayload<'a> {
    input: String,
    sampling_rate: f64,
    sample_count: usize,
    beat_count: usize,
    beat_times: Vec<f64>,
    #[serde(flatten)]
    detection: &'a Detection,
}
