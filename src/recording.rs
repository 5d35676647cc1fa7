//! ECG recording loaders.
//!
//! Two on-disk forms are understood:
//!
//! * Text: the first non-blank line holds the sampling rate; each following
//!   non-blank line is `value [flag]`, where a non-zero flag marks a
//!   reference beat at that sample.
//! * WAV: mono PCM via `hound`, integers scaled to [-1, 1]. No annotations.
//!
//! The detection core never touches the filesystem; this module only feeds
//! it in-memory samples.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

/// In-memory single-lead recording with optional reference beats
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub sampling_rate: f64,
    pub samples: Vec<f64>,
    /// Sample indices of annotated beats, ascending
    pub annotations: Vec<usize>,
}

impl Recording {
    pub fn new(sampling_rate: f64, samples: Vec<f64>) -> Self {
        Self {
            sampling_rate,
            samples,
            annotations: Vec::new(),
        }
    }

    pub fn with_annotations(mut self, mut annotations: Vec<usize>) -> Self {
        annotations.sort_unstable();
        annotations.dedup();
        self.annotations = annotations;
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sampling_rate
    }

    /// Load a recording, choosing the format from the file extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            read_wav(path)
        } else {
            let contents =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Self::parse_text(&contents).with_context(|| format!("parsing {}", path.display()))
        }
    }

    /// Parse the text recording format
    pub fn parse_text(contents: &str) -> Result<Self> {
        let mut lines = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| anyhow!("recording is empty (expected a sampling rate line)"))?;
        let sampling_rate: f64 = header
            .trim()
            .parse()
            .with_context(|| format!("invalid sampling rate {:?}", header.trim()))?;
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            bail!("sampling rate must be positive (got {})", sampling_rate);
        }

        let mut samples = Vec::new();
        let mut annotations = Vec::new();
        for (line_idx, line) in lines {
            let mut fields = line.split_whitespace();
            let value: f64 = fields
                .next()
                .unwrap_or_default()
                .parse()
                .with_context(|| format!("line {}: invalid sample value", line_idx + 1))?;

            if let Some(flag) = fields.next() {
                let flag: i64 = flag.parse().with_context(|| {
                    format!("line {}: invalid beat flag {:?}", line_idx + 1, flag)
                })?;
                if flag != 0 {
                    annotations.push(samples.len());
                }
            }
            if fields.next().is_some() {
                bail!("line {}: expected `value [flag]`", line_idx + 1);
            }
            samples.push(value);
        }

        Ok(Self {
            sampling_rate,
            samples,
            annotations,
        })
    }

    /// Render in the text recording format
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.samples.len() * 12);
        if self.sampling_rate.fract() == 0.0 {
            let _ = writeln!(out, "{}", self.sampling_rate as u64);
        } else {
            let _ = writeln!(out, "{}", self.sampling_rate);
        }

        let mut beats = self.annotations.iter().peekable();
        for (i, value) in self.samples.iter().enumerate() {
            if beats.peek() == Some(&&i) {
                beats.next();
                let _ = writeln!(out, "{} 1", value);
            } else {
                let _ = writeln!(out, "{}", value);
            }
        }
        out
    }

    pub fn write_text<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_text()).with_context(|| format!("writing {}", path.display()))
    }

    /// Cut out `[begin_sec, end_sec)`; annotations are re-based to the cut
    pub fn slice_seconds(&self, begin_sec: f64, end_sec: Option<f64>) -> Result<Self> {
        if !begin_sec.is_finite() || begin_sec < 0.0 {
            bail!("Invalid begin_sec value {}", begin_sec);
        }
        if let Some(end) = end_sec {
            if !end.is_finite() || end <= begin_sec {
                bail!("Invalid end_sec value {} (begin_sec {})", end, begin_sec);
            }
        }

        let to_index =
            |seconds: f64| ((seconds * self.sampling_rate).round() as usize).min(self.len());
        let begin = to_index(begin_sec);
        let end = end_sec.map(to_index).unwrap_or(self.len());

        Ok(Self {
            sampling_rate: self.sampling_rate,
            samples: self.samples[begin..end].to_vec(),
            annotations: self
                .annotations
                .iter()
                .filter(|&&i| i >= begin && i < end)
                .map(|&i| i - begin)
                .collect(),
        })
    }
}

fn read_wav(path: &Path) -> Result<Recording> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(anyhow!(
            "Recording {} must be single-lead mono (found {} channels)",
            path.display(),
            spec.channels
        ));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map(f64::from).map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f64>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f64;
            match spec.bits_per_sample {
                // hound re-centres unsigned 8-bit PCM to i8
                8 => reader
                    .samples::<i8>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f64 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f64>>>()?,
                16 => reader
                    .samples::<i16>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f64 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f64>>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f64 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f64>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    Ok(Recording::new(f64::from(spec.sample_rate), samples))
}
