// Adaptive threshold decision engine
//
// Scans the integrated energy for local maxima and classifies each one as
// signal or noise against two running estimates:
//   SPKI - smoothed signal peak level
//   NPKI - smoothed noise peak level
//   THRESHOLD1 = NPKI + 0.25 * (SPKI - NPKI)
//   THRESHOLD2 = 0.5 * THRESHOLD1
//
// When no beat has been accepted for longer than the maximum RR interval
// the engine enters search-back: it rewinds to just after the last beat
// and re-scans up to the trigger index against THRESHOLD2, then resumes
// normal scanning where it left off.

use serde::Serialize;

use crate::config::{SampleWidths, MIN_SIGNAL_LEN};
use crate::error::DetectionError;

/// Running signal/noise peak estimates and the thresholds derived from them
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdState {
    pub spki: f64,
    pub npki: f64,
    pub threshold1: f64,
    pub threshold2: f64,
}

impl ThresholdState {
    /// All-zero estimates; the first positive local maximum is a beat
    pub fn zeroed() -> Self {
        Self {
            spki: 0.0,
            npki: 0.0,
            threshold1: 0.0,
            threshold2: 0.0,
        }
    }

    /// Seed estimates from a learning span of integrated energy
    ///
    /// SPKI starts at a quarter of the span's maximum, NPKI at half its mean.
    pub fn seeded(learning: &[f64]) -> Self {
        if learning.is_empty() {
            return Self::zeroed();
        }
        let max = learning.iter().copied().fold(f64::MIN, f64::max);
        let mean = learning.iter().sum::<f64>() / learning.len() as f64;
        let mut state = Self {
            spki: 0.25 * max,
            npki: 0.5 * mean,
            threshold1: 0.0,
            threshold2: 0.0,
        };
        state.recompute();
        state
    }

    /// Acceptance threshold for the current scan mode
    pub fn threshold_for(&self, mode: ScanMode) -> f64 {
        match mode {
            ScanMode::Normal => self.threshold1,
            ScanMode::SearchBack { .. } => self.threshold2,
        }
    }

    fn signal_peak(&mut self, peak: f64, mode: ScanMode) {
        self.spki = match mode {
            ScanMode::Normal => 0.875 * self.spki + 0.125 * peak,
            ScanMode::SearchBack { .. } => 0.75 * self.spki + 0.25 * peak,
        };
    }

    fn noise_peak(&mut self, peak: f64) {
        self.npki = 0.875 * self.npki + 0.125 * peak;
    }

    fn recompute(&mut self) {
        self.threshold1 = self.npki + 0.25 * (self.spki - self.npki);
        self.threshold2 = 0.5 * self.threshold1;
    }
}

/// Scan mode of the decision engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanMode {
    Normal,
    /// Re-scanning with THRESHOLD2 until the trigger index is reached again
    SearchBack { until: usize },
}

/// One search-back pass, in integrated-signal indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchBackWindow {
    /// First index re-examined
    pub resume_from: usize,
    /// Index at which search-back was triggered
    pub until: usize,
    /// Index at which the engine returned to normal scanning
    pub ended_at: Option<usize>,
    /// Beats accepted while the window was active
    pub recovered: Vec<usize>,
}

/// Result of one engine run
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub marks: Vec<bool>,
    pub search_backs: Vec<SearchBackWindow>,
}

/// Dual-threshold QRS decision state machine
///
/// All state is reset at the start of [`DecisionEngine::run`], so one
/// engine can be reused across independent signals.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    min_rr: usize,
    max_rr: usize,
    learning: usize,
    thresholds: ThresholdState,
    mode: ScanMode,
    last_beat: Option<usize>,
    last_trigger: usize,
    search_backs: Vec<SearchBackWindow>,
}

impl DecisionEngine {
    /// Create an engine from resolved sample widths
    pub fn new(widths: &SampleWidths) -> Self {
        Self::with_widths(widths.min_rr, widths.max_rr, widths.learning)
    }

    /// Create an engine from explicit widths in samples
    ///
    /// # Arguments
    /// * `min_rr` - Refractory interval: closer candidates compete for one mark
    /// * `max_rr` - Gap after which search-back triggers
    /// * `learning` - Samples used to seed SPKI/NPKI (0 starts from zero)
    pub fn with_widths(min_rr: usize, max_rr: usize, learning: usize) -> Self {
        Self {
            min_rr,
            max_rr,
            learning,
            thresholds: ThresholdState::zeroed(),
            mode: ScanMode::Normal,
            last_beat: None,
            last_trigger: 0,
            search_backs: Vec::new(),
        }
    }

    pub fn thresholds(&self) -> ThresholdState {
        self.thresholds
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn last_beat(&self) -> Option<usize> {
        self.last_beat
    }

    /// Classify every local maximum of `integrated` and mark accepted beats
    ///
    /// # Returns
    /// Marks (same length as `integrated`, not yet delay compensated) and
    /// the search-back windows that were opened.
    pub fn run(&mut self, integrated: &[f64]) -> Result<DecisionOutcome, DetectionError> {
        let n = integrated.len();
        if n < MIN_SIGNAL_LEN {
            return Err(DetectionError::InvalidInput {
                length: n,
                minimum: MIN_SIGNAL_LEN,
            });
        }

        self.reset(integrated);
        let mut marks = vec![false; n];
        let last_index = n - 3;
        let mut i = 2;

        while i <= last_index {
            if let ScanMode::SearchBack { until } = self.mode {
                if i >= until {
                    self.end_search_back(i);
                }
            }

            if self.mode == ScanMode::Normal {
                if let Some(resume_from) = self.search_back_trigger(i) {
                    i = resume_from;
                    continue;
                }
            }

            let peak = integrated[i];
            if peak >= integrated[i - 2] && peak > integrated[i + 2] {
                self.classify(i, peak, integrated, &mut marks);
            }
            i += 1;
        }

        if let ScanMode::SearchBack { .. } = self.mode {
            self.end_search_back(n);
        }

        Ok(DecisionOutcome {
            marks,
            search_backs: std::mem::take(&mut self.search_backs),
        })
    }

    fn reset(&mut self, integrated: &[f64]) {
        let learning = self.learning.min(integrated.len());
        self.thresholds = if learning > 0 {
            ThresholdState::seeded(&integrated[..learning])
        } else {
            ThresholdState::zeroed()
        };
        self.mode = ScanMode::Normal;
        self.last_beat = None;
        self.last_trigger = 0;
        self.search_backs.clear();
    }

    /// Enter search-back at `i` if both the beat gap and the trigger gap
    /// exceed the maximum RR width; returns the index to resume from.
    fn search_back_trigger(&mut self, i: usize) -> Option<usize> {
        let anchor = self.last_beat.unwrap_or(0);
        if i.saturating_sub(anchor) <= self.max_rr
            || i.saturating_sub(self.last_trigger) <= self.max_rr
        {
            return None;
        }

        let resume_from = (anchor + 1).max(2);
        self.mode = ScanMode::SearchBack { until: i };
        self.last_trigger = i;
        self.search_backs.push(SearchBackWindow {
            resume_from,
            until: i,
            ended_at: None,
            recovered: Vec::new(),
        });
        tracing::debug!(
            "[DecisionEngine] Search-back at {} (last beat {:?}), from {}, t2={:.6}",
            i,
            self.last_beat,
            resume_from,
            self.thresholds.threshold2
        );
        Some(resume_from)
    }

    fn end_search_back(&mut self, i: usize) {
        self.mode = ScanMode::Normal;
        if let Some(window) = self.search_backs.last_mut() {
            window.ended_at = Some(i);
            tracing::debug!(
                "[DecisionEngine] Search-back ended at {}, recovered {} beat(s)",
                i,
                window.recovered.len()
            );
        }
    }

    fn classify(&mut self, i: usize, peak: f64, integrated: &[f64], marks: &mut [bool]) {
        if peak > self.thresholds.threshold_for(self.mode) {
            self.thresholds.signal_peak(peak, self.mode);
            self.accept(i, peak, integrated, marks);
        } else {
            self.thresholds.noise_peak(peak);
        }
        self.thresholds.recompute();
    }

    fn accept(&mut self, i: usize, peak: f64, integrated: &[f64], marks: &mut [bool]) {
        match self.last_beat {
            Some(previous) if i - previous < self.min_rr => {
                // Refractory: the larger of the two local maxima keeps the mark
                if peak > integrated[previous] {
                    marks[previous] = false;
                    self.mark(i, marks);
                }
            }
            _ => self.mark(i, marks),
        }
    }

    fn mark(&mut self, i: usize, marks: &mut [bool]) {
        marks[i] = true;
        self.last_beat = Some(i);
        if let ScanMode::SearchBack { .. } = self.mode {
            if let Some(window) = self.search_backs.last_mut() {
                window.recovered.push(i);
            }
        }
    }
}

#[cfg(test)]
#[path = "threshold_tests.rs"]
mod tests;
