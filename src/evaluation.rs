//! Beat-by-beat scoring against reference annotations.
//!
//! Each reference beat is matched to the nearest still-unmatched detection
//! within the tolerance; leftovers on either side count as misses or false
//! alarms.

use serde::{Deserialize, Serialize};

/// Agreement between detected and reference beats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub reference_beats: usize,
    pub detected_beats: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// TP / (TP + FN)
    pub sensitivity: f64,
    /// TP / (TP + FP)
    pub positive_predictivity: f64,
    /// Mean of (detected - reference) over matched pairs, in samples
    pub mean_offset: f64,
}

impl EvaluationSummary {
    /// True when both scores reach their floors
    pub fn meets(&self, min_sensitivity: f64, min_positive_predictivity: f64) -> bool {
        self.sensitivity >= min_sensitivity
            && self.positive_predictivity >= min_positive_predictivity
    }
}

/// Score `detected` against `reference` (both ascending sample indices)
pub fn evaluate(detected: &[usize], reference: &[usize], tolerance: usize) -> EvaluationSummary {
    let mut used = vec![false; detected.len()];
    let mut offsets = Vec::new();

    for &truth in reference {
        let lo = detected.partition_point(|&d| d + tolerance < truth);
        let best = detected[lo..]
            .iter()
            .enumerate()
            .take_while(|(_, &d)| d <= truth + tolerance)
            .filter(|(k, _)| !used[lo + k])
            .min_by_key(|(_, &d)| d.abs_diff(truth))
            .map(|(k, &d)| (lo + k, d));

        if let Some((idx, d)) = best {
            used[idx] = true;
            offsets.push(d as f64 - truth as f64);
        }
    }

    let true_positives = offsets.len();
    let false_negatives = reference.len() - true_positives;
    let false_positives = detected.len() - true_positives;

    EvaluationSummary {
        reference_beats: reference.len(),
        detected_beats: detected.len(),
        true_positives,
        false_positives,
        false_negatives,
        sensitivity: ratio(true_positives, true_positives + false_negatives),
        positive_predictivity: ratio(true_positives, true_positives + false_positives),
        mean_offset: if offsets.is_empty() {
            0.0
        } else {
            offsets.iter().sum::<f64>() / offsets.len() as f64
        },
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        numerator as f64 / denominator as f64
    }
}
