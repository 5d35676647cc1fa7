use super::*;

/// Add a 7-sample triangular hump of `height` centered on `center`
fn hump(signal: &mut [f64], center: usize, height: f64) {
    for offset in -3i64..=3 {
        let idx = (center as i64 + offset) as usize;
        signal[idx] += height * (1.0 - offset.abs() as f64 / 4.0);
    }
}

fn energy(len: usize, humps: &[(usize, f64)]) -> Vec<f64> {
    let mut signal = vec![0.0; len];
    for &(center, height) in humps {
        hump(&mut signal, center, height);
    }
    signal
}

fn beats(marks: &[bool]) -> Vec<usize> {
    marks
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
        .collect()
}

#[test]
fn test_marks_each_isolated_peak() {
    let signal = energy(300, &[(50, 1.0), (150, 1.0), (250, 1.0)]);
    let mut engine = DecisionEngine::with_widths(20, 1000, 0);
    let outcome = engine.run(&signal).unwrap();

    assert_eq!(beats(&outcome.marks), vec![50, 150, 250]);
    assert_eq!(outcome.marks.len(), signal.len());
    assert!(outcome.search_backs.is_empty());
    assert_eq!(engine.last_beat(), Some(250));
}

#[test]
fn test_refractory_keeps_larger_later_peak() {
    let signal = energy(200, &[(50, 1.0), (60, 2.0)]);
    let mut engine = DecisionEngine::with_widths(20, 1000, 0);
    let outcome = engine.run(&signal).unwrap();

    assert_eq!(
        beats(&outcome.marks),
        vec![60],
        "larger peak inside the refractory window should replace the earlier mark"
    );
}

#[test]
fn test_refractory_drops_smaller_later_peak() {
    let signal = energy(200, &[(50, 2.0), (60, 1.0)]);
    let mut engine = DecisionEngine::with_widths(20, 1000, 0);
    let outcome = engine.run(&signal).unwrap();

    assert_eq!(beats(&outcome.marks), vec![50]);
}

#[test]
fn test_small_peak_updates_noise_estimate() {
    let signal = energy(200, &[(50, 1.0), (150, 1.0), (180, 0.05)]);
    let mut engine = DecisionEngine::with_widths(20, 1000, 0);
    let outcome = engine.run(&signal).unwrap();

    assert_eq!(beats(&outcome.marks), vec![50, 150]);
    let state = engine.thresholds();
    assert!(state.npki > 0.0, "rejected peak should raise NPKI");
    assert!(state.spki > state.npki);
}

#[test]
fn test_thresholds_follow_estimates() {
    let signal = energy(300, &[(50, 1.0), (150, 0.8), (250, 0.03)]);
    let mut engine = DecisionEngine::with_widths(20, 1000, 0);
    engine.run(&signal).unwrap();

    let state = engine.thresholds();
    let expected = state.npki + 0.25 * (state.spki - state.npki);
    assert!((state.threshold1 - expected).abs() < 1e-12);
    assert!((state.threshold2 - 0.5 * state.threshold1).abs() < 1e-12);
}

#[test]
fn test_seeded_thresholds() {
    let state = ThresholdState::seeded(&[1.0, 3.0, 2.0, 2.0]);
    assert_eq!(state.spki, 0.75);
    assert_eq!(state.npki, 1.0);
    assert_eq!(state.threshold1, 0.9375);
    assert_eq!(state.threshold2, 0.46875);
    assert_eq!(ThresholdState::seeded(&[]), ThresholdState::zeroed());
}

#[test]
fn test_learning_phase_suppresses_early_noise() {
    let signal = energy(400, &[(20, 0.05), (100, 1.0), (200, 1.0), (300, 1.0)]);

    let mut cold = DecisionEngine::with_widths(20, 10_000, 0);
    assert_eq!(beats(&cold.run(&signal).unwrap().marks), vec![20, 100, 200, 300]);

    let mut seeded = DecisionEngine::with_widths(20, 10_000, 300);
    assert_eq!(beats(&seeded.run(&signal).unwrap().marks), vec![100, 200, 300]);
}

#[test]
fn test_search_back_recovers_weak_beat() {
    let signal = energy(1200, &[(50, 1.0), (150, 1.0), (400, 0.075), (900, 1.0)]);
    let mut engine = DecisionEngine::with_widths(20, 300, 0);
    let outcome = engine.run(&signal).unwrap();

    assert_eq!(beats(&outcome.marks), vec![50, 150, 400, 900]);

    let first = &outcome.search_backs[0];
    assert_eq!(first.resume_from, 151);
    assert_eq!(first.until, 451);
    assert_eq!(first.ended_at, Some(first.until));
    assert_eq!(first.recovered, vec![400]);
    assert_eq!(engine.mode(), ScanMode::Normal);
}

#[test]
fn test_weak_beat_missed_without_search_back() {
    let signal = energy(1200, &[(50, 1.0), (150, 1.0), (400, 0.075), (900, 1.0)]);
    let mut engine = DecisionEngine::with_widths(20, 10_000, 0);
    let outcome = engine.run(&signal).unwrap();

    assert_eq!(beats(&outcome.marks), vec![50, 150, 900]);
    assert!(outcome.search_backs.is_empty());
}

#[test]
fn test_search_back_windows_always_close_at_trigger() {
    let signal = energy(1200, &[(50, 1.0), (150, 1.0), (400, 0.05), (900, 1.0)]);
    let mut engine = DecisionEngine::with_widths(20, 300, 0);
    let outcome = engine.run(&signal).unwrap();

    // Too weak even for THRESHOLD2: two fruitless windows, both closed
    assert_eq!(beats(&outcome.marks), vec![50, 150, 900]);
    assert_eq!(outcome.search_backs.len(), 2);
    for window in &outcome.search_backs {
        assert_eq!(window.ended_at, Some(window.until));
        assert!(window.recovered.is_empty());
    }
    // Retrigger waits a full max-RR after the previous trigger
    assert!(outcome.search_backs[1].until - outcome.search_backs[0].until > 300);
}

#[test]
fn test_flat_signal_has_no_candidates() {
    let mut engine = DecisionEngine::with_widths(20, 300, 0);
    let outcome = engine.run(&vec![0.0; 1000]).unwrap();
    assert!(beats(&outcome.marks).is_empty());
    assert!(outcome
        .search_backs
        .iter()
        .all(|w| w.ended_at == Some(w.until)));
}

#[test]
fn test_rejects_short_input() {
    let mut engine = DecisionEngine::with_widths(20, 300, 0);
    assert!(matches!(
        engine.run(&[0.0, 1.0, 0.0, 1.0]),
        Err(DetectionError::InvalidInput { length: 4, .. })
    ));
}

#[test]
fn test_reusable_across_runs() {
    let signal = energy(1200, &[(50, 1.0), (150, 1.0), (400, 0.075), (900, 1.0)]);
    let mut engine = DecisionEngine::with_widths(20, 300, 0);
    let first = engine.run(&signal).unwrap();
    let second = engine.run(&signal).unwrap();

    assert_eq!(first.marks, second.marks);
    assert_eq!(first.search_backs, second.search_backs);
}

#[test]
fn test_threshold_for_mode() {
    let state = ThresholdState::seeded(&[1.0, 3.0, 2.0, 2.0]);
    assert_eq!(state.threshold_for(ScanMode::Normal), state.threshold1);
    assert_eq!(
        state.threshold_for(ScanMode::SearchBack { until: 10 }),
        state.threshold2
    );
}
