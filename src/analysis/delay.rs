// Delay compensation - realign marks with the QRS onset

/// Shift every mark `delay` samples to the left, in place
///
/// Marks closer than `delay` to the start are dropped. Indices are walked
/// in ascending order so each mark moves exactly once.
pub fn compensate(marks: &mut [bool], delay: usize) {
    if delay == 0 {
        return;
    }

    let head = delay.min(marks.len());
    marks[..head].iter_mut().for_each(|mark| *mark = false);

    for i in delay..marks.len() {
        if marks[i] {
            marks[i] = false;
            marks[i - delay] = true;
        }
    }
}
