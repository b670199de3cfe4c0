//! Coarse progress reporting

/// Receives completion percentages in `0.0..=100.0`
pub trait ProgressSink {
    /// Report progress
    fn report(&mut self, percent: f64);
}

impl<F: FnMut(f64)> ProgressSink for F {
    fn report(&mut self, percent: f64) {
        self(percent)
    }
}

/// Percentage of `done` out of `total`; an empty batch counts as finished
pub(crate) fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}
