//! Progress reporting
//!
//! Allocation: 5% once input is validated, 15% after decode, the next 70%
//! spread evenly across the requested sizes, 85% while the ICO is built and
//! 100% when done. The reporter never lets the percentage go backwards.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const VALIDATED: u8 = 5;
pub const DECODED: u8 = 15;
pub const SIZES_SPAN: u8 = 70;
pub const BUILDING_ICO: u8 = 85;
pub const DONE: u8 = 100;

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgressUpdate {
    /// 0..=100, non-decreasing within a conversion
    pub percent: u8,
    /// Human-readable step label
    pub step: String,
}

/// Percentage after the size at `index` (0-based) of `total` completes.
pub fn size_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return DECODED + SIZES_SPAN;
    }
    let done = (index + 1).min(total) as f64 / total as f64;
    DECODED + (done * SIZES_SPAN as f64).round() as u8
}

/// Forwards monotonic updates to a callback.
pub(crate) struct ProgressReporter<F> {
    last: u8,
    sink: F,
}

impl<F: FnMut(&ProgressUpdate)> ProgressReporter<F> {
    pub(crate) fn new(sink: F) -> Self {
        Self { last: 0, sink }
    }

    pub(crate) fn report(&mut self, percent: u8, step: impl Into<String>) {
        let percent = percent.min(DONE).max(self.last);
        self.last = percent;
        let update = ProgressUpdate {
            percent,
            step: step.into(),
        };
        tracing::trace!("Progress {}%: {}", update.percent, update.step);
        (self.sink)(&update);
    }
}
