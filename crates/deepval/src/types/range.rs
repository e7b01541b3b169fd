use std::cmp::Ordering;

/// Python `range`: an immutable arithmetic progression.
///
/// `step` is never zero; constructors reject it the way `range()` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: i64,
    stop: i64,
    step: i64,
}

impl Range {
    /// Returns `None` when `step` is zero.
    #[must_use]
    pub fn new(start: i64, stop: i64, step: i64) -> Option<Self> {
        (step != 0).then_some(Self { start, stop, step })
    }

    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    #[must_use]
    pub fn stop(&self) -> i64 {
        self.stop
    }

    #[must_use]
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Number of elements in the progression.
    #[must_use]
    pub fn len(&self) -> u64 {
        let (start, stop, step) = (i128::from(self.start), i128::from(self.stop), i128::from(self.step));
        let span = if step > 0 { stop - start } else { start - stop };
        if span <= 0 {
            return 0;
        }
        let step = step.abs();
        u64::try_from((span + step - 1) / step).unwrap_or(u64::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lexicographic order of the denoted sequences, so two ranges are equal
    /// exactly when they denote the same sequence.
    ///
    /// The first elements decide, then the second ones (so the steps), then the lengths.
    #[must_use]
    pub fn cmp_sequence(&self, other: &Self) -> Ordering {
        let (len_a, len_b) = (self.len(), other.len());
        if len_a == 0 || len_b == 0 {
            return len_a.cmp(&len_b);
        }
        if self.start != other.start {
            return self.start.cmp(&other.start);
        }
        if len_a >= 2 && len_b >= 2 && self.step != other.step {
            return self.step.cmp(&other.step);
        }
        len_a.cmp(&len_b)
    }
}
