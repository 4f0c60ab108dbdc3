use heapless::{Deque, Vec};

use crate::error::SetupError;

/// Largest supported median count.
pub const MAX_MEDIAN_COUNT: usize = 15;

/// Median count used when none is configured. Filters single outliers.
pub const DEFAULT_MEDIAN_COUNT: usize = 3;

/// Bounded FIFO of the most recent accepted samples of one quantity.
#[derive(Clone, Debug)]
pub struct RollingWindow {
    samples: Deque<f32, MAX_MEDIAN_COUNT>,
    capacity: usize,
}

impl RollingWindow {
    /// Creates an empty window holding at most `capacity` samples.
    ///
    /// `capacity` must be odd and within `1..=MAX_MEDIAN_COUNT`.
    pub fn new(capacity: usize) -> Result<Self, SetupError> {
        Ok(Self {
            samples: Deque::new(),
            capacity: check_median_count(capacity)?,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Appends `sample`, evicting the oldest entries first if the window is full.
    pub fn push(&mut self, sample: f32) {
        self.truncate(self.capacity - 1);
        // Cannot fail: truncate left room for one more.
        let _ = self.samples.push_back(sample);
    }

    /// Drops the oldest sample. Returns it, or `None` if the window was empty.
    pub fn decay(&mut self) -> Option<f32> {
        self.samples.pop_front()
    }

    /// Changes the capacity, discarding the oldest samples that no longer fit.
    /// An invalid capacity leaves the window untouched.
    pub fn resize(&mut self, capacity: usize) -> Result<(), SetupError> {
        self.capacity = check_median_count(capacity)?;
        self.truncate(self.capacity);
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        while self.samples.len() > len {
            self.samples.pop_front();
        }
    }

    /// Samples in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    /// Lower median of the window, available only once it is full.
    pub fn median(&self) -> Option<f32> {
        if !self.is_full() {
            return None;
        }
        let mut sorted: Vec<f32, MAX_MEDIAN_COUNT> = self.samples.iter().copied().collect();
        sorted.sort_unstable_by(f32::total_cmp);
        sorted.get((self.capacity - 1) / 2).copied()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self {
            samples: Deque::new(),
            capacity: DEFAULT_MEDIAN_COUNT,
        }
    }
}

/// Accepts odd median counts in `1..=MAX_MEDIAN_COUNT`; an even window has
/// no single middle sample.
pub fn check_median_count(median_count: usize) -> Result<usize, SetupError> {
    if median_count == 0 || median_count > MAX_MEDIAN_COUNT || median_count % 2 == 0 {
        return Err(SetupError::InvalidMedian(median_count));
    }
    Ok(median_count)
}
