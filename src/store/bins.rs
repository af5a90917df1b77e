//! The counter sequence backing the dense store family.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Index, IndexMut};

use snafu::ensure;

use crate::error::{RangeOutOfBounds, SketchError};

/// A double-ended sequence of real-valued counters.
///
/// Keys are not stored here; the owning store tracks the key of position 0
/// through its offset. Growth and trimming happen at either end, and a
/// contiguous band of counters can be collapsed into a single sum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinList {
    counters: VecDeque<f64>,
}

impl BinList {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence of `len` zeroed counters.
    pub fn with_zeros(len: usize) -> Self {
        let mut bins = Self::new();
        bins.initialize_with_zeros(len);
        bins
    }

    /// The number of counters.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns `true` if the sequence holds no counters.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// The first counter, if any.
    pub fn first(&self) -> Option<f64> {
        self.counters.front().copied()
    }

    /// The last counter, if any.
    pub fn last(&self) -> Option<f64> {
        self.counters.back().copied()
    }

    /// Iterates over the counters in position order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.counters.iter().copied()
    }

    /// Resets the sequence to `len` zeroed counters.
    pub fn initialize_with_zeros(&mut self, len: usize) {
        self.counters.clear();
        self.counters.resize(len, 0.0);
    }

    /// Prepends `count` zeroed counters.
    pub fn extend_front_with_zeros(&mut self, count: usize) {
        for _ in 0..count {
            self.counters.push_front(0.0);
        }
    }

    /// Appends `count` zeroed counters.
    pub fn extend_back_with_zeros(&mut self, count: usize) {
        let len = self.counters.len();
        self.counters.resize(len + count, 0.0);
    }

    /// Drops the first `count` counters. `count` must not exceed the length.
    pub fn remove_leading_elements(&mut self, count: usize) {
        self.counters.drain(..count);
    }

    /// Drops the last `count` counters. `count` must not exceed the length.
    pub fn remove_trailing_elements(&mut self, count: usize) {
        self.counters.truncate(self.counters.len() - count);
    }

    /// Deletes the counters in `[start, end)` and inserts `count` zeros at `start`.
    pub fn replace_range_with_zeros(&mut self, start: usize, end: usize, count: usize) {
        if count == end - start {
            for idx in start..end {
                self.counters[idx] = 0.0;
            }
        } else {
            self.counters.drain(start..end);
            for _ in 0..count {
                self.counters.insert(start, 0.0);
            }
        }
    }

    /// Sums the counters in `[start, end)`.
    ///
    /// # Errors
    ///
    /// If either index exceeds the length, an error is returned.
    pub fn collapsed_count(&self, start: usize, end: usize) -> Result<f64, SketchError> {
        ensure!(
            start <= self.len() && end <= self.len(),
            RangeOutOfBounds { start, end, len: self.len() }
        );
        Ok(self.range_sum(start, end))
    }

    /// Sums the counters in `[start, end)`; indices must be in bounds.
    pub(crate) fn range_sum(&self, start: usize, end: usize) -> f64 {
        self.counters.range(start..end.max(start)).sum()
    }

    /// Sums all counters.
    pub fn sum(&self) -> f64 {
        self.range_sum(0, self.len())
    }

    /// Returns `true` if every counter is zero (including when empty).
    pub fn has_only_zeros(&self) -> bool {
        self.counters.iter().all(|&counter| counter == 0.0)
    }
}

impl Index<usize> for BinList {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.counters[idx]
    }
}

impl IndexMut<usize> for BinList {
    fn index_mut(&mut self, idx: usize) -> &mut f64 {
        &mut self.counters[idx]
    }
}

impl fmt::Display for BinList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for counter in &self.counters {
            write!(f, "{counter} ")?;
        }
        Ok(())
    }
}
