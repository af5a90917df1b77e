use std::fmt;

use super::{BinList, Store, DEFAULT_CHUNK_SIZE};

/// An unbounded dense store.
///
/// Keeps every bin between the bin for the smallest key and the bin for the
/// largest key seen so far, so memory grows with the key span of the input.
///
/// Use this store when:
/// - the input values cover a bounded range
/// - memory usage is not a concern
///
/// Inputs with tails heavier than any subexponential distribution should use
/// a collapsing store instead.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseStore {
    bins: BinList,
    count: f64,
    min_key: i64,
    max_key: i64,
    chunk_size: i64,
    offset: i64,
}

impl DenseStore {
    /// Creates an empty store growing in chunks of 128 bins.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates an empty store growing in chunks of `chunk_size` bins.
    pub fn with_chunk_size(chunk_size: i64) -> Self {
        Self {
            bins: BinList::new(),
            count: 0.0,
            min_key: i64::MAX,
            max_key: i64::MIN,
            chunk_size,
            offset: 0,
        }
    }

    fn length_i64(&self) -> i64 {
        self.bins.len() as i64
    }

    /// Next allocation size covering `[new_min_key, new_max_key]`, rounded up
    /// to a whole number of chunks.
    fn get_new_length(&self, new_min_key: i64, new_max_key: i64) -> i64 {
        let desired_length = new_max_key - new_min_key + 1;
        let chunk_size = self.chunk_size;
        chunk_size * ((desired_length + chunk_size - 1) / chunk_size)
    }

    /// Repositions the active range inside the backing without resizing it.
    fn adjust(&mut self, new_min_key: i64, new_max_key: i64) {
        self.center_bins(new_min_key, new_max_key);
        self.min_key = new_min_key;
        self.max_key = new_max_key;
    }

    /// Shifts the counters; a positive shift moves them toward higher
    /// positions. The offset changes inversely so keys stay put.
    fn shift_bins(&mut self, shift: i64) {
        if shift > 0 {
            self.bins.remove_trailing_elements(shift as usize);
            self.bins.extend_front_with_zeros(shift as usize);
        } else {
            let abs_shift = shift.unsigned_abs() as usize;
            self.bins.remove_leading_elements(abs_shift);
            self.bins.extend_back_with_zeros(abs_shift);
        }

        self.offset -= shift;
    }

    /// Centers the active range in the backing.
    fn center_bins(&mut self, new_min_key: i64, new_max_key: i64) {
        let middle_key = new_min_key + (new_max_key - new_min_key + 1) / 2;

        self.shift_bins(self.offset + self.length_i64() / 2 - middle_key);
    }

    /// Grows the backing as necessary to cover both keys, then adjusts.
    fn extend_range(&mut self, key: i64, second_key: i64) {
        let new_min_key = key.min(second_key).min(self.min_key);
        let new_max_key = key.max(second_key).max(self.max_key);

        if self.is_empty() {
            let new_length = self.get_new_length(new_min_key, new_max_key);
            self.bins.initialize_with_zeros(new_length as usize);
            self.offset = new_min_key;
            self.adjust(new_min_key, new_max_key);
        } else if new_min_key >= self.min_key && new_max_key < self.offset + self.length_i64() {
            // The range still fits the backing; only the active window moves.
            self.min_key = new_min_key;
            self.max_key = new_max_key;
        } else {
            let new_length = self.get_new_length(new_min_key, new_max_key);
            if new_length > self.length_i64() {
                self.bins.extend_back_with_zeros((new_length - self.length_i64()) as usize);
            }
            self.adjust(new_min_key, new_max_key);
        }
    }

    /// Position of the bin for `key`, extending the range if necessary.
    fn get_index(&mut self, key: i64) -> usize {
        if key < self.min_key || key > self.max_key {
            self.extend_range(key, key);
        }

        (key - self.offset) as usize
    }
}

impl Store for DenseStore {
    fn add(&mut self, key: i64, weight: f64) {
        let idx = self.get_index(key);
        self.bins[idx] += weight;
        self.count += weight;
    }

    fn merge(&mut self, other: &Self) {
        if other.count == 0.0 {
            return;
        }

        if self.count == 0.0 {
            self.copy(other);
            return;
        }

        if other.min_key < self.min_key || other.max_key > self.max_key {
            self.extend_range(other.min_key, other.max_key);
        }

        for key in other.min_key..=other.max_key {
            self.bins[(key - self.offset) as usize] += other.bins[(key - other.offset) as usize];
        }

        self.count += other.count;
    }

    fn copy(&mut self, other: &Self) {
        self.bins = other.bins.clone();
        self.count = other.count;
        self.min_key = other.min_key;
        self.max_key = other.max_key;
        self.offset = other.offset;
    }

    fn key_at_rank(&self, rank: f64, lower: bool) -> i64 {
        let mut running = 0.0;

        for (idx, counter) in self.bins.iter().enumerate() {
            running += counter;
            if (lower && running > rank) || (!lower && running >= rank + 1.0) {
                return idx as i64 + self.offset;
            }
        }

        self.max_key
    }

    fn count(&self) -> f64 {
        self.count
    }

    fn length(&self) -> usize {
        self.bins.len()
    }

    fn bins(&self) -> &BinList {
        &self.bins
    }

    fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for DenseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DenseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, counter) in self.bins.iter().enumerate() {
            write!(f, "{}: {counter}, ", idx as i64 + self.offset)?;
        }
        write!(
            f,
            "}}, min_key:{}, max_key:{}, offset:{}",
            self.min_key, self.max_key, self.offset
        )
    }
}
