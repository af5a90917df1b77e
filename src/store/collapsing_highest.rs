use std::fmt;

use tracing::debug;

use super::{BinList, Store, DEFAULT_BIN_LIMIT, DEFAULT_CHUNK_SIZE};

/// A dense store that folds its highest bins together once the backing would
/// exceed a configured bin limit.
///
/// The mirror image of [`CollapsingLowestDenseStore`]: collapsing sacrifices
/// the relative accuracy of the highest quantiles to bound memory usage, and
/// accuracy is preserved everywhere below the collapsed band.
///
/// Use this store when:
/// - memory must have a fail-safe upper bound
/// - lower quantiles (p1, p5) matter more than higher ones
///
/// [`CollapsingLowestDenseStore`]: crate::store::CollapsingLowestDenseStore
#[derive(Clone, Debug, PartialEq)]
pub struct CollapsingHighestDenseStore {
    bins: BinList,
    count: f64,
    min_key: i64,
    max_key: i64,
    chunk_size: i64,
    offset: i64,
    bin_limit: i64,
    is_collapsed: bool,
}

impl CollapsingHighestDenseStore {
    /// Creates an empty store with the given maximum number of bins.
    ///
    /// A `bin_limit` of zero or less is replaced by the default of 2048.
    pub fn new(bin_limit: i64) -> Self {
        Self::with_chunk_size(bin_limit, DEFAULT_CHUNK_SIZE)
    }

    /// Creates an empty store with the given bin limit and growth chunk size.
    ///
    /// A `bin_limit` of zero or less is replaced by the default of 2048.
    pub fn with_chunk_size(bin_limit: i64, chunk_size: i64) -> Self {
        let bin_limit = if bin_limit <= 0 { DEFAULT_BIN_LIMIT } else { bin_limit };

        Self {
            bins: BinList::new(),
            count: 0.0,
            min_key: i64::MAX,
            max_key: i64::MIN,
            chunk_size,
            offset: 0,
            bin_limit,
            is_collapsed: false,
        }
    }

    /// The maximum number of bins this store will allocate.
    pub fn bin_limit(&self) -> i64 {
        self.bin_limit
    }

    /// Returns `true` once any collapse has occurred.
    ///
    /// When collapsed, accuracy guarantees no longer hold for the quantiles
    /// that fall into the folded band.
    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    fn length_i64(&self) -> i64 {
        self.bins.len() as i64
    }

    fn get_new_length(&self, new_min_key: i64, new_max_key: i64) -> i64 {
        let desired_length = new_max_key - new_min_key + 1;
        let chunk_size = self.chunk_size;
        let div_ceil = (desired_length + chunk_size - 1) / chunk_size;
        (chunk_size * div_ceil).min(self.bin_limit)
    }

    /// Repositions the active range inside the backing without resizing it,
    /// folding the highest bins when the range is too wide to fit.
    fn adjust(&mut self, new_min_key: i64, mut new_max_key: i64) {
        if new_max_key - new_min_key + 1 > self.length_i64() {
            // The requested range is wider than the backing allows; the
            // highest bins get folded into the bin at the clamped maximum.
            new_max_key = new_min_key + self.length_i64() - 1;

            if new_max_key <= self.min_key {
                // The new range lies entirely below the old one.
                self.offset = new_min_key;
                self.max_key = new_max_key;

                let length = self.bins.len();
                self.bins.initialize_with_zeros(length);
                let last = length - 1;
                self.bins[last] = self.count;
            } else {
                let shift = self.offset - new_min_key;

                if shift > 0 {
                    let collapse_start_index = (new_max_key - self.offset + 1) as usize;
                    let collapse_end_index = (self.max_key - self.offset + 1) as usize;
                    let collapsed_count = self.bins.range_sum(collapse_start_index, collapse_end_index);

                    self.bins.replace_range_with_zeros(
                        collapse_start_index,
                        collapse_end_index,
                        (self.max_key - new_max_key) as usize,
                    );
                    self.bins[collapse_start_index - 1] += collapsed_count;
                    self.max_key = new_max_key;

                    self.shift_bins(shift);
                } else {
                    self.max_key = new_max_key;
                    self.shift_bins(shift);
                }
            }

            self.min_key = new_min_key;
            if !self.is_collapsed {
                debug!(bin_limit = self.bin_limit, "bin limit reached, folding highest bins");
                self.is_collapsed = true;
            }
        } else {
            self.center_bins(new_min_key, new_max_key);
            self.min_key = new_min_key;
            self.max_key = new_max_key;
        }
    }

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

    fn center_bins(&mut self, new_min_key: i64, new_max_key: i64) {
        let middle_key = new_min_key + (new_max_key - new_min_key + 1) / 2;

        self.shift_bins(self.offset + self.length_i64() / 2 - middle_key);
    }

    fn extend_range(&mut self, key: i64, second_key: i64) {
        let new_min_key = key.min(second_key).min(self.min_key);
        let new_max_key = key.max(second_key).max(self.max_key);

        if self.is_empty() {
            let new_length = self.get_new_length(new_min_key, new_max_key);
            self.bins.initialize_with_zeros(new_length as usize);
            self.offset = new_min_key;
            self.adjust(new_min_key, new_max_key);
        } else if new_min_key >= self.min_key && new_max_key < self.offset + self.length_i64() {
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

    /// Position of the bin for `key`. Once collapsed, keys above the window
    /// land in the sink bin at the last position.
    fn get_index(&mut self, key: i64) -> usize {
        if key > self.max_key {
            if self.is_collapsed {
                return self.bins.len() - 1;
            }

            self.extend_range(key, key);

            if self.is_collapsed {
                return self.bins.len() - 1;
            }
        } else if key < self.min_key {
            self.extend_range(key, key);
        }

        (key - self.offset) as usize
    }
}

impl Store for CollapsingHighestDenseStore {
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

        // Other's bins above the receiver's window fold into the sink bin.
        let collapse_end_index = other.max_key - other.offset + 1;
        let mut collapse_start_index = (self.max_key + 1).max(other.min_key) - other.offset;

        if collapse_end_index > collapse_start_index {
            let collapsed_count = other
                .bins
                .range_sum(collapse_start_index as usize, collapse_end_index as usize);
            let last = self.bins.len() - 1;
            self.bins[last] += collapsed_count;
        } else {
            collapse_start_index = collapse_end_index;
        }

        for key in other.min_key..(collapse_start_index + other.offset) {
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
        self.bin_limit = other.bin_limit;
        self.is_collapsed = other.is_collapsed;
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

impl Default for CollapsingHighestDenseStore {
    /// Creates a collapsing store with the default limit of 2048 bins.
    fn default() -> Self {
        Self::new(DEFAULT_BIN_LIMIT)
    }
}

impl fmt::Display for CollapsingHighestDenseStore {
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
