use std::fmt;

use tracing::debug;

use super::{BinList, Store, DEFAULT_BIN_LIMIT, DEFAULT_CHUNK_SIZE};

/// A dense store that folds its lowest bins together once the backing would
/// exceed a configured bin limit.
///
/// Collapsing sacrifices the relative accuracy of the lowest quantiles to
/// bound memory usage; accuracy is preserved everywhere above the collapsed
/// band.
///
/// Use this store when:
/// - memory must have a fail-safe upper bound
/// - higher quantiles (p95, p99) matter more than lower ones, as with
///   latency tracking
#[derive(Clone, Debug, PartialEq)]
pub struct CollapsingLowestDenseStore {
    bins: BinList,
    count: f64,
    min_key: i64,
    max_key: i64,
    chunk_size: i64,
    offset: i64,
    bin_limit: i64,
    is_collapsed: bool,
}

impl CollapsingLowestDenseStore {
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

    /// Next allocation size covering `[new_min_key, new_max_key]`, rounded up
    /// to a whole number of chunks and capped at the bin limit.
    fn get_new_length(&self, new_min_key: i64, new_max_key: i64) -> i64 {
        let desired_length = new_max_key - new_min_key + 1;
        let chunk_size = self.chunk_size;
        let div_ceil = (desired_length + chunk_size - 1) / chunk_size;
        (chunk_size * div_ceil).min(self.bin_limit)
    }

    /// Repositions the active range inside the backing without resizing it,
    /// folding the lowest bins when the range is too wide to fit.
    fn adjust(&mut self, mut new_min_key: i64, new_max_key: i64) {
        if new_max_key - new_min_key + 1 > self.length_i64() {
            // The requested range is wider than the backing allows; the
            // lowest bins get folded into the bin at the clamped minimum.
            new_min_key = new_max_key - self.length_i64() + 1;

            if new_min_key >= self.max_key {
                // The new range lies entirely above the old one.
                self.offset = new_min_key;
                self.min_key = new_min_key;

                let length = self.bins.len();
                self.bins.initialize_with_zeros(length);
                self.bins[0] = self.count;
            } else {
                let shift = self.offset - new_min_key;

                if shift < 0 {
                    let collapse_start_index = (self.min_key - self.offset) as usize;
                    let collapse_end_index = (new_min_key - self.offset) as usize;
                    let collapsed_count = self.bins.range_sum(collapse_start_index, collapse_end_index);

                    self.bins.replace_range_with_zeros(
                        collapse_start_index,
                        collapse_end_index,
                        (new_min_key - self.min_key) as usize,
                    );
                    self.bins[collapse_end_index] += collapsed_count;
                    self.min_key = new_min_key;

                    self.shift_bins(shift);
                } else {
                    self.min_key = new_min_key;
                    self.shift_bins(shift);
                }
            }

            self.max_key = new_max_key;
            if !self.is_collapsed {
                debug!(bin_limit = self.bin_limit, "bin limit reached, folding lowest bins");
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

    /// Position of the bin for `key`. Once collapsed, keys below the window
    /// land in the sink bin at position 0.
    fn get_index(&mut self, key: i64) -> usize {
        if key < self.min_key {
            if self.is_collapsed {
                return 0;
            }

            self.extend_range(key, key);

            if self.is_collapsed {
                return 0;
            }
        } else if key > self.max_key {
            self.extend_range(key, key);
        }

        (key - self.offset) as usize
    }
}

impl Store for CollapsingLowestDenseStore {
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

        // Other's bins below the receiver's window fold into the sink bin.
        let collapse_start_index = other.min_key - other.offset;
        let mut collapse_end_index = self.min_key.min(other.max_key + 1) - other.offset;

        if collapse_end_index > collapse_start_index {
            let collapsed_count = other
                .bins
                .range_sum(collapse_start_index as usize, collapse_end_index as usize);
            self.bins[0] += collapsed_count;
        } else {
            collapse_end_index = collapse_start_index;
        }

        for key in (collapse_end_index + other.offset)..=other.max_key {
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

impl Default for CollapsingLowestDenseStore {
    /// Creates a collapsing store with the default limit of 2048 bins.
    fn default() -> Self {
        Self::new(DEFAULT_BIN_LIMIT)
    }
}

impl fmt::Display for CollapsingLowestDenseStore {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{assert_store_matches, key_counts, key_streams, merge_stream_groups};

    const TEST_BIN_LIMITS: &[i64] = &[1, 20, 1000];

    fn store_from(keys: &[i64], bin_limit: i64) -> CollapsingLowestDenseStore {
        let mut store = CollapsingLowestDenseStore::new(bin_limit);
        for &key in keys {
            store.add(key, 1.0);
        }
        store
    }

    /// Keys below `max(keys) - bin_limit + 1` are folded upward to that
    /// boundary; everything else must be counted exactly.
    fn clamped_counts(keys: &[i64], bin_limit: i64) -> std::collections::BTreeMap<i64, f64> {
        let max_key = keys.iter().copied().max().unwrap();
        let min_storable = max_key - bin_limit + 1;
        let clamped: Vec<i64> = keys.iter().map(|&key| key.max(min_storable)).collect();
        key_counts(&clamped)
    }

    fn assert_collapsed_matches(store: &CollapsingLowestDenseStore, keys: &[i64], bin_limit: i64) {
        if keys.is_empty() {
            assert_store_matches(store, &key_counts(keys));
        } else {
            assert_store_matches(store, &clamped_counts(keys, bin_limit));
        }
    }

    #[test]
    fn test_empty() {
        let store = CollapsingLowestDenseStore::new(1024);
        assert!(store.is_empty());
        assert_eq!(store.count(), 0.0);
        assert!(!store.is_collapsed());
    }

    #[test]
    fn test_bin_limit_default_substitution() {
        assert_eq!(CollapsingLowestDenseStore::new(0).bin_limit(), 2048);
        assert_eq!(CollapsingLowestDenseStore::new(-5).bin_limit(), 2048);
        assert_eq!(CollapsingLowestDenseStore::new(64).bin_limit(), 64);
    }

    #[test]
    fn test_key_streams() {
        for keys in key_streams() {
            for &bin_limit in TEST_BIN_LIMITS {
                let store = store_from(&keys, bin_limit);
                assert_collapsed_matches(&store, &keys, bin_limit);
            }
        }
    }

    #[test]
    fn test_merging() {
        for group in merge_stream_groups() {
            for &bin_limit in TEST_BIN_LIMITS {
                let mut merged = CollapsingLowestDenseStore::new(bin_limit);
                let mut all_keys = Vec::new();

                for keys in &group {
                    let mut intermediate = CollapsingLowestDenseStore::new(bin_limit);
                    for &key in keys {
                        intermediate.add(key, 1.0);
                    }
                    merged.merge(&intermediate);
                    all_keys.extend(keys.iter().copied());
                }

                assert_collapsed_matches(&merged, &all_keys, bin_limit);
            }
        }
    }

    #[test]
    fn test_collapse_is_sticky() {
        let mut store = CollapsingLowestDenseStore::new(20);
        for key in 0..40 {
            store.add(key, 1.0);
        }
        assert!(store.is_collapsed());

        // Keys 0..=20 were folded into the sink bin at key 20; a later key
        // below the window lands there too, without growing the backing.
        assert_eq!(store.bins()[0], 21.0);
        store.add(-100, 1.0);
        assert_eq!(store.length(), 20);
        assert_eq!(store.count(), 41.0);
        assert_eq!(store.bins()[0], 22.0);
    }

    #[test]
    fn test_no_collapse_within_limit() {
        let mut store = CollapsingLowestDenseStore::new(1000);
        for key in 0..500 {
            store.add(key, 1.0);
        }
        assert!(!store.is_collapsed());
        assert_store_matches(&store, &key_counts(&(0..500).collect::<Vec<_>>()));
    }

    #[test]
    fn test_merge_does_not_mutate_other() {
        let mut receiver = store_from(&[1, 2, 3], 20);
        let other = store_from(&(0..100).collect::<Vec<_>>(), 20);
        let snapshot = other.clone();

        receiver.merge(&other);

        assert_eq!(other, snapshot);
    }

    #[test]
    fn test_copy() {
        let source = store_from(&(0..100).collect::<Vec<_>>(), 20);
        let mut target = CollapsingLowestDenseStore::new(20);
        target.copy(&source);

        assert_eq!(target, source);
        assert!(target.is_collapsed());
    }
}
