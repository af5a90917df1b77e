//! Bin storage for mapped observations.
//!
//! Stores hold one real-valued counter per bin key inside a contiguous key
//! window tracked by a sliding offset. Adding weight outside the window grows
//! it in chunks; the collapsing variants instead fold overflowing bins into a
//! sink bin once a configured limit is reached.

mod bins;
mod collapsing_highest;
mod collapsing_lowest;
mod dense;

pub use self::bins::BinList;
pub use self::collapsing_highest::CollapsingHighestDenseStore;
pub use self::collapsing_lowest::CollapsingLowestDenseStore;
pub use self::dense::DenseStore;

/// Number of bins a store grows by at a time, to amortize reallocation.
pub const DEFAULT_CHUNK_SIZE: i64 = 128;

/// Default maximum number of bins for the collapsing stores.
pub const DEFAULT_BIN_LIMIT: i64 = 2048;

/// Storage for sketch observations.
///
/// A store contains a list of bins and the total observation weight counted
/// in each bin. Merging replays one store's contents into another without
/// mutating the source.
pub trait Store: Clone {
    /// Adds `weight` to the counter for `key`, growing the key window if
    /// necessary (subject to the store's collapse rules).
    fn add(&mut self, key: i64, weight: f64);

    /// Merges `other` into this store.
    ///
    /// This is equivalent to replaying every `add` recorded by `other` on
    /// this store. `other` is left untouched.
    fn merge(&mut self, other: &Self);

    /// Replaces this store's contents with a deep copy of `other`.
    fn copy(&mut self, other: &Self);

    /// Returns the key for the value at the given rank.
    ///
    /// With bins of counts `[1, 1]` at keys `a` and `b`: when `lower` is
    /// true, ranks in `[0, 1)` map to `a` and `[1, 2)` to `b`; when `lower`
    /// is false, ranks in `(-1, 0]` map to `a` and `(0, 1]` to `b`. Ranks at
    /// or beyond the total count return the maximum key.
    fn key_at_rank(&self, rank: f64, lower: bool) -> i64;

    /// The total weight across all bins.
    fn count(&self) -> f64;

    /// The number of allocated bins.
    fn length(&self) -> usize;

    /// Returns `true` if no bins are allocated.
    fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// A read-only view of the bin counters.
    fn bins(&self) -> &BinList;

    /// The key corresponding to position 0 of the counters.
    fn offset(&self) -> i64;
}
