//! The quantile sketch itself.

use std::fmt;

use snafu::ensure;

use crate::common::float_eq;
use crate::error::{NonPositiveWeight, SketchError, UnequalParameters};
use crate::mapping::{KeyMapping, LogarithmicMapping};
use crate::store::{CollapsingHighestDenseStore, CollapsingLowestDenseStore, DenseStore, Store};

/// A fast and fully-mergeable quantile sketch with relative-error guarantees.
///
/// The sketch computes quantile values with an approximation error that is
/// relative to the actual quantile value, and works on negative, zero, and
/// positive inputs. With a relative accuracy of 1%, if the expected quantile
/// value is 100 the computed value is guaranteed to be between 99 and 101; if
/// the expected value is 1000, between 990 and 1010.
///
/// Observations are mapped to bins by a [`KeyMapping`] and counted by a pair
/// of [`Store`]s, one for each sign, plus an explicit counter for the zero
/// band. The memory footprint depends on the range covered by the input
/// values; the collapsing store constructors put a fail-safe upper bound on
/// it, at the cost of accuracy on one tail.
///
/// # Example
///
/// ```
/// use quantile_sketch::DDSketch;
///
/// let mut sketch = DDSketch::with_relative_accuracy(0.01)?;
/// sketch.add(1.0);
/// sketch.add(2.0);
/// sketch.add(3.0);
///
/// let median = sketch.quantile(0.5);
/// assert!((median - 2.0).abs() <= 0.01 * 2.0);
/// # Ok::<(), quantile_sketch::SketchError>(())
/// ```
#[derive(Clone, Debug)]
pub struct DDSketch<M = LogarithmicMapping, S = DenseStore> {
    /// Map between values and store bins.
    mapping: M,

    /// Storage for positive values.
    store: S,

    /// Storage for negative values.
    negative_store: S,

    /// The total weight of observations in the zero band.
    zero_count: f64,

    /// The total weight seen by the sketch.
    count: f64,

    /// The minimum value seen by the sketch.
    min: f64,

    /// The maximum value seen by the sketch.
    max: f64,

    /// The weighted sum of the values seen by the sketch.
    sum: f64,
}

impl DDSketch<LogarithmicMapping, DenseStore> {
    /// Creates a sketch with the given relative accuracy, backed by unbounded
    /// dense stores and the memory-optimal logarithmic mapping.
    ///
    /// The number of bins will not grow beyond a reasonable number unless the
    /// data is distributed with tails heavier than any subexponential; use
    /// one of the collapsing constructors for a hard memory bound.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    pub fn with_relative_accuracy(relative_accuracy: f64) -> Result<Self, SketchError> {
        let mapping = LogarithmicMapping::new(relative_accuracy)?;
        Ok(Self::new(mapping, DenseStore::new(), DenseStore::new()))
    }
}

impl DDSketch<LogarithmicMapping, CollapsingLowestDenseStore> {
    /// Creates a sketch with the given relative accuracy, backed by stores
    /// limited to `bin_limit` bins that collapse their lowest bins when full.
    ///
    /// Collapsing loses relative accuracy on the lowest quantiles only. A
    /// `bin_limit` of zero or less is replaced by the default of 2048, for
    /// which collapsing is unlikely unless the data is distributed with tails
    /// heavier than any subexponential.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    pub fn log_collapsing_lowest(relative_accuracy: f64, bin_limit: i64) -> Result<Self, SketchError> {
        let mapping = LogarithmicMapping::new(relative_accuracy)?;
        Ok(Self::new(
            mapping,
            CollapsingLowestDenseStore::new(bin_limit),
            CollapsingLowestDenseStore::new(bin_limit),
        ))
    }
}

impl DDSketch<LogarithmicMapping, CollapsingHighestDenseStore> {
    /// Creates a sketch with the given relative accuracy, backed by stores
    /// limited to `bin_limit` bins that collapse their highest bins when full.
    ///
    /// Collapsing loses relative accuracy on the highest quantiles only. A
    /// `bin_limit` of zero or less is replaced by the default of 2048.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    pub fn log_collapsing_highest(relative_accuracy: f64, bin_limit: i64) -> Result<Self, SketchError> {
        let mapping = LogarithmicMapping::new(relative_accuracy)?;
        Ok(Self::new(
            mapping,
            CollapsingHighestDenseStore::new(bin_limit),
            CollapsingHighestDenseStore::new(bin_limit),
        ))
    }
}

impl<M: KeyMapping, S: Store> DDSketch<M, S> {
    /// Creates a sketch from a mapping and a pair of stores.
    pub fn new(mapping: M, store: S, negative_store: S) -> Self {
        Self {
            mapping,
            store,
            negative_store,
            zero_count: 0.0,
            count: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }

    /// Adds a single observation to the sketch.
    pub fn add(&mut self, value: f64) {
        self.record(value, 1.0);
    }

    /// Adds an observation with the given weight to the sketch.
    ///
    /// # Errors
    ///
    /// If the weight is zero or negative, an error is returned and the sketch
    /// is unchanged.
    pub fn add_weighted(&mut self, value: f64, weight: f64) -> Result<(), SketchError> {
        ensure!(weight > 0.0, NonPositiveWeight { weight });
        self.record(value, weight);
        Ok(())
    }

    fn record(&mut self, value: f64, weight: f64) {
        if value > self.mapping.min_possible() {
            self.store.add(self.mapping.key(value), weight);
        } else if value < -self.mapping.min_possible() {
            self.negative_store.add(self.mapping.key(-value), weight);
        } else {
            self.zero_count += weight;
        }

        // Summary statistics are tracked exactly, not through the bins.
        self.count += weight;
        self.sum += value * weight;

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Returns the approximate value at the given quantile.
    ///
    /// Returns NaN if the quantile is outside `[0, 1]` or the sketch is
    /// empty; every other answer honors the relative accuracy guarantee.
    pub fn quantile(&self, quantile: f64) -> f64 {
        if !(0.0..=1.0).contains(&quantile) || self.count == 0.0 {
            return f64::NAN;
        }

        let rank = quantile * (self.count - 1.0);
        let negative_count = self.negative_store.count();

        if rank < negative_count {
            // Negative values are stored under their magnitude's key, so the
            // rank order within the negative store is reversed.
            let reversed_rank = negative_count - rank - 1.0;
            let key = self.negative_store.key_at_rank(reversed_rank, false);
            -self.mapping.value(key)
        } else if rank < self.zero_count + negative_count {
            0.0
        } else {
            let key = self
                .store
                .key_at_rank(rank - self.zero_count - negative_count, true);
            self.mapping.value(key)
        }
    }

    /// Merges the other sketch into this one.
    ///
    /// After this operation, this sketch encodes the values that were added
    /// to either sketch. The other sketch is left untouched.
    ///
    /// # Errors
    ///
    /// If the two sketches do not share the same gamma parameter, an error is
    /// returned and neither sketch is modified.
    pub fn merge(&mut self, other: &Self) -> Result<(), SketchError> {
        ensure!(
            self.mergeable(other),
            UnequalParameters { left: self.mapping.gamma(), right: other.mapping.gamma() }
        );

        if other.count == 0.0 {
            return Ok(());
        }

        if self.count == 0.0 {
            self.copy(other);
            return Ok(());
        }

        self.store.merge(&other.store);
        self.negative_store.merge(&other.negative_store);
        self.zero_count += other.zero_count;

        self.count += other.count;
        self.sum += other.sum;

        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }

        Ok(())
    }

    /// Returns `true` if the other sketch can be merged into this one, which
    /// requires both mappings to share the same gamma parameter.
    pub fn mergeable(&self, other: &Self) -> bool {
        self.mapping.gamma() == other.mapping.gamma()
    }

    /// Replaces this sketch's contents with a deep copy of `other`.
    pub fn copy(&mut self, other: &Self) {
        self.store.copy(&other.store);
        self.negative_store.copy(&other.negative_store);
        self.zero_count = other.zero_count;
        self.count = other.count;
        self.min = other.min;
        self.max = other.max;
        self.sum = other.sum;
    }

    /// The total weight of the observations seen by the sketch.
    pub fn num_values(&self) -> f64 {
        self.count
    }

    /// Returns `true` if no observations have been added.
    pub fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    /// The weighted sum of the observations seen by the sketch.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// The weighted average of the observations seen by the sketch.
    ///
    /// Returns NaN on an empty sketch.
    pub fn avg(&self) -> f64 {
        self.sum / self.count
    }

    /// The smallest observation seen by the sketch, or `+inf` when empty.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// The largest observation seen by the sketch, or `-inf` when empty.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The total weight of observations in the zero band.
    pub fn zero_count(&self) -> f64 {
        self.zero_count
    }

    /// The relative accuracy guarantee of this sketch.
    pub fn relative_accuracy(&self) -> f64 {
        self.mapping.relative_accuracy()
    }

    /// The mapping between values and bin keys.
    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// The store counting positive observations.
    pub fn positive_store(&self) -> &S {
        &self.store
    }

    /// The store counting negative observations.
    pub fn negative_store(&self) -> &S {
        &self.negative_store
    }
}

impl<M: KeyMapping, S: Store + PartialEq> PartialEq for DDSketch<M, S> {
    fn eq(&self, other: &Self) -> bool {
        self.mapping.gamma() == other.mapping.gamma()
            && self.store == other.store
            && self.negative_store == other.negative_store
            && float_eq(self.zero_count, other.zero_count)
            && float_eq(self.count, other.count)
            && float_eq(self.sum, other.sum)
            && self.min == other.min
            && self.max == other.max
    }
}

impl<M: KeyMapping + Default, S: Store + Default> Default for DDSketch<M, S> {
    fn default() -> Self {
        Self::new(M::default(), S::default(), S::default())
    }
}

impl<M: KeyMapping, S: Store> fmt::Display for DDSketch<M, S>
where
    S: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "store: {}, negative_store: {}, zero_count: {}, count: {}, sum: {}",
            self.store, self.negative_store, self.zero_count, self.count, self.sum
        )
    }
}
