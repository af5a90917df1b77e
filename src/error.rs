//! Error types for sketch, store, and mapping operations.

use snafu::Snafu;

/// Errors surfaced by sketch construction and mutation.
///
/// Out-of-range quantile queries are not represented here; they are signaled
/// in-band as NaN since an approximate answer simply does not exist.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum SketchError {
    /// The relative accuracy parameter is outside the open interval (0, 1).
    #[snafu(display("relative accuracy must be between 0 and 1 (exclusive), got {value}"))]
    InvalidRelativeAccuracy {
        /// The rejected accuracy parameter.
        value: f64,
    },

    /// An observation was added with a zero or negative weight.
    #[snafu(display("weight must be positive, got {weight}"))]
    NonPositiveWeight {
        /// The rejected weight.
        weight: f64,
    },

    /// A range query addressed counters beyond the end of the bin sequence.
    #[snafu(display("bin range [{start}, {end}) out of bounds for length {len}"))]
    RangeOutOfBounds {
        /// Start of the requested range, inclusive.
        start: usize,
        /// End of the requested range, exclusive.
        end: usize,
        /// Length of the bin sequence.
        len: usize,
    },

    /// Two sketches with different gamma parameters cannot be merged.
    #[snafu(display("cannot merge sketches with different gamma parameters ({left} != {right})"))]
    UnequalParameters {
        /// Gamma of the receiving sketch.
        left: f64,
        /// Gamma of the other sketch.
        right: f64,
    },
}
