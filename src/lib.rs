//! A quantile sketch with relative-error guarantees.
//!
//! This crate computes quantile values over streams of real-valued
//! observations with an approximation error that is relative to the actual
//! quantile value, for both negative and non-negative inputs. With a relative
//! accuracy guarantee of 1%, if the expected quantile value is 100 the
//! computed value is guaranteed to be between 99 and 101; if the expected
//! value is 1000, between 990 and 1010.
//!
//! The sketch works by mapping floating-point input values to bins and
//! counting the weight of the values in each bin. The memory footprint
//! depends on the range covered by the input: the larger that range, the more
//! bins are needed. As a rough estimate, tracking durations with a relative
//! accuracy of 2% takes about 2kB (275 bins) to cover values between 1
//! millisecond and 1 minute, and about 6kB (802 bins) to cover values between
//! 1 nanosecond and 1 day. The collapsing store constructors put a fail-safe
//! upper bound on the size; the likelihood of an actual collapse with the
//! default bound is vanishingly small for most data.
//!
//! Sketches built with the same accuracy parameter merge losslessly, so
//! observations can be sketched on separate hosts and combined afterwards.
//!
//! # Quick Start
//!
//! ```
//! use quantile_sketch::DDSketch;
//!
//! // Create a sketch with 1% relative accuracy.
//! let mut sketch = DDSketch::with_relative_accuracy(0.01)?;
//!
//! sketch.add(1.5);
//! sketch.add(2.5);
//! sketch.add(3.5);
//!
//! let p50 = sketch.quantile(0.5);
//! let p99 = sketch.quantile(0.99);
//! # Ok::<(), quantile_sketch::SketchError>(())
//! ```
//!
//! For a hard bound on memory, use a collapsing variant; tail accuracy is
//! kept on the side that matters:
//!
//! ```
//! use quantile_sketch::DDSketch;
//!
//! // At most 2048 bins per store; low quantiles lose accuracy first.
//! let mut sketch = DDSketch::log_collapsing_lowest(0.02, 2048)?;
//! sketch.add(1250.0);
//! # Ok::<(), quantile_sketch::SketchError>(())
//! ```
//!
//! # Store and mapping choices
//!
//! - [`DenseStore`]: unbounded storage. Best when memory is not a concern.
//! - [`CollapsingLowestDenseStore`]: bounded, folds the lowest bins when the
//!   limit is reached. Best when higher quantiles (p95, p99) matter most.
//! - [`CollapsingHighestDenseStore`]: bounded, folds the highest bins. Best
//!   when lower quantiles (p1, p5) matter most.
//!
//! - [`LogarithmicMapping`]: memory-optimal, evaluates a true logarithm per
//!   insertion.
//! - [`LinearlyInterpolatedMapping`] and [`CubicallyInterpolatedMapping`]:
//!   approximate the logarithm from the floating-point representation,
//!   trading a slightly denser key space for cheaper arithmetic.

#![deny(missing_docs)]

mod common;
mod error;
mod sketch;

pub mod mapping;
pub mod store;

pub use self::error::SketchError;
pub use self::mapping::{
    CubicallyInterpolatedMapping, KeyMapping, LinearlyInterpolatedMapping, LogarithmicMapping,
    MappingParams,
};
pub use self::sketch::DDSketch;
pub use self::store::{
    BinList, CollapsingHighestDenseStore, CollapsingLowestDenseStore, DenseStore, Store,
};
