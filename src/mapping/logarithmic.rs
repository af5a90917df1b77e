//! Logarithmic key mapping implementation.

use std::f64::consts::LN_2;

use super::{KeyMapping, MappingParams};
use crate::error::SketchError;

/// The memory-optimal key mapping.
///
/// Given a target relative accuracy, this mapping covers a range of values
/// with the fewest possible keys, by logarithmically mapping floating-point
/// values to integers. Computing a key requires evaluating a logarithm, which
/// makes insertion slower than with the interpolated mappings.
#[derive(Clone, Debug, PartialEq)]
pub struct LogarithmicMapping {
    params: MappingParams,
    /// Precomputed `ln(2) / ln(gamma)`, so that `log_gamma` can be computed
    /// from the faster base-2 logarithm.
    multiplier: f64,
}

impl LogarithmicMapping {
    /// Creates a logarithmic mapping with the given relative accuracy.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use quantile_sketch::LogarithmicMapping;
    ///
    /// // Create a mapping with 1% relative accuracy.
    /// let mapping = LogarithmicMapping::new(0.01).unwrap();
    /// ```
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::with_offset(relative_accuracy, 0.0)
    }

    /// Creates a logarithmic mapping whose keys are shifted by `index_offset`.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    pub fn with_offset(relative_accuracy: f64, index_offset: f64) -> Result<Self, SketchError> {
        let params = MappingParams::new(relative_accuracy, index_offset)?;
        let multiplier = LN_2 / params.gamma_ln;
        Ok(Self { params, multiplier })
    }
}

impl Default for LogarithmicMapping {
    /// Creates a logarithmic mapping with 1% relative accuracy (the common default).
    fn default() -> Self {
        Self::new(0.01).expect("0.01 is a valid relative accuracy")
    }
}

impl KeyMapping for LogarithmicMapping {
    fn log_gamma(&self, value: f64) -> f64 {
        value.log2() * self.multiplier
    }

    fn pow_gamma(&self, value: f64) -> f64 {
        (value / self.multiplier).exp2()
    }

    fn params(&self) -> &MappingParams {
        &self.params
    }
}
