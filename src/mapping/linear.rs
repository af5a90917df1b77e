//! Linearly-interpolated key mapping implementation.

use super::{frexp, ldexp, KeyMapping, MappingParams};
use crate::error::SketchError;

/// A fast key mapping that approximates [`LogarithmicMapping`] by extracting
/// the floor of the base-2 logarithm from the binary representation of a
/// value and linearly interpolating the logarithm in between powers of two.
///
/// [`LogarithmicMapping`]: crate::mapping::LogarithmicMapping
#[derive(Clone, Debug, PartialEq)]
pub struct LinearlyInterpolatedMapping {
    params: MappingParams,
    /// Precomputed `1 / ln(gamma)`.
    multiplier: f64,
}

impl LinearlyInterpolatedMapping {
    /// Creates a linearly-interpolated mapping with the given relative accuracy.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::with_offset(relative_accuracy, 0.0)
    }

    /// Creates a linearly-interpolated mapping whose keys are shifted by `index_offset`.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    pub fn with_offset(relative_accuracy: f64, index_offset: f64) -> Result<Self, SketchError> {
        let params = MappingParams::new(relative_accuracy, index_offset)?;
        let multiplier = 1.0 / params.gamma_ln;
        Ok(Self { params, multiplier })
    }

    /// Approximates `log2(value)` by `s + (e - 1)` where
    /// `value = (s + 1) * 2^(e - 1)` for `s` in `[0, 1)`.
    fn log2_approx(value: f64) -> f64 {
        let (mantissa, exponent) = frexp(value);
        let significand = 2.0 * mantissa - 1.0;
        significand + f64::from(exponent - 1)
    }

    /// Inverse of `log2_approx`.
    fn exp2_approx(value: f64) -> f64 {
        let exponent = value.floor() + 1.0;
        let mantissa = (value - exponent + 2.0) / 2.0;
        ldexp(mantissa, exponent as i32)
    }
}

impl KeyMapping for LinearlyInterpolatedMapping {
    fn log_gamma(&self, value: f64) -> f64 {
        Self::log2_approx(value) * self.multiplier
    }

    fn pow_gamma(&self, value: f64) -> f64 {
        Self::exp2_approx(value / self.multiplier)
    }

    fn params(&self) -> &MappingParams {
        &self.params
    }
}
