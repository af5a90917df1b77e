//! Mappings between values and bin keys.
//!
//! A mapping assigns every positive value to an integer bin key such that the
//! representative value of the key is within a relative error of
//! `relative_accuracy` of the original value. This is what gives the sketch
//! its relative-error guarantee.
//!
//! There is a trade-off between the cost of computing a key and the number of
//! keys required to cover a given range of values (memory optimality). The
//! memory-optimal mapping is [`LogarithmicMapping`], but it evaluates a true
//! logarithm on every insertion. The interpolated variants approximate the
//! logarithm from the IEEE-754 representation of the value, trading a
//! slightly denser key space for cheaper arithmetic.

mod cubic;
mod linear;
mod logarithmic;

pub use cubic::CubicallyInterpolatedMapping;
pub use linear::LinearlyInterpolatedMapping;
pub use logarithmic::LogarithmicMapping;

use snafu::ensure;

use crate::error::{InvalidRelativeAccuracy, SketchError};

/// Maps values to bin keys and back.
///
/// For any value `v` with `min_possible() <= v <= max_possible()`,
/// `value(key(v))` is within a relative error of `relative_accuracy()` of
/// `v`. Keys are only defined for positive values; the sketch routes zero and
/// negative observations separately.
pub trait KeyMapping: Clone {
    /// Returns (an approximation of) the logarithm of `value` in base gamma.
    fn log_gamma(&self, value: f64) -> f64;

    /// Returns (an approximation of) gamma raised to `value`.
    fn pow_gamma(&self, value: f64) -> f64;

    /// Returns the parameters shared by every mapping variant.
    fn params(&self) -> &MappingParams;

    /// Returns the key of the bucket containing `value`.
    ///
    /// A bucket with key `k` covers the values in `(gamma^(k-1), gamma^k]`,
    /// shifted by the mapping's key offset.
    fn key(&self, value: f64) -> i64 {
        (self.log_gamma(value).ceil() + self.params().index_offset) as i64
    }

    /// Returns the representative value of the bucket with the given key.
    ///
    /// The representative is the bucket upper bound scaled by `2 / (1 + gamma)`,
    /// which minimizes the worst-case relative error within the bucket.
    fn value(&self, key: i64) -> f64 {
        let params = self.params();
        self.pow_gamma(key as f64 - params.index_offset) * (2.0 / (1.0 + params.gamma))
    }

    /// The relative accuracy guarantee of this mapping.
    fn relative_accuracy(&self) -> f64 {
        self.params().relative_accuracy
    }

    /// The ratio between consecutive bucket boundaries.
    fn gamma(&self) -> f64 {
        self.params().gamma
    }

    /// The smallest positive value the mapping can distinguish from zero.
    fn min_possible(&self) -> f64 {
        self.params().min_possible
    }

    /// The largest value the mapping can handle.
    fn max_possible(&self) -> f64 {
        self.params().max_possible
    }
}

/// Parameters shared by every mapping variant, derived once at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingParams {
    pub(crate) relative_accuracy: f64,
    pub(crate) index_offset: f64,
    pub(crate) gamma: f64,
    pub(crate) gamma_ln: f64,
    pub(crate) min_possible: f64,
    pub(crate) max_possible: f64,
}

impl MappingParams {
    /// Derives the shared parameters for the given relative accuracy and key offset.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error
    /// is returned.
    pub fn new(relative_accuracy: f64, index_offset: f64) -> Result<Self, SketchError> {
        ensure!(
            relative_accuracy > 0.0 && relative_accuracy < 1.0,
            InvalidRelativeAccuracy { value: relative_accuracy }
        );

        // gamma = (1 + alpha) / (1 - alpha), written so that ln(gamma) can be
        // computed accurately through ln_1p even for tiny alpha.
        let gamma_mantissa = 2.0 * relative_accuracy / (1.0 - relative_accuracy);
        let gamma = 1.0 + gamma_mantissa;
        let gamma_ln = gamma_mantissa.ln_1p();

        Ok(Self {
            relative_accuracy,
            index_offset,
            gamma,
            gamma_ln,
            min_possible: f64::MIN_POSITIVE * gamma,
            max_possible: f64::MAX / gamma,
        })
    }
}

/// Decomposes a positive normal `value` into `(mantissa, exponent)` with
/// `value = mantissa * 2^exponent` and `mantissa` in `[0.5, 1)`.
pub(crate) fn frexp(value: f64) -> (f64, i32) {
    let bits = value.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32 - 1022;
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, exponent)
}

/// Scales `mantissa` by `2^exponent`.
///
/// The scale factor is applied in two steps so that exponents just past the
/// normal range do not overflow the intermediate power of two.
pub(crate) fn ldexp(mantissa: f64, exponent: i32) -> f64 {
    fn pow2(exponent: i32) -> f64 {
        f64::from_bits(((exponent + 1023) as u64) << 52)
    }

    let first = exponent.clamp(-1022, 1023);
    let second = (exponent - first).clamp(-1022, 1023);
    mantissa * pow2(first) * pow2(second)
}
