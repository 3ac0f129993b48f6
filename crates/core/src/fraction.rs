use std::{cmp::Ordering, convert::TryFrom, ops::Mul};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A bounded scalar in `[0.0, 1.0]`.
///
/// Used for liquid fractions, efficiencies, incentive shares, market
/// penetration and trigger success rates.
///
/// Because the value is always finite and within `[0, 1]`, `Fraction`
/// implements [`Eq`] and [`Ord`] even though raw `f64` does not.
///
/// # Examples
/// ```
/// use latent_core::Fraction;
///
/// let efficiency = Fraction::new(0.7).unwrap();
/// assert_eq!(efficiency * 1000.0, 700.0);
/// assert_eq!(efficiency.complement().get(), 1.0 - 0.7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Fraction(f64);

impl Fraction {
    /// Nothing.
    pub const ZERO: Self = Self(0.0);

    /// Everything.
    pub const ONE: Self = Self(1.0);

    /// Creates a `Fraction` if `value` is within `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::NotFinite`] if `value` is `NaN` or infinite.
    /// Returns [`FractionError::OutOfRange`] if `value` is less than `0.0`
    /// or greater than `1.0`.
    pub fn new(value: f64) -> Result<Self, FractionError> {
        if !value.is_finite() {
            return Err(FractionError::NotFinite(value));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(FractionError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Creates a `Fraction` from a percentage within `[0, 100]`.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Fraction::new`].
    pub fn from_percent(percent: f64) -> Result<Self, FractionError> {
        Self::new(percent / 100.0)
    }

    /// Creates a `Fraction` by clamping `value` into `[0, 1]`.
    ///
    /// `NaN` maps to zero.
    #[must_use]
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Returns the inner `f64`.
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Returns `1 - self`.
    #[must_use]
    pub fn complement(self) -> Self {
        Self(1.0 - self.0)
    }

    /// Returns the fraction as a percentage in `[0, 100]`.
    #[must_use]
    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl TryFrom<f64> for Fraction {
    type Error = FractionError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Fraction::new(value)
    }
}

impl From<Fraction> for f64 {
    fn from(f: Fraction) -> Self {
        f.0
    }
}

impl Mul<f64> for Fraction {
    type Output = f64;
    fn mul(self, rhs: f64) -> Self::Output {
        self.0 * rhs
    }
}

impl Mul<Fraction> for f64 {
    type Output = f64;
    fn mul(self, rhs: Fraction) -> Self::Output {
        self * rhs.0
    }
}

impl Mul for Fraction {
    type Output = Fraction;
    fn mul(self, rhs: Fraction) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

// Construction forbids NaN, so the ordering is total.
impl Eq for Fraction {}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Errors that can occur when constructing a [`Fraction`].
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FractionError {
    /// Input was not finite.
    #[error("value is not finite: {0}")]
    NotFinite(f64),

    /// Input was outside the allowed range.
    #[error("value {0} is outside the range [0, 1]")]
    OutOfRange(f64),
}
