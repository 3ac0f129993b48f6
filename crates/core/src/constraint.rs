//! Numeric constraints checked at construction time.
//!
//! Configuration types validate each raw parameter against a [`Bound`] when
//! they are built. A failed check yields a [`Violation`] that names the
//! parameter, the offending value and the bound it broke, so callers can fix
//! the input without re-deriving anything.
//!
//! `NaN` violates every bound.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A bound a scalar parameter must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Bound {
    /// Greater than zero.
    StrictlyPositive,
    /// Zero or greater.
    NonNegative,
    /// Strictly less than the given value.
    Below(f64),
    /// Strictly greater than the given value.
    Above(f64),
    /// Less than or equal to the given value.
    AtMost(f64),
}

impl Bound {
    /// Checks `value` against this bound.
    ///
    /// Returns the value unchanged so checks can be chained into field
    /// initializers.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] naming `parameter` if the bound does not hold.
    ///
    /// # Example
    ///
    /// ```
    /// use latent_core::constraint::Bound;
    ///
    /// assert_eq!(Bound::StrictlyPositive.check("mass", 4.5), Ok(4.5));
    ///
    /// let err = Bound::Below(58.0).check("ambient", 60.0).unwrap_err();
    /// assert_eq!(err.parameter, "ambient");
    /// ```
    pub fn check(self, parameter: &'static str, value: f64) -> Result<f64, Violation> {
        let holds = match self {
            Bound::StrictlyPositive => value > 0.0,
            Bound::NonNegative => value >= 0.0,
            Bound::Below(limit) => value < limit,
            Bound::Above(limit) => value > limit,
            Bound::AtMost(limit) => value <= limit,
        };

        if holds {
            Ok(value)
        } else {
            Err(Violation {
                parameter,
                value,
                bound: self,
            })
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::StrictlyPositive => write!(f, "> 0"),
            Bound::NonNegative => write!(f, ">= 0"),
            Bound::Below(limit) => write!(f, "< {limit}"),
            Bound::Above(limit) => write!(f, "> {limit}"),
            Bound::AtMost(limit) => write!(f, "<= {limit}"),
        }
    }
}

/// A parameter that failed its [`Bound`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("`{parameter}` = {value} must be {bound}")]
pub struct Violation {
    pub parameter: &'static str,
    pub value: f64,
    pub bound: Bound,
}
