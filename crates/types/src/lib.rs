//! Validated value types for pipeline arguments.
//!
//! Command-line values arrive as strings. The types here check them once at the
//! boundary so later code can rely on the invariants without re-validating.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a [`PositiveDecimal`].
#[derive(Debug, thiserror::Error)]
pub enum NumberError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' must be a finite value greater than zero")]
    NotPositive(String),
}

/// Errors that can occur when parsing an [`UnwarpDirection`].
#[derive(Debug, thiserror::Error)]
pub enum DirectionError {
    #[error("'{0}' is not a valid unwarp direction (expected one of x, y, z, x-, y-, z-)")]
    Invalid(String),
}

/// A finite, strictly positive decimal that remembers how it was written.
///
/// Timing parameters (echo-time difference, dwell time) are handed to external
/// tools as text. Keeping the original spelling avoids `0.0000078` turning into
/// `7.8e-6` on the way through.
#[derive(Debug, Clone, PartialEq)]
pub struct PositiveDecimal {
    raw: String,
    value: f64,
}

impl PositiveDecimal {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The text exactly as supplied (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for PositiveDecimal {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let value: f64 = raw
            .parse()
            .map_err(|_| NumberError::NotANumber(raw.to_owned()))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(NumberError::NotPositive(raw.to_owned()));
        }
        Ok(Self {
            raw: raw.to_owned(),
            value,
        })
    }
}

impl fmt::Display for PositiveDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Voxel axis along which susceptibility displacement occurs.
///
/// The trailing `-` form selects the negative direction along the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnwarpDirection {
    X,
    Y,
    Z,
    XNeg,
    YNeg,
    ZNeg,
}

impl UnwarpDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::XNeg => "x-",
            Self::YNeg => "y-",
            Self::ZNeg => "z-",
        }
    }
}

impl FromStr for UnwarpDirection {
    type Err = DirectionError;

    /// Accepts `x`, `y`, `z` with an optional sign either side (`y-` or `-y`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            "x-" | "-x" => Ok(Self::XNeg),
            "y-" | "-y" => Ok(Self::YNeg),
            "z-" | "-z" => Ok(Self::ZNeg),
            other => Err(DirectionError::Invalid(other.to_owned())),
        }
    }
}

impl fmt::Display for UnwarpDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
