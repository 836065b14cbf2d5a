//! Exact fixed-point decimal values.
//!
//! Canonical financial fields are represented as an integer mantissa paired with
//! a scale, never as a bare `f64`: `value = scaled / 10^scale`. This avoids the
//! representation error a float round-trip would introduce into a reported price
//! or earnings-per-share figure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum supported scale (number of fractional decimal digits).
pub const MAX_SCALE: u8 = 9;

/// Errors produced while constructing or manipulating a [`Scaled`] value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScaledError {
    /// `scale` exceeded [`MAX_SCALE`].
    #[error("scale {scale} out of range [0, {MAX_SCALE}]")]
    ScaleOutOfRange {
        /// The offending scale.
        scale: u8,
    },
    /// The source `f64` was NaN or infinite.
    #[error("non-finite value cannot be converted to a Scaled")]
    NonFiniteValue,
    /// Rescaling to a smaller scale would drop non-zero fractional digits.
    #[error("rescale from scale {from} to {to} would lose precision for {scaled}")]
    LossyRescale {
        /// Mantissa being rescaled.
        scaled: i128,
        /// Original scale.
        from: u8,
        /// Requested scale.
        to: u8,
    },
    /// An arithmetic operation was attempted between values of different scales.
    #[error("scale mismatch: {lhs} != {rhs}")]
    ScaleMismatch {
        /// Left operand's scale.
        lhs: u8,
        /// Right operand's scale.
        rhs: u8,
    },
    /// Mantissa arithmetic overflowed `i128`.
    #[error("arithmetic overflow computing Scaled value")]
    Overflow,
}

/// An exact fixed-point value: `scaled / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scaled {
    scaled: i128,
    scale: u8,
}

impl Scaled {
    /// Constructs a value from a raw mantissa and scale.
    ///
    /// # Errors
    ///
    /// Returns [`ScaledError::ScaleOutOfRange`] if `scale > MAX_SCALE`.
    pub fn new(scaled: i128, scale: u8) -> Result<Self, ScaledError> {
        if scale > MAX_SCALE {
            return Err(ScaledError::ScaleOutOfRange { scale });
        }
        Ok(Self { scaled, scale })
    }

    /// Constructs a value from an `f64` at the given `scale`, rounding to the
    /// nearest mantissa.
    ///
    /// # Errors
    ///
    /// Returns [`ScaledError::NonFiniteValue`] if `value` is NaN or infinite, or
    /// [`ScaledError::ScaleOutOfRange`] if `scale > MAX_SCALE`.
    pub fn from_f64(value: f64, scale: u8) -> Result<Self, ScaledError> {
        if !value.is_finite() {
            return Err(ScaledError::NonFiniteValue);
        }
        if scale > MAX_SCALE {
            return Err(ScaledError::ScaleOutOfRange { scale });
        }
        let factor = 10f64.powi(i32::from(scale));
        let scaled = (value * factor).round() as i128;
        Ok(Self { scaled, scale })
    }

    /// The raw mantissa.
    #[must_use]
    pub fn raw(&self) -> i128 {
        self.scaled
    }

    /// The number of fractional decimal digits.
    #[must_use]
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Converts back to an `f64`. Lossy for values requiring more than 53 bits
    /// of mantissa precision; intended only for display and DTO boundaries.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.scaled as f64 / 10f64.powi(i32::from(self.scale))
    }

    /// Rescales to `new_scale`, requiring the conversion to be exact.
    ///
    /// # Errors
    ///
    /// Returns [`ScaledError::LossyRescale`] if narrowing the scale would drop
    /// non-zero digits, [`ScaledError::ScaleOutOfRange`] if `new_scale >
    /// MAX_SCALE`, or [`ScaledError::Overflow`] on mantissa overflow.
    pub fn rescale_to(&self, new_scale: u8) -> Result<Self, ScaledError> {
        if new_scale > MAX_SCALE {
            return Err(ScaledError::ScaleOutOfRange { scale: new_scale });
        }
        if new_scale == self.scale {
            return Ok(*self);
        }
        if new_scale > self.scale {
            let factor = 10i128.pow(u32::from(new_scale - self.scale));
            let scaled = self.scaled.checked_mul(factor).ok_or(ScaledError::Overflow)?;
            return Ok(Self { scaled, scale: new_scale });
        }
        let divisor = 10i128.pow(u32::from(self.scale - new_scale));
        if self.scaled % divisor != 0 {
            return Err(ScaledError::LossyRescale {
                scaled: self.scaled,
                from: self.scale,
                to: new_scale,
            });
        }
        Ok(Self { scaled: self.scaled / divisor, scale: new_scale })
    }

    /// Adds two values of equal scale.
    ///
    /// # Errors
    ///
    /// Returns [`ScaledError::ScaleMismatch`] if the scales differ, or
    /// [`ScaledError::Overflow`] on mantissa overflow.
    pub fn checked_add(&self, other: &Self) -> Result<Self, ScaledError> {
        if self.scale != other.scale {
            return Err(ScaledError::ScaleMismatch { lhs: self.scale, rhs: other.scale });
        }
        let scaled = self.scaled.checked_add(other.scaled).ok_or(ScaledError::Overflow)?;
        Ok(Self { scaled, scale: self.scale })
    }

    /// Subtracts two values of equal scale.
    ///
    /// # Errors
    ///
    /// Returns [`ScaledError::ScaleMismatch`] if the scales differ, or
    /// [`ScaledError::Overflow`] on mantissa overflow.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, ScaledError> {
        if self.scale != other.scale {
            return Err(ScaledError::ScaleMismatch { lhs: self.scale, rhs: other.scale });
        }
        let scaled = self.scaled.checked_sub(other.scaled).ok_or(ScaledError::Overflow)?;
        Ok(Self { scaled, scale: self.scale })
    }
}

impl fmt::Display for Scaled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.scaled);
        }
        let factor = 10i128.pow(u32::from(self.scale));
        let negative = self.scaled < 0;
        let abs = self.scaled.unsigned_abs();
        let whole = abs / factor as u128;
        let frac = abs % factor as u128;
        if negative {
            write!(f, "-")?;
        }
        write!(f, "{whole}.{frac:0width$}", width = self.scale as usize)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(10)]
    #[case(0)]
    #[case(9)]
    fn new_accepts_valid_scale(#[case] scale: u8) {
        assert!(Scaled::new(1, scale.min(MAX_SCALE)).is_ok());
    }

    #[test]
    fn new_rejects_scale_above_max() {
        assert_eq!(Scaled::new(1, 10), Err(ScaledError::ScaleOutOfRange { scale: 10 }));
    }

    #[test]
    fn display_formats_fractional_digits() {
        let v = Scaled::new(153, 2).unwrap();
        assert_eq!(v.to_string(), "1.53");
    }

    #[test]
    fn display_formats_negative_values() {
        let v = Scaled::new(-153, 2).unwrap();
        assert_eq!(v.to_string(), "-1.53");
    }

    #[test]
    fn rescale_widening_is_exact() {
        let v = Scaled::new(153, 2).unwrap();
        let wider = v.rescale_to(4).unwrap();
        assert_eq!(wider.raw(), 15300);
        assert_eq!(wider.scale(), 4);
    }

    #[test]
    fn rescale_narrowing_exact_succeeds() {
        let v = Scaled::new(15300, 4).unwrap();
        let narrower = v.rescale_to(2).unwrap();
        assert_eq!(narrower.raw(), 153);
    }

    #[test]
    fn rescale_narrowing_lossy_fails() {
        let v = Scaled::new(15301, 4).unwrap();
        assert!(matches!(v.rescale_to(2), Err(ScaledError::LossyRescale { .. })));
    }

    #[test]
    fn checked_add_requires_equal_scale() {
        let a = Scaled::new(100, 2).unwrap();
        let b = Scaled::new(1, 0).unwrap();
        assert!(matches!(a.checked_add(&b), Err(ScaledError::ScaleMismatch { .. })));
    }

    #[test]
    fn from_f64_rejects_non_finite() {
        assert_eq!(Scaled::from_f64(f64::NAN, 2), Err(ScaledError::NonFiniteValue));
    }

    proptest! {
        #[test]
        fn round_trips_through_f64_within_scale(
            mantissa in -1_000_000_000i64..=1_000_000_000i64,
            scale in 0u8..=9u8,
        ) {
            let v = Scaled::new(i128::from(mantissa), scale).unwrap();
            let back = Scaled::from_f64(v.to_f64(), scale).unwrap();
            prop_assert_eq!(back.raw(), v.raw());
        }

        #[test]
        fn widen_then_narrow_is_identity(
            mantissa in -1_000_000i64..=1_000_000i64,
            scale in 0u8..=5u8,
            widen_by in 0u8..=4u8,
        ) {
            let v = Scaled::new(i128::from(mantissa), scale).unwrap();
            let wide = v.rescale_to(scale + widen_by).unwrap();
            let back = wide.rescale_to(scale).unwrap();
            prop_assert_eq!(back, v);
        }
    }
}
