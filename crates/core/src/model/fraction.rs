use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::numbers::gcd;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FractionError {
    #[error("fraction denominator cannot be zero")]
    ZeroDenominator,

    #[error("fraction arithmetic overflowed")]
    Overflow,
}

/// A numerator over a non-zero denominator.
///
/// Operands shown to the learner are kept exactly as generated; only the
/// stored answer of a question is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    /// # Errors
    ///
    /// Returns `FractionError::ZeroDenominator` if `den == 0`.
    pub fn new(num: i64, den: i64) -> Result<Self, FractionError> {
        if den == 0 {
            return Err(FractionError::ZeroDenominator);
        }
        Ok(Self { num, den })
    }

    #[must_use]
    pub fn num(&self) -> i64 {
        self.num
    }

    #[must_use]
    pub fn den(&self) -> i64 {
        self.den
    }

    /// Divides out the greatest common divisor, keeping the sign on the numerator.
    #[must_use]
    pub fn reduced(self) -> Self {
        let common = gcd(self.num, self.den);
        if common <= 1 && self.den > 0 {
            return self;
        }
        let common = common.max(1);
        let sign = if self.den < 0 { -1 } else { 1 };
        Self {
            num: sign * self.num / common,
            den: sign * self.den / common,
        }
    }

    #[must_use]
    pub fn is_lowest_terms(&self) -> bool {
        gcd(self.num, self.den) == 1
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MixedNumber {
    pub whole: i64,
    pub fraction: Fraction,
}

impl MixedNumber {
    #[must_use]
    pub fn new(whole: i64, fraction: Fraction) -> Self {
        Self { whole, fraction }
    }

    /// `whole * den + num` over `den`, without reduction.
    ///
    /// # Errors
    ///
    /// Returns `FractionError::Overflow` if the numerator does not fit in `i64`.
    pub fn to_improper(&self) -> Result<Fraction, FractionError> {
        let num = self
            .whole
            .checked_mul(self.fraction.den)
            .and_then(|n| n.checked_add(self.fraction.num))
            .ok_or(FractionError::Overflow)?;
        Ok(Fraction {
            num,
            den: self.fraction.den,
        })
    }
}

impl fmt::Display for MixedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.whole, self.fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_rejected() {
        assert_eq!(Fraction::new(1, 0), Err(FractionError::ZeroDenominator));
    }

    #[test]
    fn reduce_divides_gcd() {
        let f = Fraction::new(6, 8).unwrap().reduced();
        assert_eq!((f.num(), f.den()), (3, 4));
        assert!(f.is_lowest_terms());
    }

    #[test]
    fn reduce_zero_numerator_gives_zero_over_one() {
        let f = Fraction::new(0, 6).unwrap().reduced();
        assert_eq!((f.num(), f.den()), (0, 1));
    }

    #[test]
    fn reduce_moves_sign_to_numerator() {
        let f = Fraction::new(2, -4).unwrap().reduced();
        assert_eq!((f.num(), f.den()), (-1, 2));
    }

    #[test]
    fn mixed_to_improper() {
        let m = MixedNumber::new(2, Fraction::new(3, 4).unwrap());
        assert_eq!(m.to_improper(), Ok(Fraction::new(11, 4).unwrap()));
        assert_eq!(m.to_string(), "2 3/4");
    }

    #[test]
    fn improper_overflow_is_an_error() {
        let m = MixedNumber::new(i64::MAX / 2, Fraction::new(1, 4).unwrap());
        assert_eq!(m.to_improper(), Err(FractionError::Overflow));
    }
}
