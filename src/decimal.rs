//! Precision rules for the fixed-point columns.
//!
//! Values are `rust_decimal::Decimal` and are stored as TEXT (`"6.9"`,
//! `"12.50"`), so what goes in is exactly what comes back out.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrecisionError {
    #[error("{value} does not fit {digits} digits with {places} decimal places")]
    OutOfRange {
        value: String,
        digits: u32,
        places: u32,
    },

    #[error("decimal overflow computing {0}")]
    Overflow(&'static str),
}

/// Total digits and decimal places of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    pub digits: u32,
    pub places: u32,
}

impl Precision {
    pub const fn new(digits: u32, places: u32) -> Self {
        Self { digits, places }
    }

    /// Round half away from zero to `places`, pad to exactly `places`, and
    /// reject values with more than `digits - places` integer digits.
    pub fn quantize(&self, value: Decimal) -> Result<Decimal, PrecisionError> {
        let out_of_range = || PrecisionError::OutOfRange {
            value: value.to_string(),
            digits: self.digits,
            places: self.places,
        };

        let limit = 10i64
            .checked_pow(self.digits - self.places)
            .map(Decimal::from)
            .ok_or_else(out_of_range)?;

        let mut quantized =
            value.round_dp_with_strategy(self.places, RoundingStrategy::MidpointAwayFromZero);
        if quantized.abs() >= limit {
            return Err(out_of_range());
        }
        quantized.rescale(self.places);
        Ok(quantized)
    }

    /// A whole number expressed in this column's precision (`7` -> `7.0`)
    pub fn from_int(&self, value: i64) -> Result<Decimal, PrecisionError> {
        self.quantize(Decimal::from(value))
    }
}

/// `part / whole * 100`, zero when `whole` is zero
pub fn percentage(part: i64, whole: i64, precision: Precision) -> Result<Decimal, PrecisionError> {
    if whole == 0 {
        return precision.quantize(Decimal::ZERO);
    }
    let ratio = Decimal::from(part)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(Decimal::from(whole)))
        .ok_or(PrecisionError::Overflow("percentage"))?;
    precision.quantize(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const HEIGHT: Precision = Precision::new(4, 1);
    const SECONDS: Precision = Precision::new(5, 2);

    #[test]
    fn test_quantize_pads_and_rounds() {
        assert_eq!(HEIGHT.from_int(7).unwrap().to_string(), "7.0");
        assert_eq!(HEIGHT.from_int(999).unwrap().to_string(), "999.0");
        let rounded = SECONDS.quantize(Decimal::from_str("12.345").unwrap()).unwrap();
        assert_eq!(rounded.to_string(), "12.35");
        let padded = SECONDS.quantize(Decimal::from_str("4.5").unwrap()).unwrap();
        assert_eq!(padded.to_string(), "4.50");
    }

    #[test]
    fn test_quantize_rejects_too_many_digits() {
        assert!(HEIGHT.from_int(1000).is_err());
        assert!(HEIGHT.from_int(-1000).is_err());
        assert!(HEIGHT.from_int(i64::MAX).is_err());
        // 999.96 rounds up to 1000.0
        assert!(HEIGHT.quantize(Decimal::from_str("999.96").unwrap()).is_err());
    }

    #[test]
    fn test_percentage() {
        let pct = Precision::new(5, 2);
        assert_eq!(percentage(1, 3, pct).unwrap().to_string(), "33.33");
        assert_eq!(percentage(2, 3, pct).unwrap().to_string(), "66.67");
        assert_eq!(percentage(151, 151, pct).unwrap().to_string(), "100.00");
        assert_eq!(percentage(5, 0, pct).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_percentage_overflow_is_an_error() {
        assert!(percentage(i64::MAX, 1, Precision::new(5, 2)).is_err());
    }
}
