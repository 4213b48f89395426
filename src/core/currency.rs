//! Exact Satoshi/Bitcoin conversion
//!
//! All monetary arithmetic goes through [`BigDecimal`]; binary floating
//! point never touches an amount. Scaling by 10^8 is done by shifting the
//! decimal exponent, so conversions are exact for every value up to the
//! total supply.

use bigdecimal::{BigDecimal, ToPrimitive};
use std::str::FromStr;
use thiserror::Error;

/// Satoshis per bitcoin
pub const SATOSHI_PER_BITCOIN: u64 = 100_000_000;

/// Decimal places between the two units
pub const BITCOIN_DECIMALS: i64 = 8;

/// Total supply expressed in satoshis
pub const MAX_SUPPLY_SATOSHI: u64 = 21_000_000 * SATOSHI_PER_BITCOIN;

/// Largest decimal exponent, either sign, accepted on input
pub const MAX_DECIMAL_EXPONENT: i64 = 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Not a number: '{0}'")]
    NotNumeric(String),
    #[error("Satoshi amount must be a whole number, got {0}")]
    NotIntegral(String),
    #[error("Amount is below one satoshi: {0}")]
    SubSatoshi(String),
    #[error("Amount must not be negative: {0}")]
    Negative(String),
    #[error("Amount out of range: {0}")]
    OutOfRange(String),
}

// =============================================================================
// Input
// =============================================================================

/// Anything a caller may hand in as an amount: integers, decimal strings
/// or decimals.
pub trait MonetaryInput {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError>;
}

impl MonetaryInput for u64 {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError> {
        Ok(BigDecimal::from(*self))
    }
}

impl MonetaryInput for i64 {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError> {
        Ok(BigDecimal::from(*self))
    }
}

impl MonetaryInput for u32 {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError> {
        Ok(BigDecimal::from(*self))
    }
}

impl MonetaryInput for str {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError> {
        let trimmed = self.trim();
        if trimmed.is_empty() {
            return Err(ConversionError::NotNumeric(self.to_string()));
        }
        BigDecimal::from_str(trimmed).map_err(|_| ConversionError::NotNumeric(self.to_string()))
    }
}

impl MonetaryInput for &str {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError> {
        (**self).to_decimal()
    }
}

impl MonetaryInput for String {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError> {
        self.as_str().to_decimal()
    }
}

impl MonetaryInput for BigDecimal {
    fn to_decimal(&self) -> Result<BigDecimal, ConversionError> {
        Ok(self.clone())
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Convert satoshis to bitcoin: exact division by 10^8.
///
/// Fails for non-numeric input and for fractional satoshi amounts.
pub fn to_bitcoin<T: MonetaryInput + ?Sized>(satoshi: &T) -> Result<BigDecimal, ConversionError> {
    let value = bounded(satoshi.to_decimal()?)?;
    if !value.is_integer() {
        return Err(ConversionError::NotIntegral(value.to_string()));
    }
    Ok(shift(&value, -BITCOIN_DECIMALS))
}

/// Convert bitcoin to satoshis: exact multiplication by 10^8.
///
/// The result must be a whole, non-negative satoshi count that fits `u64`.
pub fn to_satoshi<T: MonetaryInput + ?Sized>(bitcoin: &T) -> Result<u64, ConversionError> {
    let value = bounded(bitcoin.to_decimal()?)?;
    let satoshi = shift(&value, BITCOIN_DECIMALS);

    if !satoshi.is_integer() {
        return Err(ConversionError::SubSatoshi(value.to_string()));
    }
    if satoshi < BigDecimal::from(0) {
        return Err(ConversionError::Negative(value.to_string()));
    }
    satoshi
        .to_u64()
        .ok_or_else(|| ConversionError::OutOfRange(value.to_string()))
}

/// Fee for a transaction of `size_bytes` at `sat_per_byte`, saturating
/// instead of wrapping.
pub fn estimate_fee(size_bytes: u64, sat_per_byte: u64) -> u64 {
    size_bytes.saturating_mul(sat_per_byte)
}

// Exponent notation can carry any scale; past the bound, is_integer and
// to_u64 would build 10^scale.
fn bounded(value: BigDecimal) -> Result<BigDecimal, ConversionError> {
    let (digits, scale) = value.as_bigint_and_exponent();
    if scale.abs() > MAX_DECIMAL_EXPONENT {
        return Err(ConversionError::OutOfRange(format!("{digits}e{}", -scale)));
    }
    Ok(value)
}

/// Multiply by 10^places by moving the decimal exponent
fn shift(value: &BigDecimal, places: i64) -> BigDecimal {
    let (digits, scale) = value.as_bigint_and_exponent();
    BigDecimal::new(digits, scale - places).normalized()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_bitcoin() {
        assert_eq!(to_bitcoin(&150_000_000u64).unwrap(), dec("1.5"));
        assert_eq!(to_bitcoin("100000000").unwrap(), dec("1"));
        assert_eq!(to_bitcoin(&1u64).unwrap(), dec("0.00000001"));
        assert_eq!(to_bitcoin(&0u64).unwrap(), dec("0"));
        assert_eq!(to_bitcoin(&MAX_SUPPLY_SATOSHI).unwrap(), dec("21000000"));
    }

    #[test]
    fn test_to_bitcoin_rejects() {
        assert!(matches!(to_bitcoin("1.5"), Err(ConversionError::NotIntegral(_))));
        assert!(matches!(to_bitcoin("abc"), Err(ConversionError::NotNumeric(_))));
        assert!(matches!(to_bitcoin(""), Err(ConversionError::NotNumeric(_))));
        // Integral value spelled with a fraction is still whole
        assert_eq!(to_bitcoin("200000000.000").unwrap(), dec("2"));
    }

    #[test]
    fn test_to_satoshi() {
        assert_eq!(to_satoshi("0.00000001").unwrap(), 1);
        assert_eq!(to_satoshi("1.5").unwrap(), 150_000_000);
        assert_eq!(to_satoshi(" 21000000 ").unwrap(), MAX_SUPPLY_SATOSHI);
        assert_eq!(to_satoshi(&dec("0.12345678")).unwrap(), 12_345_678);
        assert_eq!(to_satoshi(&3u64).unwrap(), 300_000_000);
    }

    #[test]
    fn test_to_satoshi_rejects() {
        assert!(matches!(to_satoshi("one"), Err(ConversionError::NotNumeric(_))));
        assert!(matches!(to_satoshi("0.000000001"), Err(ConversionError::SubSatoshi(_))));
        assert!(matches!(to_satoshi("-1"), Err(ConversionError::Negative(_))));
        assert!(matches!(
            to_satoshi("1000000000000000"),
            Err(ConversionError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_huge_exponents_rejected() {
        for input in ["1e1000000000", "1e-1000000000", "1E41", "-7e-999999999"] {
            assert!(
                matches!(to_satoshi(input), Err(ConversionError::OutOfRange(_))),
                "to_satoshi({input})"
            );
            assert!(
                matches!(to_bitcoin(input), Err(ConversionError::OutOfRange(_))),
                "to_bitcoin({input})"
            );
        }
        // Modest exponents still convert
        assert_eq!(to_satoshi("15e-1").unwrap(), 150_000_000);
        assert_eq!(to_bitcoin("1e8").unwrap(), dec("1"));
    }

    #[test]
    fn test_round_trip_across_supply() {
        let samples = [
            0u64,
            1,
            9,
            99_999_999,
            100_000_000,
            123_456_789_012_345,
            MAX_SUPPLY_SATOSHI - 1,
            MAX_SUPPLY_SATOSHI,
        ];
        for s in samples {
            assert_eq!(to_satoshi(&to_bitcoin(&s).unwrap()).unwrap(), s, "s={s}");
        }

        // Walk the range with a large odd stride
        let mut s = 0u64;
        while s <= MAX_SUPPLY_SATOSHI {
            assert_eq!(to_satoshi(&to_bitcoin(&s).unwrap()).unwrap(), s);
            s += 7_777_777_777_777;
        }
    }

    #[test]
    fn test_estimate_fee() {
        assert_eq!(estimate_fee(250, 10), 2500);
        assert_eq!(estimate_fee(0, 10), 0);
        assert_eq!(estimate_fee(u64::MAX, 2), u64::MAX);
        assert_eq!(estimate_fee(u64::MAX / 2 + 1, 2), u64::MAX);
    }
}
