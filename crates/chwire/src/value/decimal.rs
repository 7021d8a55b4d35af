// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-point decimal stored as an unscaled integer and a scale.

use super::wide::{I256, U256};
use std::fmt;
use std::str::FromStr;

/// `unscaled * 10^-scale`.
///
/// Two decimals with equal numeric value but different scales are not equal
/// under `PartialEq`; use [`Decimal::rescale`] before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: I256,
    scale: u32,
}

/// Error returned by `Decimal::from_str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalParseError(String);

impl fmt::Display for DecimalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal '{}'", self.0)
    }
}

impl std::error::Error for DecimalParseError {}

impl Decimal {
    pub fn new(unscaled: I256, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    pub fn from_i128(unscaled: i128, scale: u32) -> Self {
        Self::new(I256::from_i128(unscaled), scale)
    }

    pub fn unscaled(&self) -> I256 {
        self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Change the scale. Growing the scale multiplies; shrinking rounds half
    /// away from zero. `None` when the result leaves the 256-bit range.
    pub fn rescale(&self, scale: u32) -> Option<Self> {
        let negative = self.unscaled.is_negative();
        let mut magnitude = self.unscaled.unsigned_abs();
        if scale >= self.scale {
            for _ in 0..scale - self.scale {
                magnitude = magnitude.checked_mul_small(10)?;
            }
        } else {
            let mut drop = self.scale - scale;
            // Truncate all but the last dropped digit, then round on it.
            while drop > 1 {
                let step = (drop - 1).min(19);
                magnitude = magnitude.div_rem_small(10u64.pow(step)).0;
                drop -= step;
            }
            let (q, digit) = magnitude.div_rem_small(10);
            magnitude = if digit >= 5 { q.checked_add_small(1)? } else { q };
        }
        let unscaled = I256::from_sign_magnitude(negative, magnitude)?;
        Some(Self::new(unscaled, scale))
    }

    /// True when `|unscaled| < 10^precision`.
    pub fn fits_precision(&self, precision: u32) -> bool {
        match U256::pow10(precision) {
            Some(limit) => self.unscaled.unsigned_abs() < limit,
            None => true,
        }
    }

    /// Exact decimal expansion of the shortest round-trip text of `v`,
    /// rounded to `scale`. `None` for NaN and infinities.
    pub fn from_f64(v: f64, scale: u32) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }
        let text = format!("{}", v);
        text.parse::<Decimal>().ok()?.rescale(scale)
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DecimalParseError(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        let digits = format!("{}{}", int_part, frac_part);
        let digits = if digits.is_empty() { "0".to_string() } else { digits };
        let magnitude: U256 = digits.parse().map_err(|_| err())?;
        let unscaled = I256::from_sign_magnitude(negative, magnitude).ok_or_else(err)?;
        let scale = u32::try_from(frac_part.len()).map_err(|_| err())?;
        Ok(Self::new(unscaled, scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let sign = if self.unscaled.is_negative() { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal")
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(dec("12.345"), Decimal::from_i128(12345, 3));
        assert_eq!(dec("-0.05"), Decimal::from_i128(-5, 2));
        assert_eq!(dec("7"), Decimal::from_i128(7, 0));
        assert_eq!(Decimal::from_i128(-5, 2).to_string(), "-0.05");
        assert_eq!(Decimal::from_i128(12345, 3).to_string(), "12.345");
        assert_eq!(Decimal::from_i128(0, 4).to_string(), "0.0000");
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("abc".parse::<Decimal>().is_err());
        assert!("-".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_rescale_rounds_half_away_from_zero() {
        assert_eq!(dec("1.25").rescale(1), Some(dec("1.3")));
        assert_eq!(dec("-1.25").rescale(1), Some(dec("-1.3")));
        assert_eq!(dec("1.24").rescale(1), Some(dec("1.2")));
        assert_eq!(dec("-1.249").rescale(0), Some(dec("-1")));
        assert_eq!(dec("2.5").rescale(0), Some(dec("3")));
        assert_eq!(dec("1.5").rescale(4), Some(dec("1.5000")));
    }

    #[test]
    fn test_rescale_drops_many_digits() {
        let v = dec("0.123456789012345678901234567895");
        assert_eq!(v.rescale(29), Some(dec("0.12345678901234567890123456790")));
        assert_eq!(v.rescale(0), Some(dec("0")));
    }

    #[test]
    fn test_fits_precision() {
        assert!(dec("999.99").fits_precision(5));
        assert!(!dec("1000.00").fits_precision(5));
        assert!(dec("-999.99").fits_precision(5));
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Decimal::from_f64(1.005, 2), Some(dec("1.01")));
        assert_eq!(Decimal::from_f64(-0.5, 0), Some(dec("-1")));
        assert_eq!(Decimal::from_f64(f64::NAN, 2), None);
        assert_eq!(dec("3.25").to_f64(), 3.25);
    }
}
