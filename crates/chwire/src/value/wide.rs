// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! 256-bit integers for `Int256`, `UInt256` and `Decimal256` columns.
//!
//! Both types store four little-endian `u64` limbs. Only the operations the
//! codecs need are provided: byte conversion, comparison, multiply/divide by a
//! machine word and decimal text.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Unsigned 256-bit integer.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct U256([u64; 4]);

/// Signed 256-bit integer, two's complement.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct I256([u64; 4]);

/// Error returned by the `FromStr` impls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideParseError(&'static str);

impl fmt::Display for WideParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for WideParseError {}

const TEN_POW_19: u64 = 10_000_000_000_000_000_000;

impl U256 {
    pub const ZERO: Self = Self([0; 4]);
    pub const ONE: Self = Self([1, 0, 0, 0]);
    pub const MAX: Self = Self([u64::MAX; 4]);

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub const fn limbs(&self) -> [u64; 4] {
        self.0
    }

    pub fn from_u128(v: u128) -> Self {
        Self([v as u64, (v >> 64) as u64, 0, 0])
    }

    pub fn to_u128(self) -> Option<u128> {
        if self.0[2] != 0 || self.0[3] != 0 {
            return None;
        }
        Some(self.0[0] as u128 | ((self.0[1] as u128) << 64))
    }

    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            *limb = u64::from_le_bytes(word);
        }
        Self(limbs)
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    /// Number of significant bits (0 for zero).
    pub fn bits(&self) -> u32 {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return i as u32 * 64 + (64 - self.0[i].leading_zeros());
            }
        }
        0
    }

    pub fn checked_mul_small(self, m: u64) -> Option<Self> {
        let mut out = [0u64; 4];
        let mut carry: u128 = 0;
        for (i, limb) in self.0.iter().enumerate() {
            let product = (*limb as u128) * (m as u128) + carry;
            out[i] = product as u64;
            carry = product >> 64;
        }
        if carry != 0 {
            return None;
        }
        Some(Self(out))
    }

    pub fn checked_add_small(self, a: u64) -> Option<Self> {
        let mut out = self.0;
        let mut carry = a;
        for limb in out.iter_mut() {
            if carry == 0 {
                break;
            }
            let (sum, overflow) = limb.overflowing_add(carry);
            *limb = sum;
            carry = overflow as u64;
        }
        if carry != 0 {
            return None;
        }
        Some(Self(out))
    }

    /// Quotient and remainder of division by a non-zero machine word.
    pub fn div_rem_small(self, d: u64) -> (Self, u64) {
        debug_assert!(d != 0);
        let mut out = [0u64; 4];
        let mut rem: u128 = 0;
        for i in (0..4).rev() {
            let cur = (rem << 64) | self.0[i] as u128;
            out[i] = (cur / d as u128) as u64;
            rem = cur % d as u128;
        }
        (Self(out), rem as u64)
    }

    /// `10^exp`, or `None` when it does not fit in 256 bits.
    pub fn pow10(exp: u32) -> Option<Self> {
        let mut v = Self::ONE;
        for _ in 0..exp {
            v = v.checked_mul_small(10)?;
        }
        Some(v)
    }

    /// Two's complement negation modulo 2^256.
    pub fn wrapping_neg(self) -> Self {
        let mut out = [0u64; 4];
        let mut carry = 1u64;
        for (i, limb) in self.0.iter().enumerate() {
            let (sum, overflow) = (!limb).overflowing_add(carry);
            out[i] = sum;
            carry = overflow as u64;
        }
        Self(out)
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.pad("0");
        }
        let mut chunks = Vec::new();
        let mut v = *self;
        while !v.is_zero() {
            let (q, r) = v.div_rem_small(TEN_POW_19);
            chunks.push(r);
            v = q;
        }
        let mut s = String::new();
        for (i, chunk) in chunks.iter().rev().enumerate() {
            if i == 0 {
                s.push_str(&chunk.to_string());
            } else {
                s.push_str(&format!("{:019}", chunk));
            }
        }
        f.pad(&s)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl FromStr for U256 {
    type Err = WideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('+').unwrap_or(s);
        if digits.is_empty() {
            return Err(WideParseError("empty integer"));
        }
        let mut v = Self::ZERO;
        for b in digits.bytes() {
            if !b.is_ascii_digit() {
                return Err(WideParseError("invalid digit"));
            }
            v = v
                .checked_mul_small(10)
                .and_then(|v| v.checked_add_small((b - b'0') as u64))
                .ok_or(WideParseError("integer overflows 256 bits"))?;
        }
        Ok(v)
    }
}

impl From<u128> for U256 {
    fn from(v: u128) -> Self {
        Self::from_u128(v)
    }
}

impl From<u64> for U256 {
    fn from(v: u64) -> Self {
        Self([v, 0, 0, 0])
    }
}

impl I256 {
    pub const ZERO: Self = Self([0; 4]);
    pub const MIN: Self = Self([0, 0, 0, 1 << 63]);
    pub const MAX: Self = Self([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 1]);

    pub fn from_i128(v: i128) -> Self {
        let fill = if v < 0 { u64::MAX } else { 0 };
        Self([v as u64, (v >> 64) as u64, fill, fill])
    }

    pub fn to_i128(self) -> Option<i128> {
        let low = self.0[0] as u128 | ((self.0[1] as u128) << 64);
        let v = low as i128;
        let fill = if v < 0 { u64::MAX } else { 0 };
        if self.0[2] == fill && self.0[3] == fill {
            Some(v)
        } else {
            None
        }
    }

    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_le_bytes(bytes).0)
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        U256(self.0).to_le_bytes()
    }

    /// Raw two's complement bits.
    pub fn to_bits(self) -> U256 {
        U256(self.0)
    }

    pub fn from_bits(bits: U256) -> Self {
        Self(bits.0)
    }

    pub fn is_negative(&self) -> bool {
        self.0[3] >> 63 == 1
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    /// Magnitude; `MIN` maps to 2^255.
    pub fn unsigned_abs(self) -> U256 {
        if self.is_negative() {
            U256(self.0).wrapping_neg()
        } else {
            U256(self.0)
        }
    }

    /// Build from sign and magnitude; `None` when the result does not fit.
    pub fn from_sign_magnitude(negative: bool, magnitude: U256) -> Option<Self> {
        let limit = U256(Self::MIN.0);
        if negative {
            if magnitude > limit {
                return None;
            }
            Some(Self(magnitude.wrapping_neg().0))
        } else {
            if magnitude >= limit {
                return None;
            }
            Some(Self(magnitude.0))
        }
    }

    pub fn checked_neg(self) -> Option<Self> {
        if self == Self::MIN {
            None
        } else {
            Some(Self(U256(self.0).wrapping_neg().0))
        }
    }
}

impl Ord for I256 {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => U256(self.0).cmp(&U256(other.0)),
        }
    }
}

impl PartialOrd for I256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.unsigned_abs().to_string();
        if self.is_negative() {
            f.pad(&format!("-{}", magnitude))
        } else {
            f.pad(&magnitude)
        }
    }
}

impl fmt::Debug for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I256({})", self)
    }
}

impl FromStr for I256 {
    type Err = WideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.starts_with('+') || digits.starts_with('-') {
            return Err(WideParseError("invalid digit"));
        }
        let magnitude: U256 = digits.parse()?;
        Self::from_sign_magnitude(negative, magnitude)
            .ok_or(WideParseError("integer overflows 256 bits"))
    }
}

impl From<i128> for I256 {
    fn from(v: i128) -> Self {
        Self::from_i128(v)
    }
}

impl From<i64> for I256 {
    fn from(v: i64) -> Self {
        Self::from_i128(v as i128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_text_round_trip() {
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        let v: U256 = max.parse().expect("parse");
        assert_eq!(v, U256::MAX);
        assert_eq!(v.to_string(), max);
        assert!(format!("{}1", max).parse::<U256>().is_err());
        assert_eq!(U256::ZERO.to_string(), "0");
    }

    #[test]
    fn test_i256_bounds() {
        let min = "-57896044618658097711785492504343953926634992332820282019728792003956564819968";
        let max = "57896044618658097711785492504343953926634992332820282019728792003956564819967";
        assert_eq!(min.parse::<I256>().expect("min"), I256::MIN);
        assert_eq!(max.parse::<I256>().expect("max"), I256::MAX);
        assert_eq!(I256::MIN.to_string(), min);
        assert!("57896044618658097711785492504343953926634992332820282019728792003956564819968"
            .parse::<I256>()
            .is_err());
        assert!(I256::MIN.checked_neg().is_none());
    }

    #[test]
    fn test_i256_sign_extension_bytes() {
        let v = I256::from_i128(-2);
        let bytes = v.to_le_bytes();
        assert_eq!(bytes[0], 0xFE);
        assert!(bytes[1..].iter().all(|&b| b == 0xFF));
        assert_eq!(I256::from_le_bytes(bytes).to_i128(), Some(-2));
    }

    #[test]
    fn test_i256_ordering() {
        let a = I256::from_i128(-5);
        let b = I256::from_i128(3);
        assert!(a < b);
        assert!(I256::MIN < a);
        assert!(b < I256::MAX);
    }

    #[test]
    fn test_mul_div_small() {
        let v = U256::pow10(40).expect("fits");
        let (q, r) = v.div_rem_small(TEN_POW_19);
        assert_eq!(r, 0);
        assert_eq!(q, U256::pow10(21).expect("fits"));
        assert!(U256::pow10(77).is_some());
        assert!(U256::pow10(78).is_none());
        assert!(U256::MAX.checked_mul_small(2).is_none());
        assert!(U256::MAX.checked_add_small(1).is_none());
    }

    #[test]
    fn test_i128_conversions() {
        for v in [i128::MIN, -1, 0, 1, i128::MAX] {
            assert_eq!(I256::from_i128(v).to_i128(), Some(v));
        }
        assert_eq!(I256::MAX.to_i128(), None);
        assert_eq!(U256::from_u128(u128::MAX).to_u128(), Some(u128::MAX));
        assert_eq!(U256::from_u128(u128::MAX).bits(), 128);
    }
}
