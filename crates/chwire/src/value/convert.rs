// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cross-kind conversions between [`Value`] variants.
//!
//! All functions return `None` instead of coercing when the source cannot be
//! represented exactly (the decimal rescale being the one documented rounding).

use super::{Decimal, Value, I256, U256};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Sign and magnitude of any integer value (`Bool` counts as 0/1).
pub fn integer_parts(value: &Value) -> Option<(bool, U256)> {
    let signed = |v: i128| (v < 0, U256::from_u128(v.unsigned_abs()));
    match value {
        Value::Bool(v) => Some((false, U256::from(*v as u64))),
        Value::Int8(v) => Some(signed(*v as i128)),
        Value::Int16(v) => Some(signed(*v as i128)),
        Value::Int32(v) => Some(signed(*v as i128)),
        Value::Int64(v) => Some(signed(*v as i128)),
        Value::Int128(v) => Some(signed(*v)),
        Value::Int256(v) => Some((v.is_negative(), v.unsigned_abs())),
        Value::UInt8(v) => Some((false, U256::from(*v as u64))),
        Value::UInt16(v) => Some((false, U256::from(*v as u64))),
        Value::UInt32(v) => Some((false, U256::from(*v as u64))),
        Value::UInt64(v) => Some((false, U256::from(*v))),
        Value::UInt128(v) => Some((false, U256::from_u128(*v))),
        Value::UInt256(v) => Some((false, *v)),
        _ => None,
    }
}

/// Whether `(negative, magnitude)` fits an integer of `bits` width.
pub fn fits_integer(negative: bool, magnitude: &U256, bits: u32, signed: bool) -> bool {
    if magnitude.is_zero() {
        return true;
    }
    if negative {
        if !signed {
            return false;
        }
        // magnitude <= 2^(bits-1)
        let used = magnitude.bits();
        used < bits || (used == bits && is_power_of_two(magnitude))
    } else if signed {
        magnitude.bits() < bits
    } else {
        magnitude.bits() <= bits
    }
}

fn is_power_of_two(v: &U256) -> bool {
    let limbs = v.limbs();
    limbs.iter().map(|l| l.count_ones()).sum::<u32>() == 1
}

/// Two's complement bits of an integer known to fit.
pub fn integer_bits(negative: bool, magnitude: U256) -> U256 {
    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

/// Any integer value in `i128` range.
pub fn to_i128(value: &Value) -> Option<i128> {
    match value {
        Value::Int128(v) => Some(*v),
        Value::UInt128(v) => i128::try_from(*v).ok(),
        Value::Int256(v) => v.to_i128(),
        Value::UInt256(v) => v.to_u128().and_then(|v| i128::try_from(v).ok()),
        _ => {
            let (negative, magnitude) = integer_parts(value)?;
            let v = i128::try_from(magnitude.to_u128()?).ok()?;
            Some(if negative { -v } else { v })
        }
    }
}

/// Numeric value as `f64` (integers, floats and decimals).
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        Value::Decimal(d) => Some(d.to_f64()),
        Value::Int256(v) => v.to_string().parse().ok(),
        Value::UInt256(v) => v.to_string().parse().ok(),
        other => to_i128(other).map(|v| v as f64),
    }
}

/// Decimal at exactly `scale`: decimals are rescaled (half away from zero),
/// integers and floats are converted, strings are parsed.
pub fn to_decimal(value: &Value, scale: u32) -> Option<Decimal> {
    match value {
        Value::Decimal(d) => d.rescale(scale),
        Value::Float32(v) => Decimal::from_f64(*v as f64, scale),
        Value::Float64(v) => Decimal::from_f64(*v, scale),
        Value::String(s) => s.parse::<Decimal>().ok()?.rescale(scale),
        other => {
            let (negative, magnitude) = integer_parts(other)?;
            let unscaled = I256::from_sign_magnitude(negative, magnitude)?;
            Decimal::new(unscaled, 0).rescale(scale)
        }
    }
}

/// Calendar date of an instant as seen in `tz` (UTC when absent).
pub fn date_in_timezone(instant: DateTime<Utc>, tz: Option<&Tz>) -> NaiveDate {
    match tz {
        Some(tz) => instant.with_timezone(tz).date_naive(),
        None => instant.date_naive(),
    }
}

/// Date from a `Date` value or from an instant (`DateTime`) in `tz`.
pub fn to_date(value: &Value, tz: Option<&Tz>) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(date_in_timezone(*dt, tz)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Instant from a `DateTime`, a `Date` (midnight in `tz`) or integer seconds.
pub fn to_datetime(value: &Value, tz: Option<&Tz>) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(d) => {
            let midnight = d.and_hms_opt(0, 0, 0)?;
            match tz {
                Some(tz) => tz
                    .from_local_datetime(&midnight)
                    .earliest()
                    .map(|t| t.with_timezone(&Utc)),
                None => Some(midnight.and_utc()),
            }
        }
        other => {
            let secs = i64::try_from(to_i128(other)?).ok()?;
            DateTime::from_timestamp(secs, 0)
        }
    }
}
