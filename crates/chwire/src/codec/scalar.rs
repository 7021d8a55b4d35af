// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-layout scalar codecs.

use super::source::{read_array, ByteSource};
use super::varint::write_varint;
use super::{mismatch, CodecOptions};
use crate::error::{CodecError, Result};
use crate::types::{DataKind, TypeNode};
use crate::value::{convert, Decimal, Value, I256, U256};
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use uuid::Uuid;

fn overflow(node: &TypeNode, value: impl ToString) -> crate::error::Error {
    CodecError::Overflow {
        type_name: node.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn out_of_range(node: &TypeNode, value: impl ToString) -> crate::error::Error {
    CodecError::OutOfRange {
        type_name: node.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Widen a little-endian integer of `width` bytes to 32 bytes.
fn sign_extend(bytes: &[u8], signed: bool) -> [u8; 32] {
    let negative = signed && bytes.last().is_some_and(|b| b & 0x80 != 0);
    let mut out = [if negative { 0xFF } else { 0 }; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

// ---------------------------------------------------------------------------
// Bool and integers
// ---------------------------------------------------------------------------

pub(super) fn encode_bool(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let b = match value {
        Value::Bool(b) => *b,
        other => match convert::to_i128(other) {
            Some(0) => false,
            Some(1) => true,
            Some(v) => return Err(out_of_range(node, v)),
            None => return Err(mismatch(node, other)),
        },
    };
    w.write_u8(b as u8)?;
    Ok(())
}

pub(super) fn decode_bool(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    match src.read_u8()? {
        0 => Ok(Value::Bool(false)),
        1 => Ok(Value::Bool(true)),
        other => Err(out_of_range(node, other)),
    }
}

pub(super) fn encode_integer(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let (bits, signed) = node
        .kind()
        .integer_layout()
        .ok_or_else(|| CodecError::UnsupportedType(node.to_string()))?;
    let (negative, magnitude) = convert::integer_parts(value).ok_or_else(|| mismatch(node, value))?;
    if !convert::fits_integer(negative, &magnitude, bits, signed) {
        return Err(overflow(node, value));
    }
    let bytes = convert::integer_bits(negative, magnitude).to_le_bytes();
    w.write_all(&bytes[..(bits / 8) as usize])?;
    Ok(())
}

pub(super) fn decode_integer(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    Ok(match node.kind() {
        DataKind::Int8 => Value::Int8(i8::from_le_bytes(read_array(src)?)),
        DataKind::Int16 => Value::Int16(i16::from_le_bytes(read_array(src)?)),
        DataKind::Int32 => Value::Int32(i32::from_le_bytes(read_array(src)?)),
        DataKind::Int64 => Value::Int64(i64::from_le_bytes(read_array(src)?)),
        DataKind::Int128 => Value::Int128(i128::from_le_bytes(read_array(src)?)),
        DataKind::Int256 => Value::Int256(I256::from_le_bytes(read_array(src)?)),
        DataKind::UInt8 => Value::UInt8(src.read_u8()?),
        DataKind::UInt16 => Value::UInt16(u16::from_le_bytes(read_array(src)?)),
        DataKind::UInt32 => Value::UInt32(u32::from_le_bytes(read_array(src)?)),
        DataKind::UInt64 => Value::UInt64(u64::from_le_bytes(read_array(src)?)),
        DataKind::UInt128 => Value::UInt128(u128::from_le_bytes(read_array(src)?)),
        DataKind::UInt256 => Value::UInt256(U256::from_le_bytes(read_array(src)?)),
        _ => return Err(CodecError::UnsupportedType(node.to_string()).into()),
    })
}

// ---------------------------------------------------------------------------
// Floats
// ---------------------------------------------------------------------------

/// Numeric value as `f64` when the conversion is exact.
fn exact_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        other => {
            let v = convert::to_i128(other)?;
            let f = v as f64;
            // `as` saturates, so 2^127 would read back as i128::MAX.
            (f < -(i128::MIN as f64) && f as i128 == v).then_some(f)
        }
    }
}

pub(super) fn encode_float(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let v = exact_f64(value).ok_or_else(|| mismatch(node, value))?;
    if node.kind() == DataKind::Float32 {
        let narrow = v as f32;
        if v.is_finite() && narrow as f64 != v {
            return Err(overflow(node, value));
        }
        w.write_u32::<LittleEndian>(narrow.to_bits())?;
    } else {
        w.write_u64::<LittleEndian>(v.to_bits())?;
    }
    Ok(())
}

pub(super) fn decode_float(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    if node.kind() == DataKind::Float32 {
        Ok(Value::Float32(f32::from_bits(u32::from_le_bytes(read_array(src)?))))
    } else {
        Ok(Value::Float64(f64::from_bits(u64::from_le_bytes(read_array(src)?))))
    }
}

// ---------------------------------------------------------------------------
// Decimals
// ---------------------------------------------------------------------------

pub(super) fn encode_decimal(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    // Unparsable or non-finite input is a type error; only a value that
    // parses but does not fit is an overflow.
    let parsed;
    let source = match value {
        Value::String(s) => {
            parsed = Value::Decimal(s.parse().map_err(|_| mismatch(node, value))?);
            &parsed
        }
        Value::Float32(v) if !v.is_finite() => return Err(mismatch(node, value)),
        Value::Float64(v) if !v.is_finite() => return Err(mismatch(node, value)),
        Value::Decimal(_) | Value::Float32(_) | Value::Float64(_) => value,
        other if convert::integer_parts(other).is_some() => other,
        other => return Err(mismatch(node, other)),
    };
    let decimal = convert::to_decimal(source, node.scale()).ok_or_else(|| overflow(node, value))?;
    if !decimal.fits_precision(node.precision()) {
        return Err(overflow(node, value));
    }
    let bytes = decimal.unscaled().to_le_bytes();
    w.write_all(&bytes[..node.decimal_width()])?;
    Ok(())
}

pub(super) fn decode_decimal(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    let mut raw = [0u8; 32];
    let width = node.decimal_width();
    src.read_exact(&mut raw[..width])?;
    let unscaled = I256::from_le_bytes(sign_extend(&raw[..width], true));
    Ok(Value::Decimal(Decimal::new(unscaled, node.scale())))
}

// ---------------------------------------------------------------------------
// Dates and times
// ---------------------------------------------------------------------------

fn date_of(node: &TypeNode, value: &Value, opts: &CodecOptions) -> Result<NaiveDate> {
    convert::to_date(value, opts.default_timezone.as_ref()).ok_or_else(|| mismatch(node, value))
}

pub(super) fn encode_date(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    let date = date_of(node, value, opts)?;
    let days = date.signed_duration_since(epoch()).num_days();
    let days = u16::try_from(days).map_err(|_| out_of_range(node, date))?;
    w.write_u16::<LittleEndian>(days)?;
    Ok(())
}

pub(super) fn decode_date(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    let days = u16::from_le_bytes(read_array(src)?);
    epoch()
        .checked_add_signed(chrono::Duration::days(days as i64))
        .map(Value::Date)
        .ok_or_else(|| out_of_range(node, days))
}

fn date32_bounds() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default(),
        NaiveDate::from_ymd_opt(2299, 12, 31).unwrap_or_default(),
    )
}

pub(super) fn encode_date32(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    let date = date_of(node, value, opts)?;
    let (min, max) = date32_bounds();
    if date < min || date > max {
        return Err(out_of_range(node, date));
    }
    let days = date.signed_duration_since(epoch()).num_days() as i32;
    w.write_i32::<LittleEndian>(days)?;
    Ok(())
}

pub(super) fn decode_date32(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    let days = i32::from_le_bytes(read_array(src)?);
    let date = epoch()
        .checked_add_signed(chrono::Duration::days(days as i64))
        .ok_or_else(|| out_of_range(node, days))?;
    let (min, max) = date32_bounds();
    if date < min || date > max {
        return Err(out_of_range(node, date));
    }
    Ok(Value::Date(date))
}

fn column_timezone(node: &TypeNode, opts: &CodecOptions) -> Result<Option<Tz>> {
    match node.timezone() {
        Some(name) => Tz::from_str(name)
            .map(Some)
            .map_err(|_| CodecError::InvalidTimezone(name.to_string()).into()),
        None => Ok(opts.default_timezone),
    }
}

/// `seconds * 10^scale + nanos / 10^(9 - scale)`.
///
/// `DateTime::timestamp()` floors toward negative infinity and the
/// sub-second part is always non-negative, so pre-epoch instants need no
/// extra borrow here.
pub(crate) fn instant_to_ticks(instant: &DateTime<Utc>, scale: u32) -> Option<i64> {
    let secs = instant.timestamp();
    let nanos = instant.timestamp_subsec_nanos() as i64;
    let sub = nanos / 10i64.pow(9 - scale);
    secs.checked_mul(10i64.pow(scale))?.checked_add(sub)
}

/// Inverse of [`instant_to_ticks`]; Euclidean division keeps the sub-second
/// remainder non-negative for pre-epoch ticks.
pub(crate) fn ticks_to_instant(ticks: i64, scale: u32) -> Option<DateTime<Utc>> {
    let unit = 10i64.pow(scale);
    let secs = ticks.div_euclid(unit);
    let nanos = ticks.rem_euclid(unit) * 10i64.pow(9 - scale);
    DateTime::from_timestamp(secs, nanos as u32)
}

pub(super) fn encode_datetime(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    let tz = column_timezone(node, opts)?;
    let instant = convert::to_datetime(value, tz.as_ref()).ok_or_else(|| mismatch(node, value))?;
    let ticks = instant_to_ticks(&instant, 0).ok_or_else(|| out_of_range(node, instant))?;
    let secs = u32::try_from(ticks).map_err(|_| out_of_range(node, instant))?;
    w.write_u32::<LittleEndian>(secs)?;
    Ok(())
}

pub(super) fn decode_datetime(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    let secs = u32::from_le_bytes(read_array(src)?);
    ticks_to_instant(secs as i64, 0)
        .map(Value::DateTime)
        .ok_or_else(|| out_of_range(node, secs))
}

pub(super) fn encode_datetime64(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    opts: &CodecOptions,
) -> Result<()> {
    if node.scale() > 9 {
        return Err(CodecError::InvalidScale {
            type_name: node.to_string(),
            scale: node.scale(),
        }
        .into());
    }
    let tz = column_timezone(node, opts)?;
    let instant = convert::to_datetime(value, tz.as_ref()).ok_or_else(|| mismatch(node, value))?;
    let ticks = instant_to_ticks(&instant, node.scale()).ok_or_else(|| out_of_range(node, instant))?;
    w.write_i64::<LittleEndian>(ticks)?;
    Ok(())
}

pub(super) fn decode_datetime64(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    if node.scale() > 9 {
        return Err(CodecError::InvalidScale {
            type_name: node.to_string(),
            scale: node.scale(),
        }
        .into());
    }
    let ticks = i64::from_le_bytes(read_array(src)?);
    ticks_to_instant(ticks, node.scale())
        .map(Value::DateTime)
        .ok_or_else(|| out_of_range(node, ticks))
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

pub(super) fn encode_enum(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let values = node
        .enum_values()
        .ok_or_else(|| CodecError::UnsupportedType(node.to_string()))?;
    let ordinal = match value {
        Value::Enum(_, name) | Value::String(name) => {
            values
                .value_of(name)
                .ok_or_else(|| CodecError::UnknownEnumName {
                    type_name: node.to_string(),
                    name: name.clone(),
                })?
        }
        other => {
            let v = convert::to_i128(other).ok_or_else(|| mismatch(node, other))?;
            i16::try_from(v)
                .ok()
                .filter(|v| values.name_of(*v).is_some())
                .ok_or_else(|| CodecError::UnknownEnumValue {
                    type_name: node.to_string(),
                    value: v.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
                })?
        }
    };
    if node.kind() == DataKind::Enum8 {
        let narrow = i8::try_from(ordinal).map_err(|_| overflow(node, ordinal))?;
        w.write_i8(narrow)?;
    } else {
        w.write_i16::<LittleEndian>(ordinal)?;
    }
    Ok(())
}

pub(super) fn decode_enum(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    let ordinal = if node.kind() == DataKind::Enum8 {
        i8::from_le_bytes(read_array(src)?) as i16
    } else {
        i16::from_le_bytes(read_array(src)?)
    };
    let name = node
        .enum_values()
        .and_then(|values| values.name_of(ordinal))
        .ok_or_else(|| CodecError::UnknownEnumValue {
            type_name: node.to_string(),
            value: ordinal as i64,
        })?;
    Ok(Value::Enum(ordinal, name.to_string()))
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

pub(super) fn encode_string(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let bytes = value.as_bytes().ok_or_else(|| mismatch(node, value))?;
    write_varint(w, bytes.len() as u64)?;
    w.write_all(bytes)?;
    Ok(())
}

pub(super) fn decode_string(
    _node: &TypeNode,
    src: &mut dyn ByteSource,
    opts: &CodecOptions,
) -> Result<Value> {
    let length = src.read_varint()?;
    let len = usize::try_from(length)
        .ok()
        .filter(|len| *len <= opts.max_string_length)
        .ok_or(CodecError::StringTooLong {
            length,
            limit: opts.max_string_length,
        })?;
    let bytes = src.read_vec(len)?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => Value::String(s),
        Err(e) => Value::Bytes(e.into_bytes()),
    })
}

pub(super) fn encode_fixed_string(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let bytes = value.as_bytes().ok_or_else(|| mismatch(node, value))?;
    let n = node.fixed_length();
    if bytes.len() > n {
        return Err(CodecError::FixedLengthMismatch {
            type_name: node.to_string(),
            expected: n,
            actual: bytes.len(),
        }
        .into());
    }
    w.write_all(bytes)?;
    w.write_all(&vec![0u8; n - bytes.len()])?;
    Ok(())
}

pub(super) fn decode_fixed_string(
    node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    Ok(Value::Bytes(src.read_vec(node.fixed_length())?))
}

// ---------------------------------------------------------------------------
// UUID and addresses
// ---------------------------------------------------------------------------

pub(super) fn encode_uuid(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let uuid = match value {
        Value::Uuid(u) => *u,
        Value::String(s) => Uuid::parse_str(s).map_err(|_| mismatch(node, value))?,
        other => return Err(mismatch(node, other)),
    };
    let bits = uuid.as_u128();
    w.write_u64::<LittleEndian>((bits >> 64) as u64)?;
    w.write_u64::<LittleEndian>(bits as u64)?;
    Ok(())
}

pub(super) fn decode_uuid(
    _node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    let high = u64::from_le_bytes(read_array(src)?);
    let low = u64::from_le_bytes(read_array(src)?);
    Ok(Value::Uuid(Uuid::from_u128(((high as u128) << 64) | low as u128)))
}

pub(super) fn encode_ipv4(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let addr = match value {
        Value::Ipv4(a) => *a,
        Value::String(s) => s.parse().map_err(|_| mismatch(node, value))?,
        Value::UInt32(v) => Ipv4Addr::from(*v),
        other => return Err(mismatch(node, other)),
    };
    w.write_u32::<LittleEndian>(u32::from(addr))?;
    Ok(())
}

pub(super) fn decode_ipv4(
    _node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    Ok(Value::Ipv4(Ipv4Addr::from(u32::from_le_bytes(read_array(src)?))))
}

pub(super) fn encode_ipv6(
    node: &TypeNode,
    value: &Value,
    w: &mut dyn Write,
    _opts: &CodecOptions,
) -> Result<()> {
    let addr = match value {
        Value::Ipv6(a) => *a,
        Value::Ipv4(a) => a.to_ipv6_mapped(),
        Value::String(s) => s.parse().map_err(|_| mismatch(node, value))?,
        other => return Err(mismatch(node, other)),
    };
    w.write_all(&addr.octets())?;
    Ok(())
}

pub(super) fn decode_ipv6(
    _node: &TypeNode,
    src: &mut dyn ByteSource,
    _opts: &CodecOptions,
) -> Result<Value> {
    Ok(Value::Ipv6(Ipv6Addr::from(read_array::<16, _>(src)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_value, encode_value, SliceSource};
    use crate::error::Error;
    use crate::types::parse_type;
    use chrono::{NaiveDateTime, TimeZone};

    fn encode(decl: &str, value: Value) -> Result<Vec<u8>> {
        let node = parse_type(decl).expect("parse");
        let mut buf = Vec::new();
        encode_value(&node, &value, &mut buf, &CodecOptions::default())?;
        Ok(buf)
    }

    fn round_trip(decl: &str, value: Value) -> Value {
        let node = parse_type(decl).expect("parse");
        let bytes = encode(decl, value).expect("encode");
        let mut src = SliceSource::new(&bytes);
        let decoded = decode_value(&node, &mut src, &CodecOptions::default()).expect("decode");
        assert!(src.is_eof(), "{decl}: trailing bytes");
        decoded
    }

    fn utc(s: &str) -> DateTime<Utc> {
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").expect("datetime");
        Utc.from_utc_datetime(&naive)
    }

    #[test]
    fn test_integer_boundaries() {
        let cases = [
            ("Int8", Value::Int8(i8::MIN)),
            ("Int8", Value::Int8(i8::MAX)),
            ("Int16", Value::Int16(i16::MIN)),
            ("Int32", Value::Int32(i32::MIN)),
            ("Int64", Value::Int64(i64::MIN)),
            ("Int128", Value::Int128(i128::MIN)),
            ("Int128", Value::Int128(i128::MAX)),
            ("Int256", Value::Int256(I256::MIN)),
            ("Int256", Value::Int256(I256::MAX)),
            ("UInt8", Value::UInt8(u8::MAX)),
            ("UInt64", Value::UInt64(u64::MAX)),
            ("UInt128", Value::UInt128(u128::MAX)),
            ("UInt256", Value::UInt256(U256::MAX)),
        ];
        for (decl, value) in cases {
            assert_eq!(round_trip(decl, value.clone()), value, "{decl}");
        }
    }

    #[test]
    fn test_integer_widening_and_overflow() {
        assert_eq!(encode("Int256", Value::Int8(-1)).expect("enc"), vec![0xFF; 32]);
        assert_eq!(encode("UInt16", Value::Int64(513)).expect("enc"), vec![1, 2]);
        let err = encode("UInt8", Value::UInt16(256)).unwrap_err();
        assert_eq!(err.to_string(), "codec error: value 256 overflows UInt8");
        assert!(encode("UInt32", Value::Int8(-1)).is_err());
        assert!(encode("Int128", Value::UInt128(u128::MAX)).is_err());
        assert!(encode("Int8", Value::from("1")).is_err());
    }

    #[test]
    fn test_int128_two_complement_layout() {
        let bytes = encode("Int128", Value::Int128(-2)).expect("enc");
        assert_eq!(bytes[0], 0xFE);
        assert!(bytes[1..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_float_bit_patterns() {
        assert_eq!(encode("Float32", Value::Float32(1.0)).expect("enc"), 1.0f32.to_le_bytes());
        assert_eq!(encode("Float64", Value::Float64(-0.0)).expect("enc"), (-0.0f64).to_le_bytes());
        let nan = round_trip("Float64", Value::Float64(f64::NAN));
        assert!(nan.as_f64().is_some_and(f64::is_nan));
        assert!(encode("Float32", Value::Float64(0.1)).is_err());
        assert_eq!(encode("Float64", Value::Int32(3)).expect("enc"), 3.0f64.to_le_bytes());
    }

    #[test]
    fn test_decimal_widths_and_rounding() {
        assert_eq!(encode("Decimal(9, 2)", Value::from("1.005")).expect("enc"), 101i32.to_le_bytes());
        assert_eq!(encode("Decimal(18, 0)", Value::Int64(-5)).expect("enc"), (-5i64).to_le_bytes());
        assert_eq!(encode("Decimal128(9)", Value::from("-0.000000001")).expect("enc"), (-1i128).to_le_bytes());
        assert_eq!(encode("Decimal(76, 0)", Value::Int8(1)).expect("enc").len(), 32);
        assert!(encode("Decimal(5, 2)", Value::from("1000.00")).is_err());
        assert!(encode("Decimal(5, 2)", Value::from("999.994")).is_ok());
        assert!(encode("Decimal(5, 2)", Value::from("999.995")).is_err());
    }

    #[test]
    fn test_decimal_parse_failure_is_type_mismatch() {
        for bad in [Value::from("abc"), Value::from("1.2.3"), Value::Float64(f64::NAN)] {
            let err = encode("Decimal(9, 2)", bad).unwrap_err();
            assert!(
                matches!(err, Error::Codec(CodecError::TypeMismatch { .. })),
                "{err}"
            );
        }
        let err = encode("Decimal(9, 2)", Value::from("99999999999")).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::Overflow { .. })), "{err}");
    }

    #[test]
    fn test_float_rejects_saturated_wide_integer() {
        assert!(encode("Float64", Value::Int128(i128::MAX)).is_err());
        assert!(encode("Float64", Value::UInt128(1u128 << 127)).is_err());
        assert_eq!(
            encode("Float64", Value::Int128(i128::MIN)).expect("enc"),
            (i128::MIN as f64).to_le_bytes()
        );
        assert_eq!(
            encode("Float64", Value::Int128(1i128 << 100)).expect("enc"),
            2f64.powi(100).to_le_bytes()
        );
    }

    #[test]
    fn test_decimal_round_trip_scale_0_and_9() {
        for (decl, text) in [("Decimal(9, 0)", "-999999999"), ("Decimal(18, 9)", "123456789.123456789")] {
            let value = Value::Decimal(text.parse().expect("decimal"));
            assert_eq!(round_trip(decl, value.clone()), value);
        }
    }

    #[test]
    fn test_date_ranges() {
        let min = NaiveDate::from_ymd_opt(1970, 1, 1).expect("date");
        let max = NaiveDate::from_ymd_opt(2149, 6, 6).expect("date");
        assert_eq!(round_trip("Date", Value::Date(max)), Value::Date(max));
        assert_eq!(encode("Date", Value::Date(min)).expect("enc"), [0, 0]);
        assert!(encode("Date", Value::Date(max.succ_opt().expect("next"))).is_err());
        assert!(encode("Date", Value::Date(min.pred_opt().expect("prev"))).is_err());

        let old = NaiveDate::from_ymd_opt(1900, 1, 1).expect("date");
        assert_eq!(round_trip("Date32", Value::Date(old)), Value::Date(old));
        assert_eq!(encode("Date32", Value::Date(old)).expect("enc"), (-25567i32).to_le_bytes());
        assert!(encode("Date32", Value::Date(old.pred_opt().expect("prev"))).is_err());
    }

    #[test]
    fn test_date_from_instant_uses_default_timezone() {
        let node = parse_type("Date").expect("parse");
        let instant = DateTime::from_timestamp(86_400 - 3_600, 0).expect("ts");
        let opts = CodecOptions {
            default_timezone: Some(chrono_tz::Asia::Tokyo),
            ..CodecOptions::default()
        };
        let mut buf = Vec::new();
        encode_value(&node, &Value::DateTime(instant), &mut buf, &opts).expect("encode");
        assert_eq!(buf, [1, 0]);
        buf.clear();
        encode_value(&node, &Value::DateTime(instant), &mut buf, &CodecOptions::default())
            .expect("encode");
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn test_datetime_seconds() {
        let t = utc("2024-02-29 12:00:00.750");
        assert_eq!(encode("DateTime", Value::DateTime(t)).expect("enc"), 1_709_208_000u32.to_le_bytes());
        assert!(encode("DateTime", Value::DateTime(utc("1969-12-31 23:59:59"))).is_err());
        let max = DateTime::from_timestamp(u32::MAX as i64, 0).expect("ts");
        assert_eq!(round_trip("DateTime('UTC')", Value::DateTime(max)), Value::DateTime(max));
    }

    #[test]
    fn test_datetime64_pre_epoch_subsecond() {
        let t = utc("1969-12-31 23:59:59.999");
        let bytes = encode("DateTime64(3)", Value::DateTime(t)).expect("enc");
        assert_eq!(bytes, (-1i64).to_le_bytes());
        assert_eq!(round_trip("DateTime64(3)", Value::DateTime(t)), Value::DateTime(t));

        let t = utc("1969-12-31 23:59:58.5");
        assert_eq!(encode("DateTime64(1)", Value::DateTime(t)).expect("enc"), (-15i64).to_le_bytes());
        assert_eq!(round_trip("DateTime64(1)", Value::DateTime(t)), Value::DateTime(t));
    }

    #[test]
    fn test_datetime64_truncates_below_scale() {
        let t = utc("2001-02-03 04:05:06.123456789");
        let decoded = round_trip("DateTime64(6, 'UTC')", Value::DateTime(t));
        assert_eq!(decoded, Value::DateTime(utc("2001-02-03 04:05:06.123456")));
        let nanos = round_trip("DateTime64(9)", Value::DateTime(t));
        assert_eq!(nanos, Value::DateTime(t));
    }

    #[test]
    fn test_enum_by_name_and_ordinal() {
        let decl = "Enum8('a' = 1, 'b' = -2)";
        assert_eq!(encode(decl, Value::from("b")).expect("enc"), [0xFE]);
        assert_eq!(encode(decl, Value::Int8(1)).expect("enc"), [1]);
        assert_eq!(round_trip(decl, Value::from("a")), Value::Enum(1, "a".into()));
        assert!(matches!(
            encode(decl, Value::from("c")),
            Err(Error::Codec(CodecError::UnknownEnumName { .. }))
        ));
        assert!(matches!(
            encode(decl, Value::Int8(3)),
            Err(Error::Codec(CodecError::UnknownEnumValue { value: 3, .. }))
        ));
        let node = parse_type(decl).expect("parse");
        let err = decode_value(&node, &mut SliceSource::new(&[9]), &CodecOptions::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_enum16_layout() {
        let bytes = encode("Enum16('x' = -300)", Value::from("x")).expect("enc");
        assert_eq!(bytes, (-300i16).to_le_bytes());
    }

    #[test]
    fn test_strings() {
        assert_eq!(encode("String", Value::from("hi")).expect("enc"), [2, b'h', b'i']);
        assert_eq!(round_trip("String", Value::from("")), Value::from(""));
        let long = "x".repeat(300);
        let bytes = encode("String", Value::from(long.as_str())).expect("enc");
        assert_eq!(&bytes[..2], &[0xAC, 0x02]);
        assert_eq!(round_trip("String", Value::Bytes(vec![0xFF, 0xFE])), Value::Bytes(vec![0xFF, 0xFE]));
    }

    #[test]
    fn test_string_length_limit() {
        let node = parse_type("String").expect("parse");
        let opts = CodecOptions {
            max_string_length: 4,
            ..CodecOptions::default()
        };
        let err = decode_value(&node, &mut SliceSource::new(&[5, 1, 2, 3, 4, 5]), &opts).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::StringTooLong { length: 5, limit: 4 })));
    }

    #[test]
    fn test_fixed_string_padding() {
        assert_eq!(encode("FixedString(4)", Value::from("ab")).expect("enc"), [b'a', b'b', 0, 0]);
        assert!(matches!(
            encode("FixedString(2)", Value::from("abc")),
            Err(Error::Codec(CodecError::FixedLengthMismatch { expected: 2, actual: 3, .. }))
        ));
        assert_eq!(
            round_trip("FixedString(3)", Value::Bytes(vec![1, 2, 3])),
            Value::Bytes(vec![1, 2, 3])
        );
        let node = parse_type("FixedString(3)").expect("parse");
        let err = decode_value(&node, &mut SliceSource::new(&[1, 2]), &CodecOptions::default());
        assert!(err.unwrap_err().is_eof());
    }

    #[test]
    fn test_uuid_halves() {
        let uuid = Uuid::parse_str("61f0c404-5cb3-11e7-907b-a6006ad3dba0").expect("uuid");
        let bytes = encode("UUID", Value::Uuid(uuid)).expect("enc");
        assert_eq!(&bytes[..8], &0x61f0c4045cb311e7u64.to_le_bytes());
        assert_eq!(&bytes[8..], &0x907ba6006ad3dba0u64.to_le_bytes());
        assert_eq!(round_trip("UUID", Value::Uuid(uuid)), Value::Uuid(uuid));
    }

    #[test]
    fn test_ip_layouts() {
        let v4 = Ipv4Addr::new(192, 168, 0, 1);
        assert_eq!(encode("IPv4", Value::Ipv4(v4)).expect("enc"), [1, 0, 168, 192]);
        assert_eq!(round_trip("IPv4", Value::Ipv4(v4)), Value::Ipv4(v4));
        let v6: Ipv6Addr = "2001:db8::1".parse().expect("ipv6");
        let bytes = encode("IPv6", Value::Ipv6(v6)).expect("enc");
        assert_eq!(&bytes[..2], &[0x20, 0x01]);
        assert_eq!(round_trip("IPv6", Value::from("::1")), Value::Ipv6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_bool() {
        assert_eq!(encode("Bool", Value::Bool(true)).expect("enc"), [1]);
        assert!(encode("Bool", Value::UInt8(2)).is_err());
        let node = parse_type("Bool").expect("parse");
        assert!(decode_value(&node, &mut SliceSource::new(&[2]), &CodecOptions::default()).is_err());
    }
}
