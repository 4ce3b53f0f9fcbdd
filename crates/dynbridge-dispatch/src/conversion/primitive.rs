//! Conversion rules for the canonical primitive categories.
//!
//! Integers are range-checked against the target width; a value that does not
//! fit is rejected rather than truncated.

use dynbridge_core::{CanonicalType, ForeignValue, HostValue};

/// Host value for an inline foreign primitive, `None` for anything else.
pub fn primitive_to_host(value: &ForeignValue) -> Option<HostValue> {
    Some(match value {
        ForeignValue::Bool(b) => HostValue::Bool(*b),
        ForeignValue::Int8(v) => HostValue::Int(*v as i128),
        ForeignValue::Int16(v) => HostValue::Int(*v as i128),
        ForeignValue::Int32(v) => HostValue::Int(*v as i128),
        ForeignValue::Int64(v) => HostValue::Int(*v as i128),
        ForeignValue::UInt8(v) => HostValue::Int(*v as i128),
        ForeignValue::UInt16(v) => HostValue::Int(*v as i128),
        ForeignValue::UInt32(v) => HostValue::Int(*v as i128),
        ForeignValue::UInt64(v) => HostValue::Int(*v as i128),
        ForeignValue::Float32(v) => HostValue::Float(*v as f64),
        ForeignValue::Float64(v) => HostValue::Float(*v),
        ForeignValue::String(s) => HostValue::Str(s.to_string()),
        _ => return None,
    })
}

/// Foreign value of category `target` for a host value, `None` when the host
/// value cannot satisfy it.
///
/// Host booleans count as the integers 0 and 1.
pub fn primitive_to_foreign(target: CanonicalType, value: &HostValue) -> Option<ForeignValue> {
    match target {
        CanonicalType::String => match value {
            HostValue::Str(s) => Some(ForeignValue::string(s)),
            _ => None,
        },
        CanonicalType::Bool => match value {
            HostValue::Bool(b) => Some(ForeignValue::Bool(*b)),
            HostValue::Int(v) => Some(ForeignValue::Bool(*v != 0)),
            _ => None,
        },
        CanonicalType::Float32 => {
            let v = host_float(value)?;
            if v.is_finite() && v.abs() > f32::MAX as f64 {
                return None;
            }
            Some(ForeignValue::Float32(v as f32))
        }
        CanonicalType::Float64 => host_float(value).map(ForeignValue::Float64),
        CanonicalType::Object => None,
        integer => integer_to_foreign(integer, host_integer(value)?),
    }
}

/// Integral value of a host int or bool.
pub fn host_integer(value: &HostValue) -> Option<i128> {
    match value {
        HostValue::Int(v) => Some(*v),
        HostValue::Bool(b) => Some(*b as i128),
        _ => None,
    }
}

fn host_float(value: &HostValue) -> Option<f64> {
    match value {
        HostValue::Float(v) => Some(*v),
        HostValue::Int(v) => Some(*v as f64),
        HostValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn integer_to_foreign(target: CanonicalType, value: i128) -> Option<ForeignValue> {
    let (min, max) = target.integer_range()?;
    if value < min || value > max {
        return None;
    }
    Some(match target {
        CanonicalType::Int8 => ForeignValue::Int8(value as i8),
        CanonicalType::Int16 => ForeignValue::Int16(value as i16),
        CanonicalType::Int32 => ForeignValue::Int32(value as i32),
        CanonicalType::Int64 => ForeignValue::Int64(value as i64),
        CanonicalType::UInt8 => ForeignValue::UInt8(value as u8),
        CanonicalType::UInt16 => ForeignValue::UInt16(value as u16),
        CanonicalType::UInt32 => ForeignValue::UInt32(value as u32),
        CanonicalType::UInt64 => ForeignValue::UInt64(value as u64),
        _ => return None,
    })
}
