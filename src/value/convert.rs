//! Best-effort coercion between loosely and strongly typed values.
//!
//! [`DefaultValueConverter`] applies these rules in order:
//!
//! 1. `Option<T>` destinations accept `Null` and otherwise convert to `T`;
//!    `Null` only converts to optional, `Any` or `()` destinations.
//! 2. Values already shaped like the destination pass through unchanged.
//! 3. Enums convert from a member name (case-insensitive) or member number.
//! 4. Strings parse into UUIDs, durations and timestamps.
//! 5. UUIDs, durations and timestamps format into their canonical strings.
//! 6. Arrays and objects convert element by element; objects pass through
//!    to records, which materialize them through serde.
//! 7. Numeric and primitive conversions, range-checked.
//! 8. As a last resort the value is weakened to plain JSON and tried once more.
//!
//! A failed conversion returns `None`; it never panics.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::text::{
    format_duration, format_timestamp, format_uuid, parse_duration, parse_timestamp, parse_uuid,
};
use super::{EnumDescriptor, TypeRef, Value};

/// Converts a wire value to the canonical shape of a destination type.
pub trait ValueConverter: Send + Sync + 'static {
    /// Returns `None` if `value` cannot represent `destination`.
    fn try_convert(&self, value: &Value, destination: &TypeRef) -> Option<Value>;
}

/// Shared converter handle stored in endpoint and client options.
pub type SharedConverter = Arc<dyn ValueConverter>;

/// The built-in conversion rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueConverter;

impl ValueConverter for DefaultValueConverter {
    fn try_convert(&self, value: &Value, destination: &TypeRef) -> Option<Value> {
        convert(value, destination, true)
    }
}

fn convert(value: &Value, destination: &TypeRef, allow_weakening: bool) -> Option<Value> {
    if let TypeRef::Option(inner) = destination {
        return match value {
            Value::Null => Some(Value::Null),
            other => convert(other, inner, allow_weakening),
        };
    }
    if value.is_null() {
        return matches!(destination, TypeRef::Any | TypeRef::Unit).then_some(Value::Null);
    }

    if is_assignable(value, destination) {
        return Some(value.clone());
    }

    if let TypeRef::Enum(descriptor) = destination {
        return convert_enum(value, descriptor);
    }

    let converted = match destination {
        TypeRef::Uuid | TypeRef::Duration | TypeRef::Timestamp => parse_well_known(value, destination),
        TypeRef::String => format_as_string(value),
        TypeRef::List(inner) => convert_list(value, inner),
        TypeRef::Map(inner) => convert_map(value, inner),
        TypeRef::Bytes => convert_bytes(value),
        TypeRef::Record(_) => None,
        other => convert_primitive(value, other),
    };

    converted.or_else(|| {
        if !allow_weakening {
            return None;
        }
        let weakened = Value::from_json(value.to_json());
        if weakened == *value {
            return None;
        }
        convert(&weakened, destination, false)
    })
}

fn is_assignable(value: &Value, destination: &TypeRef) -> bool {
    match (value, destination) {
        (_, TypeRef::Any) => true,
        (Value::Bool(_), TypeRef::Bool)
        | (Value::Char(_), TypeRef::Char)
        | (Value::String(_), TypeRef::String)
        | (Value::Bytes(_), TypeRef::Bytes)
        | (Value::Uuid(_), TypeRef::Uuid)
        | (Value::Duration(_), TypeRef::Duration)
        | (Value::Timestamp(_), TypeRef::Timestamp)
        | (Value::Float(_), TypeRef::F64)
        | (Value::Int(_), TypeRef::I64)
        | (Value::UInt(_), TypeRef::U64)
        | (Value::Object(_), TypeRef::Record(_)) => true,
        (Value::Array(items), TypeRef::List(inner)) => {
            items.iter().all(|item| is_assignable(item, inner))
        }
        (Value::Object(map), TypeRef::Map(inner)) => {
            map.values().all(|item| is_assignable(item, inner))
        }
        _ => false,
    }
}

fn convert_enum(value: &Value, descriptor: &EnumDescriptor) -> Option<Value> {
    let variant = match value {
        Value::String(text) => {
            let text = text.trim();
            descriptor.variant_by_name(text).or_else(|| {
                text.parse::<i64>()
                    .ok()
                    .and_then(|n| descriptor.variant_by_value(n))
            })
        }
        Value::Int(n) => descriptor.variant_by_value(*n),
        Value::UInt(n) => i64::try_from(*n)
            .ok()
            .and_then(|n| descriptor.variant_by_value(n)),
        _ => None,
    }?;
    Some(Value::String(variant.name.clone()))
}

fn parse_well_known(value: &Value, destination: &TypeRef) -> Option<Value> {
    let Value::String(text) = value else {
        return None;
    };
    match destination {
        TypeRef::Uuid => parse_uuid(text).map(Value::Uuid),
        TypeRef::Duration => parse_duration(text).map(Value::Duration),
        TypeRef::Timestamp => parse_timestamp(text).map(Value::Timestamp),
        _ => None,
    }
}

fn format_as_string(value: &Value) -> Option<Value> {
    let text = match value {
        Value::Uuid(id) => format_uuid(id),
        Value::Duration(d) => format_duration(d),
        Value::Timestamp(ts) => format_timestamp(ts),
        Value::Char(c) => c.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        _ => return None,
    };
    Some(Value::String(text))
}

fn convert_list(value: &Value, inner: &TypeRef) -> Option<Value> {
    let Value::Array(items) = value else {
        return None;
    };
    items
        .iter()
        .map(|item| convert(item, inner, true))
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}

fn convert_map(value: &Value, inner: &TypeRef) -> Option<Value> {
    let Value::Object(map) = value else {
        return None;
    };
    map.iter()
        .map(|(key, item)| convert(item, inner, true).map(|v| (key.clone(), v)))
        .collect::<Option<BTreeMap<String, Value>>>()
        .map(Value::Object)
}

fn convert_bytes(value: &Value) -> Option<Value> {
    let Value::Array(items) = value else {
        return None;
    };
    items
        .iter()
        .map(|item| match convert_primitive(item, &TypeRef::U8)? {
            Value::UInt(b) => u8::try_from(b).ok(),
            _ => None,
        })
        .collect::<Option<Vec<u8>>>()
        .map(Value::Bytes)
}

fn convert_primitive(value: &Value, destination: &TypeRef) -> Option<Value> {
    if let Some((min, max)) = destination.integer_range() {
        let n = as_integer(value)?;
        if n < min || n > max {
            return None;
        }
        return Some(if destination.is_unsigned_integer() {
            Value::UInt(n as u64)
        } else {
            Value::Int(n as i64)
        });
    }

    match destination {
        TypeRef::F64 => as_float(value).map(Value::Float),
        TypeRef::F32 => {
            let f = as_float(value)?;
            if f.is_finite() && f.abs() > f32::MAX as f64 {
                return None;
            }
            Some(Value::Float(f as f32 as f64))
        }
        TypeRef::Bool => match value {
            Value::Int(n) => Some(Value::Bool(*n != 0)),
            Value::UInt(n) => Some(Value::Bool(*n != 0)),
            Value::Float(f) => Some(Value::Bool(*f != 0.0)),
            Value::String(text) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            _ => None,
        },
        TypeRef::Char => match value {
            Value::String(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            }
            Value::Int(_) | Value::UInt(_) => {
                let code = u32::try_from(as_integer(value)?).ok()?;
                char::from_u32(code).map(Value::Char)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Integral view of a value. Floats round half to even.
fn as_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Int(n) => Some(*n as i128),
        Value::UInt(n) => Some(*n as i128),
        Value::Bool(b) => Some(*b as i128),
        Value::Char(c) => Some(*c as u32 as i128),
        Value::Float(f) => {
            let rounded = f.round_ties_even();
            // Beyond every integer range this converter handles.
            if !rounded.is_finite() || rounded.abs() >= 1e20 {
                return None;
            }
            Some(rounded as i128)
        }
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(n) => Some(*n as f64),
        Value::UInt(n) => Some(*n as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
