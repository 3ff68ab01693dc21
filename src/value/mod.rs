//! Wire values, type descriptors and value conversion.
//!
//! [`Value`] is the self-describing representation every argument and result
//! travels as. Each variant carries its kind on the wire, so a receiver can
//! rebuild the concrete shape without knowing the type ahead of time.
//! [`TypeRef`] describes the strongly typed side; [`WireType`] bridges the two
//! for Rust types and [`ValueConverter`] coerces between loosely and strongly
//! typed values.

mod convert;
mod text;
mod type_ref;
mod wire_type;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use convert::{DefaultValueConverter, SharedConverter, ValueConverter};
pub use text::{
    format_duration, format_timestamp, format_uuid, parse_duration, parse_timestamp, parse_uuid,
};
pub use type_ref::{EnumDescriptor, EnumVariant, RecordDescriptor, TypeRef, CORE_MODULE};
pub use wire_type::WireType;

use crate::error::ConvertError;

/// A loosely typed value as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    Float(#[serde(with = "text::float_serde")] f64),
    Char(char),
    String(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Uuid(#[serde(with = "text::uuid_serde")] Uuid),
    Duration(#[serde(with = "text::duration_serde")] TimeDelta),
    Timestamp(#[serde(with = "text::timestamp_serde")] NaiveDateTime),
    Array(Vec<Value>),
    /// String-keyed map; also the shape of records.
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Run-time kind of this value, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Float(_) => "Float",
            Value::Char(_) => "Char",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "Uuid",
            Value::Duration(_) => "Duration",
            Value::Timestamp(_) => "Timestamp",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Weaken into plain JSON, dropping kind information.
    ///
    /// Well-known values become their canonical strings and bytes become an
    /// array of numbers. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::UInt(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Char(c) => Json::String(c.to_string()),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Value::Uuid(id) => Json::String(format_uuid(id)),
            Value::Duration(d) => Json::String(format_duration(d)),
            Value::Timestamp(ts) => Json::String(format_timestamp(ts)),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Build a value from plain JSON.
    ///
    /// Integers that fit `i64` become [`Value::Int`], larger ones [`Value::UInt`].
    pub fn from_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Capture any serde-serializable value as an object graph.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ConvertError> {
        Ok(Value::from_json(serde_json::to_value(value)?))
    }

    /// Materialize a serde-deserializable value from this object graph.
    pub fn deserialize_into<T: serde::de::DeserializeOwned>(&self) -> Result<T, ConvertError> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
