//! Mapping between Rust types and wire values.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDateTime, TimeDelta};
use serde_bytes::ByteBuf;
use uuid::Uuid;

use super::{TypeRef, Value};
use crate::error::ConvertError;

/// A Rust type that can travel as an argument or result.
///
/// `from_value` receives values already coerced to [`WireType::type_ref`] by a
/// [`ValueConverter`](super::ValueConverter), so implementations only accept
/// the canonical shape for their type.
///
/// Records and enums implement this with [`wire_record!`](crate::wire_record)
/// and [`wire_enum!`](crate::wire_enum).
pub trait WireType: Sized + Send + 'static {
    /// Descriptor of this type.
    fn type_ref() -> TypeRef;

    fn into_value(self) -> Result<Value, ConvertError>;

    fn from_value(value: Value) -> Result<Self, ConvertError>;
}

pub(crate) fn mismatch(value: &Value, to: &TypeRef) -> ConvertError {
    ConvertError::Mismatch {
        from: value.type_name().to_string(),
        to: to.full_name(),
    }
}

fn out_of_range(value: impl ToString, to: TypeRef) -> ConvertError {
    ConvertError::OutOfRange {
        value: value.to_string(),
        to: to.full_name(),
    }
}

macro_rules! impl_signed {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl WireType for $ty {
            fn type_ref() -> TypeRef {
                TypeRef::$variant
            }

            fn into_value(self) -> Result<Value, ConvertError> {
                Ok(Value::Int(self as i64))
            }

            fn from_value(value: Value) -> Result<Self, ConvertError> {
                match value {
                    Value::Int(n) => <$ty>::try_from(n).map_err(|_| out_of_range(n, TypeRef::$variant)),
                    Value::UInt(n) => <$ty>::try_from(n).map_err(|_| out_of_range(n, TypeRef::$variant)),
                    other => Err(mismatch(&other, &TypeRef::$variant)),
                }
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl WireType for $ty {
            fn type_ref() -> TypeRef {
                TypeRef::$variant
            }

            fn into_value(self) -> Result<Value, ConvertError> {
                Ok(Value::UInt(self as u64))
            }

            fn from_value(value: Value) -> Result<Self, ConvertError> {
                match value {
                    Value::UInt(n) => <$ty>::try_from(n).map_err(|_| out_of_range(n, TypeRef::$variant)),
                    Value::Int(n) => <$ty>::try_from(n).map_err(|_| out_of_range(n, TypeRef::$variant)),
                    other => Err(mismatch(&other, &TypeRef::$variant)),
                }
            }
        }
    )*};
}

impl_signed!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);
impl_unsigned!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);

impl WireType for f64 {
    fn type_ref() -> TypeRef {
        TypeRef::F64
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        Ok(Value::Float(self))
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as f64),
            Value::UInt(n) => Ok(n as f64),
            other => Err(mismatch(&other, &TypeRef::F64)),
        }
    }
}

impl WireType for f32 {
    fn type_ref() -> TypeRef {
        TypeRef::F32
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        Ok(Value::Float(self as f64))
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

/// Implements `WireType` for a type stored in a single `Value` variant.
macro_rules! impl_simple {
    ($ty:ty, $type_ref:ident, $variant:ident) => {
        impl WireType for $ty {
            fn type_ref() -> TypeRef {
                TypeRef::$type_ref
            }

            fn into_value(self) -> Result<Value, ConvertError> {
                Ok(Value::$variant(self))
            }

            fn from_value(value: Value) -> Result<Self, ConvertError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(mismatch(&other, &TypeRef::$type_ref)),
                }
            }
        }
    };
}

impl_simple!(bool, Bool, Bool);
impl_simple!(char, Char, Char);
impl_simple!(String, String, String);
impl_simple!(Uuid, Uuid, Uuid);
impl_simple!(TimeDelta, Duration, Duration);
impl_simple!(NaiveDateTime, Timestamp, Timestamp);

impl WireType for ByteBuf {
    fn type_ref() -> TypeRef {
        TypeRef::Bytes
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        Ok(Value::Bytes(self.into_vec()))
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Bytes(bytes) => Ok(ByteBuf::from(bytes)),
            other => Err(mismatch(&other, &TypeRef::Bytes)),
        }
    }
}

impl WireType for () {
    fn type_ref() -> TypeRef {
        TypeRef::Unit
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        Ok(Value::Null)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(()),
            other => Err(mismatch(&other, &TypeRef::Unit)),
        }
    }
}

impl WireType for Value {
    fn type_ref() -> TypeRef {
        TypeRef::Any
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        Ok(self)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        Ok(value)
    }
}

impl<T: WireType> WireType for Option<T> {
    fn type_ref() -> TypeRef {
        TypeRef::option(T::type_ref())
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        match self {
            Some(v) => v.into_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: WireType> WireType for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::list(T::type_ref())
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        self.into_iter()
            .map(T::into_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(&other, &Self::type_ref())),
        }
    }
}

impl<T: WireType> WireType for HashMap<String, T> {
    fn type_ref() -> TypeRef {
        TypeRef::map(T::type_ref())
    }

    fn into_value(self) -> Result<Value, ConvertError> {
        self.into_iter()
            .map(|(key, value)| value.into_value().map(|v| (key, v)))
            .collect::<Result<BTreeMap<String, Value>, ConvertError>>()
            .map(Value::Object)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| T::from_value(value).map(|v| (key, v)))
                .collect(),
            other => Err(mismatch(&other, &Self::type_ref())),
        }
    }
}

/// Implement [`WireType`] for a serde record.
///
/// The record travels as a [`Value::Object`] and is materialized through
/// `serde_json` on the receiving side.
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// wirecall::wire_record!(Point, "geometry");
/// ```
#[macro_export]
macro_rules! wire_record {
    ($ty:ident, $module:expr) => {
        impl $crate::value::WireType for $ty {
            fn type_ref() -> $crate::value::TypeRef {
                $crate::value::TypeRef::record(stringify!($ty), $module)
            }

            fn into_value(
                self,
            ) -> ::std::result::Result<$crate::value::Value, $crate::error::ConvertError> {
                $crate::value::Value::from_serialize(&self)
            }

            fn from_value(
                value: $crate::value::Value,
            ) -> ::std::result::Result<Self, $crate::error::ConvertError> {
                value.deserialize_into()
            }
        }
    };
}

/// Implement [`WireType`] for a field-less enum with explicit discriminants.
///
/// Members travel by name; the numbers let callers send the numeric form.
///
/// ```
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Color {
///     Red,
///     Green,
/// }
///
/// wirecall::wire_enum!(Color, "paint", { Red = 0, Green = 1 });
/// ```
#[macro_export]
macro_rules! wire_enum {
    ($ty:ident, $module:expr, { $($variant:ident = $value:expr),+ $(,)? }) => {
        impl $crate::value::WireType for $ty {
            fn type_ref() -> $crate::value::TypeRef {
                $crate::value::TypeRef::Enum($crate::value::EnumDescriptor::new(
                    stringify!($ty),
                    $module,
                    vec![$($crate::value::EnumVariant::new(stringify!($variant), $value)),+],
                ))
            }

            fn into_value(
                self,
            ) -> ::std::result::Result<$crate::value::Value, $crate::error::ConvertError> {
                let name = match self {
                    $($ty::$variant => stringify!($variant),)+
                };
                Ok($crate::value::Value::String(name.to_string()))
            }

            fn from_value(
                value: $crate::value::Value,
            ) -> ::std::result::Result<Self, $crate::error::ConvertError> {
                if let $crate::value::Value::String(name) = &value {
                    $(if name == stringify!($variant) {
                        return Ok($ty::$variant);
                    })+
                }
                Err($crate::error::ConvertError::UnknownMember {
                    member: value.to_string(),
                    enum_name: stringify!($ty).to_string(),
                })
            }
        }
    };
}
