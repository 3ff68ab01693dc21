//! Type descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Module name of every built-in type.
pub const CORE_MODULE: &str = "core";

/// One named member of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

impl EnumVariant {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Shape of a field-less enum: its name, defining module and members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,
    pub module: String,
    pub variants: Vec<EnumVariant>,
}

impl EnumDescriptor {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        variants: Vec<EnumVariant>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            variants,
        }
    }

    /// Case-insensitive member lookup by name.
    pub fn variant_by_name(&self, name: &str) -> Option<&EnumVariant> {
        self.variants
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }

    pub fn variant_by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// Identity of a serde-backed record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordDescriptor {
    pub name: String,
    pub module: String,
}

/// Strongly typed descriptor for parameters, results and generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// Any value, passed through untouched.
    Any,
    /// No value.
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Bytes,
    Uuid,
    Duration,
    Timestamp,
    Option(Box<TypeRef>),
    List(Box<TypeRef>),
    /// String-keyed map.
    Map(Box<TypeRef>),
    Enum(EnumDescriptor),
    Record(RecordDescriptor),
    /// Placeholder for the method's generic argument at this position.
    Generic(u8),
}

const BUILTINS: &[(&str, TypeRef)] = &[
    ("Value", TypeRef::Any),
    ("()", TypeRef::Unit),
    ("bool", TypeRef::Bool),
    ("i8", TypeRef::I8),
    ("i16", TypeRef::I16),
    ("i32", TypeRef::I32),
    ("i64", TypeRef::I64),
    ("u8", TypeRef::U8),
    ("u16", TypeRef::U16),
    ("u32", TypeRef::U32),
    ("u64", TypeRef::U64),
    ("f32", TypeRef::F32),
    ("f64", TypeRef::F64),
    ("char", TypeRef::Char),
    ("String", TypeRef::String),
    ("Bytes", TypeRef::Bytes),
    ("Uuid", TypeRef::Uuid),
    ("Duration", TypeRef::Duration),
    ("Timestamp", TypeRef::Timestamp),
];

impl TypeRef {
    pub fn option(inner: TypeRef) -> Self {
        TypeRef::Option(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn map(inner: TypeRef) -> Self {
        TypeRef::Map(Box::new(inner))
    }

    pub fn record(name: impl Into<String>, module: impl Into<String>) -> Self {
        TypeRef::Record(RecordDescriptor {
            name: name.into(),
            module: module.into(),
        })
    }

    /// Look up a built-in type by its full name.
    pub fn builtin(name: &str) -> Option<TypeRef> {
        BUILTINS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, type_ref)| type_ref.clone())
    }

    /// Full name, e.g. `i32`, `Vec<Option<String>>` or `Point`.
    pub fn full_name(&self) -> String {
        match self {
            TypeRef::Option(inner) => format!("Option<{}>", inner.full_name()),
            TypeRef::List(inner) => format!("Vec<{}>", inner.full_name()),
            TypeRef::Map(inner) => format!("Map<{}>", inner.full_name()),
            TypeRef::Enum(e) => e.name.clone(),
            TypeRef::Record(r) => r.name.clone(),
            TypeRef::Generic(index) => format!("T{}", index),
            builtin => BUILTINS
                .iter()
                .find(|(_, type_ref)| type_ref == builtin)
                .map(|(name, _)| (*name).to_string())
                .unwrap_or_default(),
        }
    }

    /// Defining module: the user type's module, or [`CORE_MODULE`] for built-ins.
    ///
    /// Wrappers report the module of the type they wrap.
    pub fn module_name(&self) -> String {
        match self {
            TypeRef::Option(inner) | TypeRef::List(inner) | TypeRef::Map(inner) => {
                inner.module_name()
            }
            TypeRef::Enum(e) => e.module.clone(),
            TypeRef::Record(r) => r.module.clone(),
            _ => CORE_MODULE.to_string(),
        }
    }

    /// Replace generic placeholders with concrete arguments.
    ///
    /// Returns `None` if a placeholder has no matching argument.
    pub fn substitute(&self, generic_arguments: &[TypeRef]) -> Option<TypeRef> {
        Some(match self {
            TypeRef::Generic(index) => generic_arguments.get(*index as usize)?.clone(),
            TypeRef::Option(inner) => TypeRef::option(inner.substitute(generic_arguments)?),
            TypeRef::List(inner) => TypeRef::list(inner.substitute(generic_arguments)?),
            TypeRef::Map(inner) => TypeRef::map(inner.substitute(generic_arguments)?),
            other => other.clone(),
        })
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(self, TypeRef::I8 | TypeRef::I16 | TypeRef::I32 | TypeRef::I64)
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(self, TypeRef::U8 | TypeRef::U16 | TypeRef::U32 | TypeRef::U64)
    }

    /// Inclusive range of an integer type.
    pub(crate) fn integer_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            TypeRef::I8 => (i8::MIN as i128, i8::MAX as i128),
            TypeRef::I16 => (i16::MIN as i128, i16::MAX as i128),
            TypeRef::I32 => (i32::MIN as i128, i32::MAX as i128),
            TypeRef::I64 => (i64::MIN as i128, i64::MAX as i128),
            TypeRef::U8 => (0, u8::MAX as i128),
            TypeRef::U16 => (0, u16::MAX as i128),
            TypeRef::U32 => (0, u32::MAX as i128),
            TypeRef::U64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_names() {
        assert_eq!(TypeRef::I32.full_name(), "i32");
        assert_eq!(TypeRef::Unit.full_name(), "()");
        assert_eq!(
            TypeRef::list(TypeRef::option(TypeRef::String)).full_name(),
            "Vec<Option<String>>"
        );
        assert_eq!(TypeRef::map(TypeRef::Generic(1)).full_name(), "Map<T1>");
        assert_eq!(TypeRef::record("Point", "geometry").full_name(), "Point");
    }

    #[test]
    fn test_module_names() {
        assert_eq!(TypeRef::Uuid.module_name(), CORE_MODULE);
        assert_eq!(
            TypeRef::list(TypeRef::record("Point", "geometry")).module_name(),
            "geometry"
        );
    }

    #[test]
    fn test_builtin_lookup_covers_every_name() {
        for (name, type_ref) in BUILTINS {
            assert_eq!(TypeRef::builtin(name).as_ref(), Some(type_ref));
            assert_eq!(type_ref.full_name(), *name);
        }
        assert_eq!(TypeRef::builtin("Point"), None);
    }

    #[test]
    fn test_substitute() {
        let declared = TypeRef::list(TypeRef::Generic(0));
        assert_eq!(
            declared.substitute(&[TypeRef::I64]),
            Some(TypeRef::list(TypeRef::I64))
        );
        assert_eq!(declared.substitute(&[]), None);
        assert_eq!(TypeRef::Bool.substitute(&[]), Some(TypeRef::Bool));
    }
}
