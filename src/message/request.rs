//! Request message.

use serde::{Deserialize, Serialize};

use crate::value::{TypeRef, Value};

/// A type reference expressed by name rather than by descriptor.
///
/// Lets client and server resolve types independently even when they were
/// built against slightly different versions of the shared contract module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedTypeRef {
    /// Full type name, e.g. `Vec<Point>`.
    pub type_full_name: String,
    /// Name of the module that defines the type.
    pub module_name: String,
}

impl NamedTypeRef {
    /// Create a new by-name descriptor.
    pub fn new(type_full_name: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            type_full_name: type_full_name.into(),
            module_name: module_name.into(),
        }
    }

    /// Describe a type by name.
    pub fn of(type_ref: &TypeRef) -> Self {
        Self::new(type_ref.full_name(), type_ref.module_name())
    }
}

/// A call to one method of a remote interface.
///
/// Each either/or descriptor pair (`parameter_types`/`parameter_types_by_name`,
/// `generic_arguments`/`generic_arguments_by_name`) should have at most one
/// side populated. The server rejects requests that set both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Name of the method to invoke.
    pub method_name: String,

    /// Positional argument values.
    #[serde(default)]
    pub parameters: Vec<Value>,

    /// Declared parameter types, by descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_types: Option<Vec<TypeRef>>,

    /// Declared parameter types, by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_types_by_name: Option<Vec<NamedTypeRef>>,

    /// Generic type arguments, by descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_arguments: Option<Vec<TypeRef>>,

    /// Generic type arguments, by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_arguments_by_name: Option<Vec<NamedTypeRef>>,
}

impl Request {
    /// Create a request for `method_name` with no arguments and no descriptors.
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            parameters: Vec::new(),
            parameter_types: None,
            parameter_types_by_name: None,
            generic_arguments: None,
            generic_arguments_by_name: None,
        }
    }

    /// Set the positional arguments.
    pub fn with_parameters(mut self, parameters: Vec<Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the parameter types by descriptor.
    pub fn with_parameter_types(mut self, types: Vec<TypeRef>) -> Self {
        self.parameter_types = Some(types);
        self
    }

    /// Set the parameter types by name.
    pub fn with_parameter_types_by_name(mut self, types: Vec<NamedTypeRef>) -> Self {
        self.parameter_types_by_name = Some(types);
        self
    }

    /// Set the generic arguments by descriptor.
    pub fn with_generic_arguments(mut self, types: Vec<TypeRef>) -> Self {
        self.generic_arguments = Some(types);
        self
    }

    /// Set the generic arguments by name.
    pub fn with_generic_arguments_by_name(mut self, types: Vec<NamedTypeRef>) -> Self {
        self.generic_arguments_by_name = Some(types);
        self
    }
}
