//! Explicit method registry for a service implementation.
//!
//! A [`Service`] is built once at startup: one contract interface plus any
//! number of extra interfaces, each holding its methods in registration order.
//! Overload resolution enumerates interfaces, then methods, in that order.
//!
//! # Example
//!
//! ```
//! use wirecall::handler::{InterfaceBuilder, Service};
//! use wirecall::value::TypeRef;
//!
//! let service = Service::builder("Calculator")
//!     .sync_method("Add", |a: i32, b: i32| Ok(a + b))
//!     .sync_method("Add", |a: f64, b: f64| Ok(a + b))
//!     .generic_method(
//!         "Echo",
//!         vec![TypeRef::Generic(0)],
//!         vec![TypeRef::String],
//!         |value: String| async move { Ok(value) },
//!     )
//!     .interface(InterfaceBuilder::new("Diagnostics").method("Ping", || async { Ok(()) }))
//!     .build();
//!
//! assert_eq!(service.overloads("Add").count(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use super::method::{AsyncMethod, Handler, SyncMethod};
use crate::value::TypeRef;

/// Signature of one registered method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    /// Declared parameter types; may contain [`TypeRef::Generic`] placeholders.
    pub parameter_types: Vec<TypeRef>,
    /// Generic arguments this registration is instantiated for.
    pub generic_arguments: Vec<TypeRef>,
    pub return_type: TypeRef,
}

impl MethodDescriptor {
    pub fn generic_arity(&self) -> usize {
        self.generic_arguments.len()
    }
}

/// A registered method: its signature and body.
#[derive(Clone)]
pub struct MethodEntry {
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) handler: Arc<dyn Handler>,
}

impl MethodEntry {
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Methods grouped under one interface name.
#[derive(Debug, Clone)]
pub struct Interface {
    name: String,
    methods: Vec<MethodEntry>,
}

impl Interface {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }
}

/// Fluent builder for one interface.
#[derive(Debug)]
pub struct InterfaceBuilder {
    name: String,
    methods: Vec<MethodEntry>,
}

impl InterfaceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Register an async method. Overloads share a name.
    pub fn method<Args, M: AsyncMethod<Args>>(mut self, name: impl Into<String>, method: M) -> Self {
        self.methods.push(MethodEntry {
            descriptor: MethodDescriptor {
                name: name.into(),
                parameter_types: M::parameter_types(),
                generic_arguments: Vec::new(),
                return_type: M::return_type(),
            },
            handler: method.into_handler(),
        });
        self
    }

    /// Register a blocking method.
    pub fn sync_method<Args, M: SyncMethod<Args>>(
        mut self,
        name: impl Into<String>,
        method: M,
    ) -> Self {
        self.methods.push(MethodEntry {
            descriptor: MethodDescriptor {
                name: name.into(),
                parameter_types: M::parameter_types(),
                generic_arguments: Vec::new(),
                return_type: M::return_type(),
            },
            handler: method.into_handler(),
        });
        self
    }

    /// Register one instantiation of a generic method.
    ///
    /// `declared` is the parameter list with [`TypeRef::Generic`] placeholders;
    /// `generic_arguments` the concrete types this body was written for.
    /// Register the same name again for every other instantiation.
    pub fn generic_method<Args, M: AsyncMethod<Args>>(
        mut self,
        name: impl Into<String>,
        declared: Vec<TypeRef>,
        generic_arguments: Vec<TypeRef>,
        method: M,
    ) -> Self {
        debug_assert_eq!(
            declared
                .iter()
                .map(|t| t.substitute(&generic_arguments))
                .collect::<Option<Vec<_>>>(),
            Some(M::parameter_types()),
            "generic declaration does not match the method signature"
        );
        self.methods.push(MethodEntry {
            descriptor: MethodDescriptor {
                name: name.into(),
                parameter_types: declared,
                generic_arguments,
                return_type: M::return_type(),
            },
            handler: method.into_handler(),
        });
        self
    }

    fn build(self) -> Interface {
        Interface {
            name: self.name,
            methods: self.methods,
        }
    }
}

/// A service implementation: the contract interface and any extra interfaces.
#[derive(Debug, Clone)]
pub struct Service {
    contract: String,
    interfaces: Vec<Interface>,
}

impl Service {
    pub fn builder(contract: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder::new(contract)
    }

    /// Name of the contract interface.
    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Every method named `name`, in enumeration order.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodEntry> + 'a {
        self.interfaces
            .iter()
            .flat_map(|interface| interface.methods.iter())
            .filter(move |entry| entry.descriptor.name == name)
    }
}

/// Fluent builder for a [`Service`].
#[derive(Debug)]
pub struct ServiceBuilder {
    contract: InterfaceBuilder,
    extra: Vec<InterfaceBuilder>,
}

impl ServiceBuilder {
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: InterfaceBuilder::new(contract),
            extra: Vec::new(),
        }
    }

    /// Register an async method on the contract interface.
    pub fn method<Args, M: AsyncMethod<Args>>(mut self, name: impl Into<String>, method: M) -> Self {
        self.contract = self.contract.method(name, method);
        self
    }

    /// Register a blocking method on the contract interface.
    pub fn sync_method<Args, M: SyncMethod<Args>>(
        mut self,
        name: impl Into<String>,
        method: M,
    ) -> Self {
        self.contract = self.contract.sync_method(name, method);
        self
    }

    /// Register a generic method instantiation on the contract interface.
    pub fn generic_method<Args, M: AsyncMethod<Args>>(
        mut self,
        name: impl Into<String>,
        declared: Vec<TypeRef>,
        generic_arguments: Vec<TypeRef>,
        method: M,
    ) -> Self {
        self.contract = self
            .contract
            .generic_method(name, declared, generic_arguments, method);
        self
    }

    /// Add another implemented interface. Searched after the contract.
    pub fn interface(mut self, interface: InterfaceBuilder) -> Self {
        self.extra.push(interface);
        self
    }

    pub fn build(self) -> Service {
        let contract = self.contract.name.clone();
        let interfaces = std::iter::once(self.contract)
            .chain(self.extra)
            .map(InterfaceBuilder::build)
            .collect();
        Service {
            contract,
            interfaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overloads_in_registration_order() {
        let service = Service::builder("Svc")
            .sync_method("F", |_: i32| Ok(()))
            .sync_method("G", || Ok(()))
            .interface(InterfaceBuilder::new("Other").sync_method("F", |_: String| Ok(())))
            .sync_method("F", |_: bool| Ok(()))
            .build();

        let params: Vec<_> = service
            .overloads("F")
            .map(|entry| entry.descriptor().parameter_types.clone())
            .collect();
        assert_eq!(
            params,
            vec![vec![TypeRef::I32], vec![TypeRef::Bool], vec![TypeRef::String]]
        );
        assert_eq!(service.interfaces()[1].name(), "Other");
    }

    #[test]
    fn test_generic_registration_keeps_placeholders() {
        let service = Service::builder("Svc")
            .generic_method(
                "Wrap",
                vec![TypeRef::list(TypeRef::Generic(0))],
                vec![TypeRef::I64],
                |items: Vec<i64>| async move { Ok(items.len() as u32) },
            )
            .build();

        let entry = service.overloads("Wrap").next().unwrap();
        assert_eq!(entry.descriptor().generic_arity(), 1);
        assert_eq!(
            entry.descriptor().parameter_types,
            vec![TypeRef::list(TypeRef::Generic(0))]
        );
        assert_eq!(entry.descriptor().return_type, TypeRef::U32);
    }
}
