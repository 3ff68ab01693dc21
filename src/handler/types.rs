//! By-name type resolution.
//!
//! Replaces module loading: a type can only be named if it was registered
//! here, or if it is a built-in of the [`CORE_MODULE`]. Wrapper names
//! (`Option<..>`, `Vec<..>`, `Map<..>`) are parsed recursively.

use std::collections::HashMap;

use crate::message::NamedTypeRef;
use crate::value::{TypeRef, WireType, CORE_MODULE};

/// Registry of user types that clients may name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<(String, String), TypeRef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. Wrappers register the type they wrap; built-ins need no registration.
    pub fn register(&mut self, type_ref: TypeRef) -> &mut Self {
        match type_ref {
            TypeRef::Option(inner) | TypeRef::List(inner) | TypeRef::Map(inner) => {
                self.register(*inner)
            }
            TypeRef::Enum(_) | TypeRef::Record(_) => {
                let key = (type_ref.module_name(), type_ref.full_name());
                self.types.insert(key, type_ref);
                self
            }
            _ => self,
        }
    }

    pub fn register_type<T: WireType>(&mut self) -> &mut Self {
        self.register(T::type_ref())
    }

    /// Builder-style [`register_type`](Self::register_type).
    pub fn with_type<T: WireType>(mut self) -> Self {
        self.register_type::<T>();
        self
    }

    /// Resolve a by-name descriptor to a concrete type.
    pub fn resolve(&self, named: &NamedTypeRef) -> Option<TypeRef> {
        self.resolve_name(named.type_full_name.trim(), &named.module_name)
    }

    fn resolve_name(&self, name: &str, module: &str) -> Option<TypeRef> {
        let wrappers: [(&str, fn(TypeRef) -> TypeRef); 3] = [
            ("Option<", TypeRef::option),
            ("Vec<", TypeRef::list),
            ("Map<", TypeRef::map),
        ];
        for (prefix, wrap) in wrappers {
            if let Some(inner) = name.strip_prefix(prefix).and_then(|rest| rest.strip_suffix('>')) {
                return self.resolve_name(inner.trim(), module).map(wrap);
            }
        }

        if let Some(found) = self.types.get(&(module.to_string(), name.to_string())) {
            return Some(found.clone());
        }
        if module == CORE_MODULE {
            return TypeRef::builtin(name);
        }
        None
    }
}
