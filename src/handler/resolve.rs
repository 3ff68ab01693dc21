//! Overload resolution and argument binding.
//!
//! A candidate matches a request when its parameter count, its generic
//! instantiation and every declared parameter type (generic placeholders
//! substituted) equal the request's, in order. The first match in enumeration order
//! wins. Every failure here is a bad request.

use super::method::{BoxFuture, InvokeResult};
use super::service::{MethodDescriptor, MethodEntry, Service};
use super::types::TypeRegistry;
use crate::message::{ErrorCause, Fault, NamedTypeRef, Request};
use crate::value::{TypeRef, Value, ValueConverter};

/// A resolved method with its arguments bound, ready to run.
pub struct PreparedCall {
    pub descriptor: MethodDescriptor,
    pub invocation: BoxFuture<'static, InvokeResult>,
}

impl std::fmt::Debug for PreparedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedCall")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Resolve `request` against `service` and bind its arguments.
pub fn prepare_call(
    service: &Service,
    request: Request,
    types: &TypeRegistry,
    converter: &dyn ValueConverter,
) -> Result<PreparedCall, Fault> {
    let parameter_types = resolve_descriptors(
        request.parameter_types,
        request.parameter_types_by_name,
        ("parameterTypes", "parameterTypesByName"),
        types,
    )?;
    let generic_arguments = resolve_descriptors(
        request.generic_arguments,
        request.generic_arguments_by_name,
        ("genericArguments", "genericArgumentsByName"),
        types,
    )?;

    let entry = find_overload(
        service,
        &request.method_name,
        request.parameters.len(),
        &parameter_types,
        &generic_arguments,
    )
    .ok_or_else(|| {
        Fault::bad_request(format!(
            "Method '{}' not found in interface '{}'",
            request.method_name,
            service.contract()
        ))
    })?;

    let descriptor = &entry.descriptor;
    if descriptor.parameter_types.len() != request.parameters.len() {
        return Err(Fault::bad_request(format!(
            "Method '{}' expects {} parameters",
            descriptor.name,
            descriptor.parameter_types.len()
        )));
    }
    if descriptor.generic_arity() != generic_arguments.len() {
        return Err(Fault::bad_request("Generic arguments mismatch"));
    }

    let mut arguments = Vec::with_capacity(request.parameters.len());
    for (index, (value, declared)) in request
        .parameters
        .iter()
        .zip(&descriptor.parameter_types)
        .enumerate()
    {
        let destination = declared
            .substitute(&generic_arguments)
            .ok_or_else(|| Fault::bad_request("Generic arguments mismatch"))?;
        let converted = converter
            .try_convert(value, &destination)
            .ok_or_else(|| conversion_fault(index, value, &destination))?;
        arguments.push(converted);
    }

    let invocation = entry.handler.bind(arguments).map_err(|err| {
        let destination = descriptor
            .parameter_types
            .get(err.index)
            .and_then(|declared| declared.substitute(&generic_arguments))
            .unwrap_or(TypeRef::Any);
        let value = request.parameters.get(err.index).cloned().unwrap_or(Value::Null);
        conversion_fault(err.index, &value, &destination).with_cause(ErrorCause::from_error(&err))
    })?;

    Ok(PreparedCall {
        descriptor: descriptor.clone(),
        invocation,
    })
}

fn conversion_fault(index: usize, value: &Value, destination: &TypeRef) -> Fault {
    Fault::bad_request(format!(
        "Cannot convert value of parameter 'arg{}' ({}) from {} to {}",
        index,
        value,
        value.type_name(),
        destination
    ))
}

/// Turn one either/or descriptor pair into concrete types.
///
/// Absent on both sides means "none declared".
fn resolve_descriptors(
    explicit: Option<Vec<TypeRef>>,
    by_name: Option<Vec<NamedTypeRef>>,
    fields: (&str, &str),
    types: &TypeRegistry,
) -> Result<Vec<TypeRef>, Fault> {
    match (explicit, by_name) {
        (Some(_), Some(_)) => Err(Fault::bad_request(format!(
            "Only one of {} and {} should be set",
            fields.0, fields.1
        ))),
        (Some(explicit), None) => Ok(explicit),
        (None, Some(by_name)) => by_name
            .iter()
            .map(|named| {
                types.resolve(named).ok_or_else(|| {
                    Fault::bad_request(format!(
                        "Unable to resolve type '{}' from module '{}'",
                        named.type_full_name, named.module_name
                    ))
                })
            })
            .collect(),
        (None, None) => Ok(Vec::new()),
    }
}

fn find_overload<'a>(
    service: &'a Service,
    name: &'a str,
    argument_count: usize,
    parameter_types: &[TypeRef],
    generic_arguments: &[TypeRef],
) -> Option<&'a MethodEntry> {
    service.overloads(name).find(|entry| {
        let descriptor = &entry.descriptor;
        descriptor.parameter_types.len() == argument_count
            && descriptor.generic_arguments == generic_arguments
            && descriptor
                .parameter_types
                .iter()
                .enumerate()
                .all(|(position, declared)| {
                    match (declared.substitute(generic_arguments), parameter_types.get(position)) {
                        (Some(expected), Some(requested)) => expected == *requested,
                        _ => false,
                    }
                })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Status;
    use crate::value::DefaultValueConverter;

    fn service() -> Service {
        Service::builder("Calculator")
            .sync_method("Add", |a: i32, b: i32| Ok(format!("i32:{}", a + b)))
            .sync_method("Add", |a: f64, b: f64| Ok(format!("f64:{}", a + b)))
            .sync_method("Add", |a: i32, b: i32, c: i32| Ok(format!("i32x3:{}", a + b + c)))
            .generic_method(
                "Echo",
                vec![TypeRef::Generic(0)],
                vec![TypeRef::I64],
                |value: i64| async move { Ok(format!("i64:{}", value)) },
            )
            .generic_method(
                "Echo",
                vec![TypeRef::Generic(0)],
                vec![TypeRef::String],
                |value: String| async move { Ok(format!("string:{}", value)) },
            )
            .build()
    }

    fn prepare(request: Request) -> Result<PreparedCall, Fault> {
        prepare_call(&service(), request, &TypeRegistry::new(), &DefaultValueConverter)
    }

    async fn run(request: Request) -> Value {
        prepare(request).unwrap().invocation.await.unwrap()
    }

    #[tokio::test]
    async fn test_overload_chosen_by_declared_types() {
        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1), Value::Int(2)])
            .with_parameter_types(vec![TypeRef::F64, TypeRef::F64]);
        assert_eq!(run(request).await, Value::from("f64:3"));

        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1), Value::Int(2)])
            .with_parameter_types(vec![TypeRef::I32, TypeRef::I32]);
        assert_eq!(run(request).await, Value::from("i32:3"));
    }

    #[tokio::test]
    async fn test_overload_chosen_by_arity() {
        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .with_parameter_types(vec![TypeRef::I32; 3]);
        assert_eq!(run(request).await, Value::from("i32x3:6"));
    }

    #[test]
    fn test_partial_type_match_is_rejected() {
        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1), Value::Int(2)])
            .with_parameter_types(vec![TypeRef::I32, TypeRef::F64]);
        let fault = prepare(request).unwrap_err();
        assert_eq!(fault.status, Status::BadRequest);
        assert_eq!(
            fault.message.as_deref(),
            Some("Method 'Add' not found in interface 'Calculator'")
        );
    }

    #[test]
    fn test_arity_mismatch_matches_nothing() {
        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1)])
            .with_parameter_types(vec![TypeRef::I32]);
        assert_eq!(prepare(request).unwrap_err().status, Status::BadRequest);
    }

    #[test]
    fn test_missing_declared_types_match_nothing() {
        let request = Request::new("Add").with_parameters(vec![Value::Int(1), Value::Int(2)]);
        assert!(prepare(request).is_err());
    }

    #[tokio::test]
    async fn test_generic_instantiation_selected_by_generic_argument() {
        let request = Request::new("Echo")
            .with_parameters(vec![Value::from("hi")])
            .with_parameter_types(vec![TypeRef::String])
            .with_generic_arguments(vec![TypeRef::String]);
        assert_eq!(run(request).await, Value::from("string:hi"));

        let request = Request::new("Echo")
            .with_parameters(vec![Value::Int(5)])
            .with_parameter_types(vec![TypeRef::I64])
            .with_generic_arguments(vec![TypeRef::I64]);
        assert_eq!(run(request).await, Value::from("i64:5"));
    }

    #[test]
    fn test_unregistered_instantiation_matches_nothing() {
        let request = Request::new("Echo")
            .with_parameters(vec![Value::Bool(true)])
            .with_parameter_types(vec![TypeRef::Bool])
            .with_generic_arguments(vec![TypeRef::Bool]);
        let fault = prepare(request).unwrap_err();
        assert_eq!(fault.status, Status::BadRequest);
        assert_eq!(
            fault.message.as_deref(),
            Some("Method 'Echo' not found in interface 'Calculator'")
        );
    }

    #[test]
    fn test_generic_arity_must_match() {
        let request = Request::new("Echo")
            .with_parameters(vec![Value::Int(5)])
            .with_parameter_types(vec![TypeRef::I64]);
        assert!(prepare(request).is_err());
    }

    #[test]
    fn test_both_descriptor_forms_rejected() {
        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1), Value::Int(2)])
            .with_parameter_types(vec![TypeRef::I32, TypeRef::I32])
            .with_parameter_types_by_name(vec![
                NamedTypeRef::new("i32", "core"),
                NamedTypeRef::new("i32", "core"),
            ]);
        let fault = prepare(request).unwrap_err();
        assert_eq!(
            fault.message.as_deref(),
            Some("Only one of parameterTypes and parameterTypesByName should be set")
        );

        let request = Request::new("Echo")
            .with_generic_arguments(vec![TypeRef::I64])
            .with_generic_arguments_by_name(vec![NamedTypeRef::new("i64", "core")]);
        assert!(prepare(request)
            .unwrap_err()
            .message
            .unwrap()
            .contains("genericArgumentsByName"));
    }

    #[tokio::test]
    async fn test_by_name_descriptors() {
        let request = Request::new("Echo")
            .with_parameters(vec![Value::Int(9)])
            .with_parameter_types_by_name(vec![NamedTypeRef::new("i64", "core")])
            .with_generic_arguments_by_name(vec![NamedTypeRef::new("i64", "core")]);
        assert_eq!(run(request).await, Value::from("i64:9"));
    }

    #[test]
    fn test_unresolvable_by_name_is_bad_request() {
        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1), Value::Int(2)])
            .with_parameter_types_by_name(vec![
                NamedTypeRef::new("Nope", "nowhere"),
                NamedTypeRef::new("i32", "core"),
            ]);
        let fault = prepare(request).unwrap_err();
        assert_eq!(fault.status, Status::BadRequest);
        assert_eq!(
            fault.message.as_deref(),
            Some("Unable to resolve type 'Nope' from module 'nowhere'")
        );
    }

    #[test]
    fn test_conversion_failure_names_parameter() {
        let request = Request::new("Add")
            .with_parameters(vec![Value::Int(1), Value::from("two")])
            .with_parameter_types(vec![TypeRef::I32, TypeRef::I32]);
        let fault = prepare(request).unwrap_err();
        assert_eq!(
            fault.message.as_deref(),
            Some("Cannot convert value of parameter 'arg1' (two) from String to i32")
        );
    }
}
