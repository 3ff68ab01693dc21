//! JSON serializer using `serde_json`.

use super::{MessageSerializer, DESERIALIZE_FAILED, SERIALIZE_FAILED};
use crate::error::{IpcError, Result};
use crate::message::{Request, Response};

/// Textual JSON serializer. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| IpcError::serialization(SERIALIZE_FAILED, e))
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| IpcError::serialization(DESERIALIZE_FAILED, e))
    }
}

impl MessageSerializer for JsonSerializer {
    fn serialize_request(&self, request: &Request) -> Result<Vec<u8>> {
        Self::encode(request)
    }

    fn deserialize_request(&self, bytes: &[u8]) -> Result<Request> {
        Self::decode(bytes)
    }

    fn serialize_response(&self, response: &Response) -> Result<Vec<u8>> {
        Self::encode(response)
    }

    fn deserialize_response(&self, bytes: &[u8]) -> Result<Response> {
        Self::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ErrorCause, Status};
    use crate::value::{TypeRef, Value};

    #[test]
    fn test_request_field_names() {
        let request = Request::new("StringType")
            .with_parameters(vec![Value::String("abc".into())])
            .with_parameter_types(vec![TypeRef::String]);
        let bytes = JsonSerializer.serialize_request(&request).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["methodName"], "StringType");
        assert_eq!(json["parameters"][0]["$type"], "String");
        assert_eq!(json["parameters"][0]["value"], "abc");
        assert!(json.get("parameterTypesByName").is_none());
        assert!(json.get("genericArguments").is_none());
    }

    #[test]
    fn test_response_keeps_concrete_value_kind() {
        let response = Response::success(Some(Value::UInt(7)));
        let bytes = JsonSerializer.serialize_response(&response).unwrap();
        let decoded = JsonSerializer.deserialize_response(&bytes).unwrap();
        assert_eq!(decoded.data(), Some(&Value::UInt(7)));
    }

    #[test]
    fn test_fault_response_round_trip() {
        let cause = ErrorCause::new("disk full").with_cause(ErrorCause::new("quota"));
        let response = Response::internal_server_error(Some("boom".into()), Some(cause.clone()));
        let bytes = JsonSerializer.serialize_response(&response).unwrap();
        let decoded = JsonSerializer.deserialize_response(&bytes).unwrap();

        assert_eq!(decoded.status(), Status::InternalServerError);
        assert_eq!(decoded.error_message(), Some("boom"));
        assert_eq!(decoded.cause(), Some(&cause));
    }

    #[test]
    fn test_malformed_input_is_serialization_error() {
        let err = JsonSerializer.deserialize_request(b"{not json").unwrap_err();
        assert!(err.is_serialization());
        assert_eq!(err.to_string(), DESERIALIZE_FAILED);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_missing_method_name_is_rejected() {
        let err = JsonSerializer.deserialize_request(br#"{"parameters": []}"#).unwrap_err();
        assert!(err.is_serialization());
    }
}
