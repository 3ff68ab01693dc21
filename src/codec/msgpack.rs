//! MessagePack serializer using `rmp-serde`.
//!
//! Always uses `to_vec_named`, so structs travel as maps keyed by field name.
//! The adjacently tagged [`Value`](crate::Value) layout depends on named fields.

use super::{MessageSerializer, DESERIALIZE_FAILED, SERIALIZE_FAILED};
use crate::error::{IpcError, Result};
use crate::message::{Request, Response};

/// Binary MessagePack serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl MsgPackSerializer {
    #[inline]
    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| IpcError::serialization(SERIALIZE_FAILED, e))
    }

    #[inline]
    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        rmp_serde::from_slice(bytes).map_err(|e| IpcError::serialization(DESERIALIZE_FAILED, e))
    }
}

impl MessageSerializer for MsgPackSerializer {
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
