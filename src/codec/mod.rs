//! Codec module - pluggable message serializers.
//!
//! The rest of the crate only depends on the byte-array contract of
//! [`MessageSerializer`]. Two implementations ship with the crate:
//!
//! - [`JsonSerializer`] - textual JSON (default)
//! - [`MsgPackSerializer`] - MessagePack using `rmp-serde` (`to_vec_named`)
//!
//! Both keep the concrete run-time shape of every [`Value`](crate::Value)
//! because values are tagged with their kind (`{"$type": "Int", "value": 5}`).
//!
//! # Example
//!
//! ```
//! use wirecall::codec::{JsonSerializer, MessageSerializer};
//! use wirecall::message::Request;
//!
//! let serializer = JsonSerializer;
//! let request = Request::new("Ping");
//! let bytes = serializer.serialize_request(&request).unwrap();
//! assert_eq!(serializer.deserialize_request(&bytes).unwrap(), request);
//! ```

mod json;
mod msgpack;

use std::sync::Arc;

pub use json::JsonSerializer;
pub use msgpack::MsgPackSerializer;

use crate::error::Result;
use crate::message::{Request, Response};

/// Message used when decoding fails.
pub(crate) const DESERIALIZE_FAILED: &str = "Failed to deserialize IPC message";

/// Message used when encoding fails.
pub(crate) const SERIALIZE_FAILED: &str = "Failed to serialize IPC message";

/// Converts requests and responses to and from frame payloads.
///
/// Every failure must surface as [`IpcError::Serialization`](crate::IpcError::Serialization)
/// wrapping the underlying cause.
pub trait MessageSerializer: Send + Sync + 'static {
    /// Encode a request.
    fn serialize_request(&self, request: &Request) -> Result<Vec<u8>>;

    /// Decode a request.
    fn deserialize_request(&self, bytes: &[u8]) -> Result<Request>;

    /// Encode a response.
    fn serialize_response(&self, response: &Response) -> Result<Vec<u8>>;

    /// Decode a response.
    fn deserialize_response(&self, bytes: &[u8]) -> Result<Response>;
}

/// Shared serializer handle stored in endpoint and client options.
pub type SharedSerializer = Arc<dyn MessageSerializer>;
