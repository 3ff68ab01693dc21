//! Framed request/response channel over one stream.

use tokio::io::{AsyncRead, AsyncWrite};

use super::frame::{read_message, write_message};
use crate::codec::SharedSerializer;
use crate::error::Result;
use crate::message::{Request, Response};

/// One exchange's view of a stream: whole messages in, whole messages out.
///
/// Serializer failures surface as [`IpcError::Serialization`](crate::IpcError::Serialization),
/// framing and transport failures as the communication-class variants.
pub struct MessageChannel<S> {
    stream: S,
    serializer: SharedSerializer,
    max_message_size: u32,
}

impl<S> MessageChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, serializer: SharedSerializer, max_message_size: u32) -> Self {
        Self {
            stream,
            serializer,
            max_message_size,
        }
    }

    pub async fn write_request(&mut self, request: &Request) -> Result<()> {
        let payload = self.serializer.serialize_request(request)?;
        write_message(&mut self.stream, &payload).await
    }

    pub async fn read_request(&mut self) -> Result<Request> {
        let payload = read_message(&mut self.stream, self.max_message_size).await?;
        self.serializer.deserialize_request(&payload)
    }

    pub async fn write_response(&mut self, response: &Response) -> Result<()> {
        let payload = self.serializer.serialize_response(response)?;
        write_message(&mut self.stream, &payload).await
    }

    pub async fn read_response(&mut self) -> Result<Response> {
        let payload = read_message(&mut self.stream, self.max_message_size).await?;
        self.serializer.deserialize_response(&payload)
    }

    /// Give the stream back, e.g. to shut it down.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> std::fmt::Debug for MessageChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("max_message_size", &self.max_message_size)
            .finish_non_exhaustive()
    }
}
