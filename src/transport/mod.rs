//! Transport module - duplex byte streams per exchange.
//!
//! The core never touches sockets directly. It asks a [`Listener`] (server)
//! or a [`Connector`] (client) for one stream per exchange, optionally wraps
//! it with a [`StreamTransform`], and performs exactly one
//! request-then-response cycle on it.
//!
//! Provided transports:
//! - [`PipeListener`] / [`PipeConnector`] - Unix domain sockets, Windows named pipes
//! - [`MemoryListener`] / [`MemoryConnector`] - in-process duplex streams

mod memory;
mod pipe;

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

pub use memory::{memory_transport, MemoryConnector, MemoryListener, DEFAULT_BUFFER_SIZE};
pub use pipe::{generate_pipe_path, PipeConnector, PipeListener, RETRY_DELAY};

/// Any bidirectional byte stream an exchange can run on.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Type-erased stream, the input and output of a [`StreamTransform`].
pub type BoxStream = Box<dyn AsyncStream>;

/// Wraps the raw stream of an exchange, e.g. for obfuscation or encryption.
///
/// Both ends of an exchange must apply matching transforms.
pub type StreamTransform = Arc<dyn Fn(BoxStream) -> BoxStream + Send + Sync>;

/// Apply an optional transform to a freshly opened stream.
pub(crate) fn apply_transform(stream: BoxStream, transform: Option<&StreamTransform>) -> BoxStream {
    match transform {
        Some(transform) => transform(stream),
        None => stream,
    }
}

/// Server side of a transport: yields one stream per incoming exchange.
pub trait Listener: Send + Sync + 'static {
    type Stream: AsyncStream;

    /// Wait for the next connection.
    fn accept(&self) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Client side of a transport: opens one stream per call.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncStream;

    /// Open a connection. May wait for the server to appear; the caller bounds
    /// the wait with its connection timeout.
    fn connect(&self) -> impl Future<Output = Result<Self::Stream>> + Send;
}
