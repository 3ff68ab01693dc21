//! In-process transport over `tokio::io::duplex` pairs.
//!
//! # Example
//!
//! ```
//! use wirecall::transport::{memory_transport, Connector, Listener};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> wirecall::error::Result<()> {
//! let (listener, connector) = memory_transport(16);
//! let client = connector.connect().await?;
//! let server = listener.accept().await?;
//! # drop((client, server));
//! # Ok(())
//! # }
//! ```

use std::io;

use tokio::io::DuplexStream;
use tokio::sync::{mpsc, Mutex};

use super::{Connector, Listener};
use crate::error::{IpcError, Result};

/// Per-direction buffer of each in-memory stream (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Create a connected listener/connector pair.
///
/// `backlog` bounds how many connections may wait to be accepted.
pub fn memory_transport(backlog: usize) -> (MemoryListener, MemoryConnector) {
    let (tx, rx) = mpsc::channel(backlog.max(1));
    (
        MemoryListener {
            incoming: Mutex::new(rx),
        },
        MemoryConnector {
            outgoing: tx,
            buffer_size: DEFAULT_BUFFER_SIZE,
        },
    )
}

/// Accepting half of an in-memory transport.
#[derive(Debug)]
pub struct MemoryListener {
    incoming: Mutex<mpsc::Receiver<DuplexStream>>,
}

impl Listener for MemoryListener {
    type Stream = DuplexStream;

    async fn accept(&self) -> Result<DuplexStream> {
        self.incoming
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| IpcError::ListenerClosed("every memory connector was dropped".into()))
    }
}

/// Connecting half of an in-memory transport. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    outgoing: mpsc::Sender<DuplexStream>,
    buffer_size: usize,
}

impl MemoryConnector {
    /// Use a different per-direction buffer size for new streams.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

impl Connector for MemoryConnector {
    type Stream = DuplexStream;

    async fn connect(&self) -> Result<DuplexStream> {
        let (local, remote) = tokio::io::duplex(self.buffer_size);
        self.outgoing.send(remote).await.map_err(|_| {
            IpcError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "memory listener was dropped",
            ))
        })?;
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn test_connect_then_accept_are_joined() {
        let (listener, connector) = memory_transport(4);
        let mut client = connector.connect().await.unwrap();
        let mut server = listener.accept().await.unwrap();

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_dropped_listener_refuses_connections() {
        let (listener, connector) = memory_transport(1);
        drop(listener);
        let err = connector.connect().await.unwrap_err();
        assert!(err.is_communication());
    }

    #[tokio::test]
    async fn test_dropped_connectors_end_accept() {
        let (listener, connector) = memory_transport(1);
        drop(connector);
        let err = listener.accept().await.unwrap_err();
        assert!(matches!(err, IpcError::ListenerClosed(_)));
    }
}
