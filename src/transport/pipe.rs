//! Platform-specific pipe/socket implementation.
//!
//! - Unix: Unix Domain Socket
//! - Windows: Named Pipe
//!
//! # Example
//!
//! ```ignore
//! use wirecall::transport::{generate_pipe_path, Listener, PipeListener};
//!
//! let path = generate_pipe_path();
//! let listener = PipeListener::bind(&path).await?;
//! let stream = listener.accept().await?;
//! ```

use std::time::Duration;

/// Pause between connection attempts while the server is not there yet.
pub const RETRY_DELAY: Duration = Duration::from_millis(20);

/// Generate a unique pipe path for this process.
///
/// Format:
/// - Unix: `/tmp/wirecall-{pid}-{uuid}.sock`
/// - Windows: `\\.\pipe\wirecall-{pid}-{uuid}`
pub fn generate_pipe_path() -> String {
    let pid = std::process::id();
    let unique = uuid::Uuid::new_v4().simple();

    #[cfg(unix)]
    {
        format!("/tmp/wirecall-{}-{}.sock", pid, unique)
    }

    #[cfg(windows)]
    {
        format!(r"\\.\pipe\wirecall-{}-{}", pid, unique)
    }
}

/// Connector that opens a pipe by path.
///
/// Keeps retrying every [`RETRY_DELAY`] while the pipe does not exist yet or
/// is busy, so the caller's connection timeout decides how long to wait.
#[derive(Debug, Clone)]
pub struct PipeConnector {
    path: String,
}

impl PipeConnector {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use std::io::ErrorKind;
    use std::path::Path;

    use tokio::net::{UnixListener, UnixStream};

    use super::{PipeConnector, RETRY_DELAY};
    use crate::error::Result;
    use crate::transport::{Connector, Listener};

    /// Unix Domain Socket listener. Removes its socket file on drop.
    #[derive(Debug)]
    pub struct PipeListener {
        listener: UnixListener,
        path: String,
    }

    impl PipeListener {
        /// Bind to a Unix socket path.
        ///
        /// Removes any existing socket file at the path before binding.
        pub async fn bind(path: &str) -> Result<Self> {
            if Path::new(path).exists() {
                std::fs::remove_file(path)?;
            }

            let listener = UnixListener::bind(path)?;

            Ok(Self {
                listener,
                path: path.to_string(),
            })
        }

        /// Get the socket path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl Listener for PipeListener {
        type Stream = UnixStream;

        async fn accept(&self) -> Result<UnixStream> {
            let (stream, _addr) = self.listener.accept().await?;
            Ok(stream)
        }
    }

    impl Drop for PipeListener {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    impl Connector for PipeConnector {
        type Stream = UnixStream;

        async fn connect(&self) -> Result<UnixStream> {
            loop {
                match UnixStream::connect(&self.path).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => {
                        tracing::trace!(path = %self.path, "pipe not available yet, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod windows_impl {
    use std::io::ErrorKind;

    use tokio::net::windows::named_pipe::{
        ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions,
    };
    use tokio::sync::Mutex;

    use super::{PipeConnector, RETRY_DELAY};
    use crate::error::Result;
    use crate::transport::{Connector, Listener};

    /// All pipe instances are busy.
    const ERROR_PIPE_BUSY: i32 = 231;

    /// Windows Named Pipe listener.
    ///
    /// Always keeps one unconnected instance open so clients can find the pipe
    /// between two accepts.
    #[derive(Debug)]
    pub struct PipeListener {
        path: String,
        next: Mutex<Option<NamedPipeServer>>,
    }

    impl PipeListener {
        /// Create the first Named Pipe instance.
        pub async fn bind(path: &str) -> Result<Self> {
            let first = ServerOptions::new()
                .first_pipe_instance(true)
                .create(path)?;

            Ok(Self {
                path: path.to_string(),
                next: Mutex::new(Some(first)),
            })
        }

        /// Get the pipe path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl Listener for PipeListener {
        type Stream = NamedPipeServer;

        async fn accept(&self) -> Result<NamedPipeServer> {
            let mut next = self.next.lock().await;
            let server = match next.take() {
                Some(server) => server,
                None => ServerOptions::new().create(&self.path)?,
            };

            server.connect().await?;
            *next = Some(ServerOptions::new().create(&self.path)?);
            Ok(server)
        }
    }

    impl Connector for PipeConnector {
        type Stream = NamedPipeClient;

        async fn connect(&self) -> Result<NamedPipeClient> {
            loop {
                match ClientOptions::new().open(&self.path) {
                    Ok(client) => return Ok(client),
                    Err(e)
                        if e.kind() == ErrorKind::NotFound
                            || e.raw_os_error() == Some(ERROR_PIPE_BUSY) =>
                    {
                        tracing::trace!(path = %self.path, "pipe not available yet, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

// ============================================================================
// Platform-independent re-exports
// ============================================================================

#[cfg(unix)]
pub use unix_impl::PipeListener;

#[cfg(windows)]
pub use windows_impl::PipeListener;
