//! Runs several endpoints under one shutdown token.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wirecall::handler::Service;
//! use wirecall::transport::PipeListener;
//! use wirecall::{Endpoint, EndpointOptions, IpcHost};
//!
//! # async fn run() -> wirecall::error::Result<()> {
//! let greeter = Arc::new(
//!     Service::builder("Greeter")
//!         .method("Greet", |name: String| async move { Ok(format!("Hello, {}!", name)) })
//!         .build(),
//! );
//! let listener = PipeListener::bind("/tmp/greeter.sock").await?;
//!
//! let handle = IpcHost::new()
//!     .add_endpoint(Endpoint::new("Greeter", listener, greeter, EndpointOptions::default()))
//!     .spawn();
//! // ...
//! handle.stop().await
//! # }
//! ```

use std::fmt;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{IpcError, Result};
use crate::handler::BoxFuture;
use crate::server::Endpoint;
use crate::transport::Listener;

type EndpointRunner = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<()>> + Send>;

/// A set of endpoints started and stopped together.
#[derive(Default)]
pub struct IpcHost {
    endpoints: Vec<(String, EndpointRunner)>,
}

impl IpcHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_endpoint<L: Listener>(mut self, endpoint: Endpoint<L>) -> Self {
        let contract = endpoint.contract().to_string();
        self.endpoints.push((
            contract,
            Box::new(move |shutdown| Box::pin(endpoint.run(shutdown))),
        ));
        self
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Run every endpoint until `shutdown` is cancelled.
    ///
    /// If one endpoint fails, the others are stopped and its error is
    /// returned once they have drained.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let mut tasks = JoinSet::new();
        for (contract, runner) in self.endpoints {
            let token = shutdown.child_token();
            tasks.spawn(async move { (contract, runner(token).await) });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((_, Ok(()))) => None,
                Ok((contract, Err(e))) => {
                    tracing::error!(contract = %contract, "endpoint failed: {}", e);
                    Some(e)
                }
                Err(e) => {
                    tracing::error!("endpoint task failed: {}", e);
                    Some(IpcError::InvalidOperation(format!("endpoint task failed: {}", e)))
                }
            };

            if let Some(e) = failure {
                shutdown.cancel();
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run the host in the background.
    pub fn spawn(self) -> HostHandle {
        let token = CancellationToken::new();
        let join = tokio::spawn(self.run(token.clone()));
        HostHandle { token, join }
    }
}

impl fmt::Debug for IpcHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.endpoints.iter().map(|(contract, _)| contract))
            .finish()
    }
}

/// Handle to a host started with [`IpcHost::spawn`].
#[derive(Debug)]
pub struct HostHandle {
    token: CancellationToken,
    join: JoinHandle<Result<()>>,
}

impl HostHandle {
    /// Token that stops the host when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop every endpoint and wait for in-flight exchanges to finish.
    pub async fn stop(self) -> Result<()> {
        self.token.cancel();
        self.join
            .await
            .map_err(|e| IpcError::InvalidOperation(format!("host task failed: {}", e)))?
    }
}
