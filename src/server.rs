//! Server endpoint: accept loop, admission control and per-exchange dispatch.
//!
//! An [`Endpoint`] binds one contract to one [`Listener`]. For every accepted
//! stream it runs a single exchange:
//!
//! ```text
//! Idle -> Reading -> Resolving -> Invoking -> Writing -> Done
//!   \________\___________\___________\__________\-----> Aborted
//! ```
//!
//! At most [`EndpointOptions::max_concurrent_calls`] exchanges are in flight.
//! The accept loop waits for a permit before it waits for the next
//! connection, and the permit is dropped when the exchange task ends, however
//! it ends.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use wirecall::handler::Service;
//! use wirecall::transport::PipeListener;
//! use wirecall::{Endpoint, EndpointOptions};
//!
//! # async fn run() -> wirecall::error::Result<()> {
//! let service = Arc::new(
//!     Service::builder("Echo")
//!         .method("Echo", |text: String| async move { Ok(text) })
//!         .build(),
//! );
//! let listener = PipeListener::bind("/tmp/echo.sock").await?;
//! let endpoint = Endpoint::new("Echo", listener, service, EndpointOptions::default());
//! endpoint.run(CancellationToken::new()).await
//! # }
//! ```

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::codec::{JsonSerializer, SharedSerializer};
use crate::error::{IpcError, Result};
use crate::handler::{prepare_call, InvokeError, PreparedCall, ServiceProvider, TypeRegistry};
use crate::message::{ErrorCause, Fault, Request, Response, Status};
use crate::protocol::{MessageChannel, DEFAULT_MAX_MESSAGE_SIZE};
use crate::transport::{apply_transform, BoxStream, Listener, StreamTransform};
use crate::value::{DefaultValueConverter, SharedConverter, TypeRef};

/// Default number of exchanges allowed in flight.
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 4;

/// Pause after a failed accept before waiting for the next connection.
pub const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(50);

/// How long a cancelled exchange may spend writing its cancellation fault.
pub const CANCELLED_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

const FAILED_TO_DESERIALIZE_REQUEST: &str = "Failed to deserialize request";
const FAILED_TO_SERIALIZE_RESPONSE: &str = "Failed to serialize response";
const REQUEST_CANCELLED: &str = "IPC request process cancelled";
const UNEXPECTED_PANIC: &str = "Unexpected panic raised from user code";

/// Server-side configuration, fixed once the endpoint is built.
#[derive(Clone)]
pub struct EndpointOptions {
    /// Upper bound on concurrently running exchanges. Default: 4
    pub max_concurrent_calls: usize,
    /// Send internal error messages and cause chains to clients. Default: false
    pub include_failure_details_in_response: bool,
    /// Wraps every accepted stream before any byte is read.
    pub stream_transform: Option<StreamTransform>,
    pub serializer: SharedSerializer,
    pub value_converter: SharedConverter,
    /// Types clients may name in by-name descriptors.
    pub type_registry: Arc<TypeRegistry>,
    /// Largest accepted request frame. Default: 64 MiB
    pub max_message_size: u32,
}

impl EndpointOptions {
    pub fn new() -> Self {
        Self {
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            include_failure_details_in_response: false,
            stream_transform: None,
            serializer: Arc::new(JsonSerializer),
            value_converter: Arc::new(DefaultValueConverter),
            type_registry: Arc::new(TypeRegistry::new()),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Set the maximum number of concurrent exchanges (at least 1).
    pub fn max_concurrent_calls(mut self, limit: usize) -> Self {
        self.max_concurrent_calls = limit.max(1);
        self
    }

    pub fn include_failure_details(mut self, include: bool) -> Self {
        self.include_failure_details_in_response = include;
        self
    }

    pub fn stream_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(BoxStream) -> BoxStream + Send + Sync + 'static,
    {
        self.stream_transform = Some(Arc::new(transform));
        self
    }

    pub fn serializer(mut self, serializer: SharedSerializer) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn value_converter(mut self, converter: SharedConverter) -> Self {
        self.value_converter = converter;
        self
    }

    pub fn type_registry(mut self, registry: TypeRegistry) -> Self {
        self.type_registry = Arc::new(registry);
        self
    }

    pub fn max_message_size(mut self, size: u32) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EndpointOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointOptions")
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .field(
                "include_failure_details_in_response",
                &self.include_failure_details_in_response,
            )
            .field("stream_transform", &self.stream_transform.is_some())
            .field("type_registry", &self.type_registry)
            .field("max_message_size", &self.max_message_size)
            .finish_non_exhaustive()
    }
}

/// Where an exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    Idle,
    Reading,
    Resolving,
    Invoking,
    Writing,
    Done,
    Aborted,
}

impl ExchangeState {
    fn advance(&mut self, next: ExchangeState) {
        tracing::trace!(from = ?*self, to = ?next, "exchange state");
        *self = next;
    }
}

/// What the processing stages decided to do with the exchange.
enum Outcome {
    Respond(Response),
    Abandon(IpcError),
}

/// Everything an exchange task needs, shared by all of them.
struct Dispatcher {
    contract: String,
    provider: Arc<dyn ServiceProvider>,
    options: EndpointOptions,
}

/// Serves one contract on one listener.
pub struct Endpoint<L: Listener> {
    listener: L,
    dispatcher: Arc<Dispatcher>,
}

impl<L: Listener> Endpoint<L> {
    pub fn new<P>(contract: impl Into<String>, listener: L, provider: P, options: EndpointOptions) -> Self
    where
        P: ServiceProvider,
    {
        Self {
            listener,
            dispatcher: Arc::new(Dispatcher {
                contract: contract.into(),
                provider: Arc::new(provider),
                options,
            }),
        }
    }

    pub fn contract(&self) -> &str {
        &self.dispatcher.contract
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.dispatcher.options
    }

    /// Accept and serve exchanges until `shutdown` is cancelled.
    ///
    /// On shutdown, in-flight exchanges see the cancellation and this method
    /// returns once all of them have finished.
    ///
    /// A failed accept is logged and the loop keeps serving.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::ListenerClosed`] once the listener can yield no
    /// more connections.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let limit = self
            .dispatcher
            .options
            .max_concurrent_calls
            .clamp(1, u32::MAX as usize);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut next_id: u64 = 0;

        tracing::info!(
            contract = %self.dispatcher.contract,
            max_concurrent_calls = limit,
            "endpoint started"
        );

        let result = loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break Ok(()),
                },
            };

            let stream = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                accepted = self.listener.accept() => match accepted {
                    Ok(stream) => stream,
                    Err(e @ IpcError::ListenerClosed(_)) => {
                        tracing::error!(contract = %self.dispatcher.contract, "listener closed: {}", e);
                        break Err(e);
                    }
                    Err(e) => {
                        tracing::error!(contract = %self.dispatcher.contract, "Error occurred: {}", e);
                        drop(permit);
                        tokio::select! {
                            _ = shutdown.cancelled() => break Ok(()),
                            _ = tokio::time::sleep(ACCEPT_ERROR_DELAY) => continue,
                        }
                    }
                },
            };

            next_id += 1;
            let span = tracing::info_span!(
                "exchange",
                id = next_id,
                contract = %self.dispatcher.contract
            );
            let dispatcher = Arc::clone(&self.dispatcher);
            let cancel = shutdown.child_token();

            tokio::spawn(
                async move {
                    // Permit is held until this task completes
                    let _permit = permit;
                    dispatcher.serve(Box::new(stream), cancel).await;
                }
                .instrument(span),
            );
        };

        // Wait for every in-flight exchange to give its permit back.
        let _ = semaphore.acquire_many(limit as u32).await;
        tracing::info!(contract = %self.dispatcher.contract, "endpoint stopped");
        result
    }
}

impl<L: Listener> fmt::Debug for Endpoint<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("contract", &self.dispatcher.contract)
            .field("options", &self.dispatcher.options)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Run one exchange to completion. Never fails: every outcome is either
    /// written back or logged.
    async fn serve(&self, stream: BoxStream, cancel: CancellationToken) {
        let stream = apply_transform(stream, self.options.stream_transform.as_ref());
        let mut channel = MessageChannel::new(
            stream,
            Arc::clone(&self.options.serializer),
            self.options.max_message_size,
        );
        let mut state = ExchangeState::Idle;

        tracing::debug!("client connected, reading request");
        let response = match self.process(&mut channel, &mut state, &cancel).await {
            Outcome::Respond(response) => response,
            Outcome::Abandon(e) => {
                self.abandon(&mut state, &e);
                return;
            }
        };

        state.advance(ExchangeState::Writing);
        match self.write(&mut channel, &response, &cancel).await {
            Ok(()) => {
                state.advance(ExchangeState::Done);
                tracing::debug!(status = ?response.status(), "process finished");
            }
            Err(e) if e.is_serialization() => {
                tracing::error!("{}: {}", FAILED_TO_SERIALIZE_RESPONSE, e);
                let fallback = self.fault_response(
                    Fault::internal_server_error(FAILED_TO_SERIALIZE_RESPONSE)
                        .with_cause(ErrorCause::from_error(&e)),
                );
                match self.write(&mut channel, &fallback, &cancel).await {
                    Ok(()) => state.advance(ExchangeState::Done),
                    Err(e) => self.abandon(&mut state, &e),
                }
            }
            Err(e) => self.abandon(&mut state, &e),
        }
    }

    /// Read, resolve and invoke. Produces the response to write, or the
    /// reason the exchange cannot continue.
    async fn process(
        &self,
        channel: &mut MessageChannel<BoxStream>,
        state: &mut ExchangeState,
        cancel: &CancellationToken,
    ) -> Outcome {
        state.advance(ExchangeState::Reading);
        let request = tokio::select! {
            _ = cancel.cancelled() => return Outcome::Abandon(IpcError::Cancelled),
            read = channel.read_request() => match read {
                Ok(request) => request,
                Err(e) if e.is_serialization() => {
                    tracing::error!("{}: {}", FAILED_TO_DESERIALIZE_REQUEST, e);
                    return Outcome::Respond(self.fault_response(
                        Fault::bad_request(FAILED_TO_DESERIALIZE_REQUEST)
                            .with_cause(ErrorCause::from_error(&e)),
                    ));
                }
                Err(e) => return Outcome::Abandon(e),
            },
        };

        if cancel.is_cancelled() {
            return Outcome::Respond(self.cancelled_response());
        }

        state.advance(ExchangeState::Resolving);
        tracing::debug!(method = %request.method_name, "request received");
        let prepared = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(fault) => return Outcome::Respond(self.failed(fault)),
        };

        if cancel.is_cancelled() {
            return Outcome::Respond(self.cancelled_response());
        }

        state.advance(ExchangeState::Invoking);
        tracing::debug!(method = %prepared.descriptor.name, "invoking");
        let result = tokio::select! {
            _ = cancel.cancelled() => return Outcome::Respond(self.cancelled_response()),
            result = invoke(prepared) => result,
        };

        if cancel.is_cancelled() {
            return Outcome::Respond(self.cancelled_response());
        }
        match result {
            Ok(response) => Outcome::Respond(response),
            Err(fault) => Outcome::Respond(self.failed(fault)),
        }
    }

    /// Find the service and the overload, and bind the arguments.
    fn prepare(&self, request: Request) -> std::result::Result<PreparedCall, Fault> {
        let service = self.provider.get_service(&self.contract).ok_or_else(|| {
            Fault::bad_request(format!(
                "No implementation of interface '{}' found",
                self.contract
            ))
        })?;

        prepare_call(
            &service,
            request,
            &self.options.type_registry,
            self.options.value_converter.as_ref(),
        )
    }

    /// Write `response`, racing the cancellation token. A response written
    /// after cancellation only gets [`CANCELLED_WRITE_TIMEOUT`].
    async fn write(
        &self,
        channel: &mut MessageChannel<BoxStream>,
        response: &Response,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return tokio::time::timeout(CANCELLED_WRITE_TIMEOUT, channel.write_response(response))
                .await
                .unwrap_or(Err(IpcError::Timeout(CANCELLED_WRITE_TIMEOUT)));
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(IpcError::Cancelled),
            written = channel.write_response(response) => written,
        }
    }

    fn abandon(&self, state: &mut ExchangeState, error: &IpcError) {
        match error {
            IpcError::Cancelled => tracing::warn!(state = ?*state, "{}", REQUEST_CANCELLED),
            _ => tracing::error!(state = ?*state, "communication error occurred: {}", error),
        }
        state.advance(ExchangeState::Aborted);
    }

    fn failed(&self, fault: Fault) -> Response {
        tracing::error!("failed to process IPC request: {}", fault);
        self.fault_response(fault)
    }

    fn cancelled_response(&self) -> Response {
        tracing::warn!("{}", REQUEST_CANCELLED);
        self.fault_response(Fault::internal_server_error(REQUEST_CANCELLED))
    }

    /// Apply the failure-details policy to `fault`.
    ///
    /// Bad requests keep their message since it only describes the client's
    /// own request. Internal errors keep nothing unless details are enabled.
    fn fault_response(&self, fault: Fault) -> Response {
        if self.options.include_failure_details_in_response {
            return Response::from_fault(fault);
        }
        match fault.status {
            Status::BadRequest => Response::bad_request(fault.message, None),
            _ => Response::internal_server_error(None, None),
        }
    }
}

/// Run a bound method, turning its error, an unconvertible result or a panic
/// into an internal-server-error fault.
async fn invoke(prepared: PreparedCall) -> std::result::Result<Response, Fault> {
    let outcome = AssertUnwindSafe(prepared.invocation).catch_unwind().await;

    match outcome {
        Ok(Ok(value)) => {
            let data = match prepared.descriptor.return_type {
                TypeRef::Unit => None,
                _ => Some(value),
            };
            Ok(Response::success(data))
        }
        Ok(Err(InvokeError::Failed(e))) => Err(Fault::internal_server_error(e.to_string())
            .with_cause(ErrorCause::from_anyhow(&e))),
        Ok(Err(InvokeError::Unserializable(e))) => {
            Err(Fault::internal_server_error(FAILED_TO_SERIALIZE_RESPONSE)
                .with_cause(ErrorCause::from_error(&e)))
        }
        Err(panic) => {
            let mut fault = Fault::internal_server_error(UNEXPECTED_PANIC);
            if let Some(message) = panic_message(panic.as_ref()) {
                fault = fault.with_cause(ErrorCause::new(message));
            }
            Err(fault)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> Option<String> {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::client::{Client, ClientOptions, Invocation};
    use crate::codec::MessageSerializer;
    use crate::handler::Service;
    use crate::transport::{memory_transport, MemoryListener};

    fn service() -> Arc<Service> {
        Arc::new(
            Service::builder("Calc")
                .method("Add", |a: i32, b: i32| async move { Ok(a + b) })
                .sync_method("Nothing", || Ok(()))
                .method("Fail", || async move {
                    Err::<i32, _>(anyhow::anyhow!("division by zero"))
                })
                .method("Panic", || async move {
                    if true {
                        panic!("boom");
                    }
                    Ok(0i32)
                })
                .build(),
        )
    }

    async fn start(
        options: EndpointOptions,
    ) -> (Client<crate::transport::MemoryConnector>, CancellationToken) {
        let (listener, connector) = memory_transport(16);
        let endpoint = Endpoint::new("Calc", listener, service(), options);
        let shutdown = CancellationToken::new();
        tokio::spawn(endpoint.run(shutdown.clone()));
        (Client::new(connector, ClientOptions::default()), shutdown)
    }

    #[test]
    fn test_options_defaults() {
        let options = EndpointOptions::default();
        assert_eq!(options.max_concurrent_calls, 4);
        assert!(!options.include_failure_details_in_response);
        assert!(options.stream_transform.is_none());
        assert_eq!(options.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_options_builder() {
        let options = EndpointOptions::new()
            .max_concurrent_calls(0)
            .include_failure_details(true)
            .max_message_size(1024)
            .stream_transform(|s| s);
        assert_eq!(options.max_concurrent_calls, 1);
        assert!(options.include_failure_details_in_response);
        assert!(options.stream_transform.is_some());
        assert_eq!(options.max_message_size, 1024);
    }

    #[tokio::test]
    async fn test_successful_call() {
        let (client, shutdown) = start(EndpointOptions::default()).await;
        let sum: i32 = client
            .invoke(Invocation::new("Add").arg(2i32).arg(3i32))
            .await
            .unwrap();
        assert_eq!(sum, 5);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_unit_method_returns_no_data() {
        let (client, shutdown) = start(EndpointOptions::default()).await;
        let response = client
            .send(Request::new("Nothing").with_parameter_types(vec![]))
            .await
            .unwrap();
        assert!(response.succeeded());
        assert!(response.data().is_none());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_failure_details_hidden_by_default() {
        let (client, shutdown) = start(EndpointOptions::default()).await;
        let err = client.invoke::<i32>(Invocation::new("Fail")).await.unwrap_err();
        match err {
            IpcError::Fault(fault) => {
                assert_eq!(fault.status, Status::InternalServerError);
                assert!(fault.message.is_none());
                assert!(fault.cause.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_failure_details_included_when_enabled() {
        let (client, shutdown) = start(EndpointOptions::new().include_failure_details(true)).await;
        let err = client.invoke::<i32>(Invocation::new("Fail")).await.unwrap_err();
        match err {
            IpcError::Fault(fault) => {
                assert_eq!(fault.message.as_deref(), Some("division by zero"));
                assert_eq!(fault.cause.unwrap().message, "division by zero");
            }
            other => panic!("unexpected error: {other}"),
        }
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error_and_releases_permit() {
        let (client, shutdown) = start(EndpointOptions::new().max_concurrent_calls(1)).await;
        for _ in 0..3 {
            let err = client.invoke::<i32>(Invocation::new("Panic")).await.unwrap_err();
            assert!(matches!(
                err,
                IpcError::Fault(Fault { status: Status::InternalServerError, .. })
            ));
        }
        let sum: i32 = client
            .invoke(Invocation::new("Add").arg(1i32).arg(1i32))
            .await
            .unwrap();
        assert_eq!(sum, 2);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_garbage_request_is_bad_request() {
        let (listener, connector) = memory_transport(4);
        let endpoint = Endpoint::new("Calc", listener, service(), EndpointOptions::default());
        let shutdown = CancellationToken::new();
        tokio::spawn(endpoint.run(shutdown.clone()));

        let mut stream = crate::transport::Connector::connect(&connector).await.unwrap();
        crate::protocol::write_message(&mut stream, b"{not json").await.unwrap();
        let payload = crate::protocol::read_message(&mut stream, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        let response: Response = serde_json::from_slice(&payload).unwrap();
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(response.error_message(), Some(FAILED_TO_DESERIALIZE_REQUEST));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_missing_service_is_bad_request() {
        let (listener, connector) = memory_transport(4);
        let endpoint = Endpoint::new("Other", listener, service(), EndpointOptions::default());
        let shutdown = CancellationToken::new();
        tokio::spawn(endpoint.run(shutdown.clone()));

        let client = Client::new(connector, ClientOptions::default());
        let err = client.invoke::<i32>(Invocation::new("Add")).await.unwrap_err();
        match err {
            IpcError::Fault(fault) => {
                assert_eq!(fault.status, Status::BadRequest);
                assert_eq!(
                    fault.message.as_deref(),
                    Some("No implementation of interface 'Other' found")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_run_returns_after_shutdown() {
        let (listener, _connector) = memory_transport(4);
        let endpoint = Endpoint::new("Calc", listener, service(), EndpointOptions::default());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(endpoint.run(shutdown.clone()));
        shutdown.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_exchange() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let service = Arc::new(
            Service::builder("Slow")
                .method("Wait", move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(())
                    }
                })
                .build(),
        );
        let (listener, connector) = memory_transport(4);
        let options = EndpointOptions::new().include_failure_details(true);
        let endpoint = Endpoint::new("Slow", listener, service, options);
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(endpoint.run(shutdown.clone()));

        let client = Client::new(connector, ClientOptions::default());
        let call = tokio::spawn(async move { client.invoke::<()>(Invocation::new("Wait")).await });
        while started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();

        match call.await.unwrap().unwrap_err() {
            IpcError::Fault(fault) => {
                assert_eq!(fault.status, Status::InternalServerError);
                assert_eq!(fault.message.as_deref(), Some(REQUEST_CANCELLED));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(server.await.unwrap().is_ok());
    }

    /// Fails the first `failures` accepts, then hands out memory streams.
    struct FlakyListener {
        failures: AtomicUsize,
        inner: MemoryListener,
    }

    impl Listener for FlakyListener {
        type Stream = tokio::io::DuplexStream;

        async fn accept(&self) -> Result<Self::Stream> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(IpcError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionAborted,
                )));
            }
            self.inner.accept().await
        }
    }

    #[tokio::test]
    async fn test_accept_error_keeps_endpoint_serving() {
        let (inner, connector) = memory_transport(4);
        let listener = FlakyListener {
            failures: AtomicUsize::new(2),
            inner,
        };
        let endpoint = Endpoint::new("Calc", listener, service(), EndpointOptions::default());
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(endpoint.run(shutdown.clone()));

        let client = Client::new(connector, ClientOptions::default());
        let sum: i32 = client
            .invoke(Invocation::new("Add").arg(2i32).arg(3i32))
            .await
            .unwrap();
        assert_eq!(sum, 5);
        assert!(!server.is_finished());

        shutdown.cancel();
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_closed_listener_stops_endpoint() {
        let (listener, connector) = memory_transport(1);
        drop(connector);
        let endpoint = Endpoint::new("Calc", listener, service(), EndpointOptions::default());
        let result = endpoint.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(IpcError::ListenerClosed(_))));
    }

    /// JSON serializer whose first response encoding fails.
    #[derive(Default)]
    struct RefuseFirstResponse {
        response_writes: AtomicUsize,
    }

    impl MessageSerializer for RefuseFirstResponse {
        fn serialize_request(&self, request: &Request) -> Result<Vec<u8>> {
            JsonSerializer.serialize_request(request)
        }

        fn deserialize_request(&self, bytes: &[u8]) -> Result<Request> {
            JsonSerializer.deserialize_request(bytes)
        }

        fn serialize_response(&self, response: &Response) -> Result<Vec<u8>> {
            if self.response_writes.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(IpcError::serialization_msg("response refused"));
            }
            JsonSerializer.serialize_response(response)
        }

        fn deserialize_response(&self, bytes: &[u8]) -> Result<Response> {
            JsonSerializer.deserialize_response(bytes)
        }
    }

    #[tokio::test]
    async fn test_response_encoding_failure_falls_back_once() {
        let serializer = Arc::new(RefuseFirstResponse::default());
        let options = EndpointOptions::new()
            .include_failure_details(true)
            .serializer(serializer.clone());
        let (client, shutdown) = start(options).await;

        let err = client
            .invoke::<i32>(Invocation::new("Add").arg(1i32).arg(2i32))
            .await
            .unwrap_err();
        match err {
            IpcError::Fault(fault) => {
                assert_eq!(fault.status, Status::InternalServerError);
                assert_eq!(fault.message.as_deref(), Some(FAILED_TO_SERIALIZE_RESPONSE));
                assert_eq!(fault.cause.unwrap().message, "response refused");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(serializer.response_writes.load(Ordering::SeqCst), 2);
        shutdown.cancel();
    }
}
