//! Client side: call builder and per-call exchange.
//!
//! A [`Client`] opens one connection per call through its [`Connector`],
//! writes one framed request, reads one framed response and closes the
//! connection again, whatever the outcome.
//!
//! Calls are described with [`Invocation`], an explicit builder holding the
//! method name, the typed arguments and any generic arguments:
//!
//! ```no_run
//! use wirecall::transport::PipeConnector;
//! use wirecall::{Client, ClientOptions, Invocation};
//!
//! # async fn run() -> wirecall::error::Result<()> {
//! let client = Client::new(PipeConnector::new("/tmp/echo.sock"), ClientOptions::default());
//! let reply: String = client
//!     .invoke(Invocation::new("Echo").arg("hello".to_string()))
//!     .await?;
//! assert_eq!(reply, "hello");
//! # Ok(())
//! # }
//! ```
//!
//! A call ends in exactly one of: the typed result, [`IpcError::Fault`],
//! [`IpcError::Timeout`], [`IpcError::Cancelled`] or
//! [`IpcError::Serialization`]. A broken channel surfaces as one of the
//! communication-class variants.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::codec::{JsonSerializer, SharedSerializer};
use crate::error::{ConvertError, IpcError, Result};
use crate::message::{NamedTypeRef, Request, Response};
use crate::protocol::{MessageChannel, DEFAULT_MAX_MESSAGE_SIZE};
use crate::transport::{apply_transform, BoxStream, Connector, StreamTransform};
use crate::value::{DefaultValueConverter, SharedConverter, TypeRef, Value, WireType};

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Client-side configuration, fixed once the client is built.
#[derive(Clone)]
pub struct ClientOptions {
    /// Wraps every opened stream before the request is written.
    pub stream_transform: Option<StreamTransform>,
    /// Default: 60 seconds
    pub connection_timeout: Duration,
    /// Describe parameter and generic types by name instead of by descriptor.
    /// Default: false
    pub use_by_name_type_resolution: bool,
    pub serializer: SharedSerializer,
    pub value_converter: SharedConverter,
    /// Largest accepted response frame. Default: 64 MiB
    pub max_message_size: u32,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self {
            stream_transform: None,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            use_by_name_type_resolution: false,
            serializer: Arc::new(JsonSerializer),
            value_converter: Arc::new(DefaultValueConverter),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn stream_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(BoxStream) -> BoxStream + Send + Sync + 'static,
    {
        self.stream_transform = Some(Arc::new(transform));
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn use_by_name_type_resolution(mut self, by_name: bool) -> Self {
        self.use_by_name_type_resolution = by_name;
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

    pub fn max_message_size(mut self, size: u32) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("stream_transform", &self.stream_transform.is_some())
            .field("connection_timeout", &self.connection_timeout)
            .field(
                "use_by_name_type_resolution",
                &self.use_by_name_type_resolution,
            )
            .field("max_message_size", &self.max_message_size)
            .finish_non_exhaustive()
    }
}

/// A method call under construction.
///
/// Every argument carries the type it was declared with, which is what the
/// server matches overloads against.
#[derive(Debug, Default)]
pub struct Invocation {
    method_name: String,
    arguments: Vec<(Value, TypeRef)>,
    generic_arguments: Vec<TypeRef>,
    error: Option<(usize, ConvertError)>,
}

impl Invocation {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            ..Self::default()
        }
    }

    /// Append a typed argument.
    ///
    /// A value that cannot be represented on the wire is reported when the
    /// call is made.
    pub fn arg<T: WireType>(mut self, value: T) -> Self {
        let index = self.arguments.len();
        match value.into_value() {
            Ok(value) => self.arguments.push((value, T::type_ref())),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some((index, e));
                }
                self.arguments.push((Value::Null, T::type_ref()));
            }
        }
        self
    }

    /// Append an already converted argument with an explicit declared type.
    pub fn arg_value(mut self, value: Value, type_ref: TypeRef) -> Self {
        self.arguments.push((value, type_ref));
        self
    }

    /// Append a generic argument.
    pub fn generic<T: WireType>(self) -> Self {
        self.generic_type(T::type_ref())
    }

    pub fn generic_type(mut self, type_ref: TypeRef) -> Self {
        self.generic_arguments.push(type_ref);
        self
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Build the wire request.
    ///
    /// Parameter types are always sent; generic arguments only when there are
    /// some. With `by_name`, both are sent as [`NamedTypeRef`]s.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Serialization`] if an argument could not be converted.
    pub fn into_request(self, by_name: bool) -> Result<Request> {
        if let Some((index, e)) = self.error {
            return Err(IpcError::serialization(
                format!("Unable to convert argument {} of '{}'", index, self.method_name),
                e,
            ));
        }

        let (parameters, parameter_types): (Vec<Value>, Vec<TypeRef>) =
            self.arguments.into_iter().unzip();
        let request = Request::new(self.method_name).with_parameters(parameters);

        let request = if by_name {
            request.with_parameter_types_by_name(named(&parameter_types))
        } else {
            request.with_parameter_types(parameter_types)
        };

        if self.generic_arguments.is_empty() {
            return Ok(request);
        }
        Ok(if by_name {
            request.with_generic_arguments_by_name(named(&self.generic_arguments))
        } else {
            request.with_generic_arguments(self.generic_arguments)
        })
    }
}

fn named(types: &[TypeRef]) -> Vec<NamedTypeRef> {
    types.iter().map(NamedTypeRef::of).collect()
}

/// Calls methods of one remote contract.
///
/// Cheap to clone; clones share the connector and options.
pub struct Client<C: Connector> {
    connector: Arc<C>,
    options: Arc<ClientOptions>,
}

impl<C: Connector> Client<C> {
    pub fn new(connector: C, options: ClientOptions) -> Self {
        Self::from_shared(Arc::new(connector), Arc::new(options))
    }

    pub(crate) fn from_shared(connector: Arc<C>, options: Arc<ClientOptions>) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Call a method and convert its result to `T`.
    pub async fn invoke<T: WireType>(&self, invocation: Invocation) -> Result<T> {
        self.invoke_cancellable(invocation, &CancellationToken::new())
            .await
    }

    /// Call a method; cancelling `cancel` aborts the call with
    /// [`IpcError::Cancelled`].
    pub async fn invoke_cancellable<T: WireType>(
        &self,
        invocation: Invocation,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let request = invocation.into_request(self.options.use_by_name_type_resolution)?;
        self.invoke_request(request, cancel).await
    }

    /// Send a pre-built request as is and convert its result to `T`.
    pub async fn invoke_request<T: WireType>(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.exchange(&request, cancel).await?;
        self.unmarshal(response)
    }

    /// Send a pre-built request and return the raw response, faults included.
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.exchange(&request, &CancellationToken::new()).await
    }

    /// Connect, write the request, read the response. The connection is
    /// dropped when this returns.
    async fn exchange(&self, request: &Request, cancel: &CancellationToken) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(IpcError::Cancelled);
        }

        let timeout = self.options.connection_timeout;
        let stream = tokio::select! {
            _ = cancel.cancelled() => return Err(IpcError::Cancelled),
            connected = tokio::time::timeout(timeout, self.connector.connect()) => match connected {
                Ok(stream) => stream?,
                Err(_) => {
                    tracing::warn!(method = %request.method_name, "connection timed out after {:?}", timeout);
                    return Err(IpcError::Timeout(timeout));
                }
            },
        };

        let stream = apply_transform(Box::new(stream), self.options.stream_transform.as_ref());
        let mut channel = MessageChannel::new(
            stream,
            Arc::clone(&self.options.serializer),
            self.options.max_message_size,
        );

        tracing::debug!(method = %request.method_name, "sending request");
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(IpcError::Cancelled),
            response = async {
                channel.write_request(request).await?;
                channel.read_response().await
            } => response?,
        };
        tracing::debug!(method = %request.method_name, status = ?response.status(), "response received");
        Ok(response)
    }

    /// Turn a response into `T` or the fault it carries.
    fn unmarshal<T: WireType>(&self, response: Response) -> Result<T> {
        if !response.succeeded() {
            return Err(IpcError::Fault(response.into_fault()?));
        }

        let data = response.into_data().unwrap_or(Value::Null);
        let target = T::type_ref();
        let converted = self
            .options
            .value_converter
            .try_convert(&data, &target)
            .ok_or_else(|| {
                IpcError::serialization_msg(format!(
                    "Unable to convert returned value {} from {} to {}",
                    data,
                    data.type_name(),
                    target
                ))
            })?;

        T::from_value(converted).map_err(|e| {
            IpcError::serialization(format!("Unable to convert returned value to {}", target), e)
        })
    }
}

impl<C: Connector> Clone for Client<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            options: Arc::clone(&self.options),
        }
    }
}

impl<C: Connector> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
