//! # wirecall
//!
//! Point-to-point RPC between processes over named pipes, Unix domain
//! sockets, or any duplex byte stream.
//!
//! A server exposes a [`Service`](handler::Service) (an explicit registry of
//! methods and overloads) through an [`Endpoint`]. A client builds an
//! [`Invocation`] and calls it through a [`Client`]. Every call is one
//! exchange on its own connection: one request frame, one response frame.
//!
//! ## Architecture
//!
//! - **Wire** ([`protocol`]): `u32` little-endian length prefix + payload
//! - **Messages** ([`message`], [`codec`]): `Request`/`Response` encoded by a
//!   pluggable serializer (JSON by default, MessagePack available)
//! - **Values** ([`value`]): self-describing [`Value`]s, [`TypeRef`]
//!   descriptors and the converter bridging them to Rust types
//! - **Dispatch** ([`server`], [`handler`]): admission control, overload
//!   resolution, binding, invocation and fault mapping
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use wirecall::handler::Service;
//! use wirecall::transport::memory_transport;
//! use wirecall::{Client, ClientOptions, Endpoint, EndpointOptions, Invocation};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> wirecall::error::Result<()> {
//!     let service = Arc::new(
//!         Service::builder("Greeter")
//!             .method("Greet", |name: String| async move { Ok(format!("Hello, {}!", name)) })
//!             .build(),
//!     );
//!
//!     let (listener, connector) = memory_transport(8);
//!     let shutdown = CancellationToken::new();
//!     let server = Endpoint::new("Greeter", listener, service, EndpointOptions::default());
//!     tokio::spawn(server.run(shutdown.clone()));
//!
//!     let client = Client::new(connector, ClientOptions::default());
//!     let reply: String = client
//!         .invoke(Invocation::new("Greet").arg("world".to_string()))
//!         .await?;
//!     assert_eq!(reply, "Hello, world!");
//!
//!     shutdown.cancel();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod factory;
pub mod handler;
pub mod host;
pub mod message;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod value;

pub use client::{Client, ClientOptions, Invocation};
pub use error::{ConvertError, IpcError};
pub use factory::ClientFactory;
pub use host::{HostHandle, IpcHost};
pub use message::{Fault, Request, Response, Status};
pub use server::{Endpoint, EndpointOptions};
pub use value::{TypeRef, Value, WireType};
