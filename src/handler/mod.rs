//! Handler module - method registry and dispatch.
//!
//! Methods are registered explicitly rather than discovered at run time:
//!
//! - [`Service`] / [`ServiceBuilder`] / [`InterfaceBuilder`] - interfaces and their overloads
//! - [`AsyncMethod`] / [`SyncMethod`] - typed closures turned into [`Handler`]s
//! - [`TypeRegistry`] - the types clients may name in by-name descriptors
//! - [`prepare_call`] - overload resolution and argument binding
//! - [`ServiceProvider`] - resolves a contract to its implementation per exchange
//!
//! # Example
//!
//! ```
//! use wirecall::handler::Service;
//!
//! let service = Service::builder("Greeter")
//!     .method("Greet", |name: String| async move { Ok(format!("Hello, {}!", name)) })
//!     .build();
//! assert_eq!(service.contract(), "Greeter");
//! ```

mod method;
mod provider;
mod resolve;
mod service;
mod types;

pub use method::{
    AsyncFn, AsyncMethod, BindError, BoxFuture, Handler, InvokeError, InvokeResult, SyncFn,
    SyncMethod,
};
pub use provider::{ServiceCollection, ServiceProvider};
pub use resolve::{prepare_call, PreparedCall};
pub use service::{
    Interface, InterfaceBuilder, MethodDescriptor, MethodEntry, Service, ServiceBuilder,
};
pub use types::TypeRegistry;
