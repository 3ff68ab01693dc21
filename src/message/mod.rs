//! Message model shared by client and server.
//!
//! - [`Request`] - method name, positional arguments, type descriptors
//! - [`Response`] - status, payload, optional error detail and cause
//! - [`Fault`] - the error value raised to callers for a non-`Ok` response

mod request;
mod response;

pub use request::{NamedTypeRef, Request};
pub use response::{ErrorCause, Fault, Response, Status};
