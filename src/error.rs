//! Error types for wirecall.

use std::time::Duration;

use thiserror::Error;

use crate::message::Fault;

/// Boxed error used as the source of serialization failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all wirecall operations.
///
/// Callers of [`Client`](crate::Client) observe exactly one of: a typed
/// result, [`IpcError::Fault`], [`IpcError::Timeout`], [`IpcError::Cancelled`],
/// or [`IpcError::Serialization`]. Channel breakage surfaces as one of the
/// communication-class variants (see [`IpcError::is_communication`]).
#[derive(Debug, Error)]
pub enum IpcError {
    /// I/O error during pipe/socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel itself is broken (truncated header, peer closed mid-message).
    #[error("Communication error: {0}")]
    Communication(String),

    /// The listener can never yield another connection.
    #[error("Listener closed: {0}")]
    ListenerClosed(String),

    /// The peer declared a frame larger than the configured maximum.
    #[error("Frame length {length} exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared payload length.
        length: u32,
        /// Configured maximum.
        max: u32,
    },

    /// A message or value could not be encoded/decoded.
    #[error("{message}")]
    Serialization {
        /// What failed.
        message: String,
        /// Underlying cause, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// The server answered with a non-`Ok` status.
    #[error(transparent)]
    Fault(#[from] Fault),

    /// Connecting to the server took longer than the configured timeout.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// The call was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation is not valid for the current state of the value.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// No client registration exists under the given name.
    #[error("IPC client '{0}' is not configured")]
    ClientNotConfigured(String),
}

impl IpcError {
    /// Build a serialization error with a cause.
    pub fn serialization(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a serialization error without a cause.
    pub fn serialization_msg(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// True if the transport itself is broken and no response can be exchanged.
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Communication(_)
                | Self::ListenerClosed(_)
                | Self::FrameTooLarge { .. }
        )
    }

    /// True for serializer or value-conversion failures.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

/// Failure to coerce a [`Value`](crate::Value) into a destination type.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The value's shape cannot represent the destination type.
    #[error("cannot convert {from} to {to}")]
    Mismatch {
        /// Run-time type name of the source value.
        from: String,
        /// Full name of the destination type.
        to: String,
    },

    /// Numeric value does not fit the destination type.
    #[error("value {value} is out of range for {to}")]
    OutOfRange {
        /// Rendered source value.
        value: String,
        /// Full name of the destination type.
        to: String,
    },

    /// No enum member with the given name or number.
    #[error("'{member}' is not a member of enum {enum_name}")]
    UnknownMember {
        /// Requested member name or number.
        member: String,
        /// Enum full name.
        enum_name: String,
    },

    /// Object materialization through serde failed.
    #[error("materialization failed: {0}")]
    Materialize(#[from] serde_json::Error),

    /// Argument list length does not match the declared parameters.
    #[error("expected {expected} arguments, got {actual}")]
    Arity {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },
}

/// Result type alias using IpcError.
pub type Result<T> = std::result::Result<T, IpcError>;
