//! Response message, status vocabulary and faults.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IpcError, Result};
use crate::value::Value;

/// Outcome of an exchange. `Ok` is the only non-error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The method ran and `data` holds its result.
    Ok,
    /// The request itself was wrong (unknown method, bad arguments, ...).
    BadRequest,
    /// The method failed, the response could not be encoded, or the exchange was cancelled.
    InternalServerError,
}

impl Status {
    /// True for every status except `Ok`.
    pub fn is_error(self) -> bool {
        self > Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::BadRequest => f.write_str("Bad request"),
            Status::InternalServerError => f.write_str("Internal server error"),
        }
    }
}

/// One link of a failure chain carried back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCause {
    /// Rendered error message.
    pub message: String,
    /// Underlying cause, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorCause>>,
}

impl ErrorCause {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Build a cause chain from an `anyhow` error, outermost context first.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        Self::from_messages(error.chain().map(|e| e.to_string()))
            .unwrap_or_else(|| Self::new(error.to_string()))
    }

    /// Build a cause chain from a standard error and its sources.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut messages = vec![error.to_string()];
        let mut source = error.source();
        while let Some(e) = source {
            messages.push(e.to_string());
            source = e.source();
        }
        Self::from_messages(messages).unwrap_or_else(|| Self::new(error.to_string()))
    }

    fn from_messages(messages: impl IntoIterator<Item = String>) -> Option<Self> {
        let messages: Vec<String> = messages.into_iter().collect();
        messages.into_iter().rev().fold(None, |inner, message| {
            Some(ErrorCause {
                message,
                cause: inner.map(Box::new),
            })
        })
    }

    /// Iterate over this cause and everything beneath it.
    pub fn chain(&self) -> impl Iterator<Item = &ErrorCause> {
        std::iter::successors(Some(self), |c| c.cause.as_deref())
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of one exchange, written by the server and read by the client.
///
/// Constructors keep the invariant that `data` is only present for `Ok` and
/// that error detail is only present otherwise. Decoding enforces it too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireResponse")]
pub struct Response {
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<ErrorCause>,
}

impl Response {
    /// Successful response. `None` means the method returned nothing.
    pub fn success(data: Option<Value>) -> Self {
        Self {
            status: Status::Ok,
            data,
            error_message: None,
            cause: None,
        }
    }

    pub fn bad_request(message: Option<String>, cause: Option<ErrorCause>) -> Self {
        Self::failure(Status::BadRequest, message, cause)
    }

    pub fn internal_server_error(message: Option<String>, cause: Option<ErrorCause>) -> Self {
        Self::failure(Status::InternalServerError, message, cause)
    }

    /// Response for `fault`, carrying its status, message and cause.
    pub fn from_fault(fault: Fault) -> Self {
        Self::failure(fault.status, fault.message, fault.cause)
    }

    fn failure(status: Status, message: Option<String>, cause: Option<ErrorCause>) -> Self {
        debug_assert!(status.is_error());
        Self {
            status,
            data: None,
            error_message: message,
            cause,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn succeeded(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// Take the payload of a successful response.
    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    /// Turn an error response into the [`Fault`] raised to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::InvalidOperation`] if the response succeeded.
    pub fn into_fault(self) -> Result<Fault> {
        if self.succeeded() {
            return Err(IpcError::InvalidOperation(
                "a successful response has no fault".to_string(),
            ));
        }
        Ok(Fault {
            status: self.status,
            message: self.error_message,
            cause: self.cause,
        })
    }
}

/// Decoded form of a [`Response`], checked before it becomes one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    status: Status,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    cause: Option<ErrorCause>,
}

impl TryFrom<WireResponse> for Response {
    type Error = String;

    fn try_from(wire: WireResponse) -> std::result::Result<Self, Self::Error> {
        if wire.status.is_error() {
            if wire.data.is_some() {
                return Err(format!("'{}' response carries data", wire.status));
            }
        } else if wire.error_message.is_some() || wire.cause.is_some() {
            return Err(format!("'{}' response carries error detail", wire.status));
        }
        Ok(Self {
            status: wire.status,
            data: wire.data,
            error_message: wire.error_message,
            cause: wire.cause,
        })
    }
}

/// A typed failure derived from a non-`Ok` [`Response`].
///
/// `message` and `cause` may legitimately be empty when the server does not
/// include failure details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Non-`Ok` status.
    pub status: Status,
    /// Human-readable detail.
    pub message: Option<String>,
    /// Nested cause information.
    pub cause: Option<ErrorCause>,
}

impl Fault {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: Status::BadRequest,
            message: Some(message.into()),
            cause: None,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self {
            status: Status::InternalServerError,
            message: Some(message.into()),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.cause = Some(cause);
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.status, message),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(Status::Ok < Status::BadRequest);
        assert!(Status::BadRequest < Status::InternalServerError);
        assert!(!Status::Ok.is_error());
        assert!(Status::BadRequest.is_error());
        assert!(Status::InternalServerError.is_error());
    }

    #[test]
    fn test_into_fault_from_ok_is_invalid_operation() {
        let err = Response::success(Some(Value::Bool(true))).into_fault().unwrap_err();
        assert!(matches!(err, IpcError::InvalidOperation(_)));
    }

    #[test]
    fn test_into_fault_keeps_detail() {
        let fault = Response::bad_request(Some("no such method".into()), None)
            .into_fault()
            .unwrap();
        assert_eq!(fault.status, Status::BadRequest);
        assert_eq!(fault.message.as_deref(), Some("no such method"));
        assert_eq!(fault.to_string(), "Bad request: no such method");
    }

    #[test]
    fn test_empty_fault_display() {
        let fault = Response::internal_server_error(None, None).into_fault().unwrap();
        assert_eq!(fault.to_string(), "Internal server error");
        assert!(fault.cause.is_none());
    }

    #[test]
    fn test_decode_rejects_ok_with_error_detail() {
        let err = serde_json::from_str::<Response>(r#"{"status":"Ok","errorMessage":"boom"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("carries error detail"));
        assert!(serde_json::from_str::<Response>(r#"{"status":"Ok","cause":{"message":"x"}}"#)
            .is_err());
    }

    #[test]
    fn test_decode_rejects_failure_with_data() {
        let json = r#"{"status":"BadRequest","data":{"$type":"Int","value":1}}"#;
        assert!(serde_json::from_str::<Response>(json).is_err());
    }

    #[test]
    fn test_decode_accepts_well_formed_responses() {
        let ok: Response =
            serde_json::from_str(r#"{"status":"Ok","data":{"$type":"Bool","value":true}}"#).unwrap();
        assert_eq!(ok, Response::success(Some(Value::Bool(true))));

        let failed: Response =
            serde_json::from_str(r#"{"status":"InternalServerError","errorMessage":"e"}"#)
                .unwrap();
        assert_eq!(failed, Response::internal_server_error(Some("e".into()), None));
    }

    #[test]
    fn test_error_cause_from_anyhow_chain() {
        let err = anyhow::anyhow!("root cause").context("outer");
        let cause = ErrorCause::from_anyhow(&err);
        let messages: Vec<&str> = cause.chain().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["outer", "root cause"]);
    }

    #[test]
    fn test_error_cause_from_std_error() {
        let err = IpcError::serialization("outer", std::io::Error::other("inner"));
        let cause = ErrorCause::from_error(&err);
        assert_eq!(cause.message, "outer");
        assert_eq!(cause.cause.as_ref().map(|c| c.message.as_str()), Some("inner"));
    }
}
