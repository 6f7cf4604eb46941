//! The uniform response envelope.
//!
//! # Responsibilities
//! - Give every caller `{data, error, status}` regardless of how the call ended
//! - Decode successful bodies into the caller's type
//!
//! # Design Decisions
//! - Exactly one of `data` / `error` is set
//! - Status `0` means no HTTP status exists (queued, unreachable, invalid)
//! - HTTP error bodies are kept on the error, not in `data`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::http::transport::{RawResponse, TransportError};

/// Message carried by the envelope of a request that was queued instead of sent.
pub const QUEUED_MESSAGE: &str =
    "Network offline. Request queued for processing when network is available.";

/// Broad classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 4xx: terminal, never retried.
    Client,
    /// 5xx after the retry budget ran out.
    Server,
    /// No response after the retry budget ran out.
    Network,
    /// Accepted into the offline queue; not sent yet.
    Queued,
    /// 2xx whose body did not match the expected type.
    Decode,
    InvalidRequest,
    /// The offline queue could not be written, so the request was not kept.
    Persistence,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        if status >= 500 {
            ErrorKind::Server
        } else {
            ErrorKind::Client
        }
    }
}

/// Error half of the envelope.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    /// Parsed response body of an HTTP error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        if !body.is_null() {
            self.body = Some(body);
        }
        self
    }

    pub fn queued() -> Self {
        Self::new(ErrorKind::Queued, QUEUED_MESSAGE)
    }
}

impl From<&TransportError> for ErrorInfo {
    fn from(err: &TransportError) -> Self {
        let kind = match err {
            TransportError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            TransportError::Unreachable(_) | TransportError::Timeout(_) => ErrorKind::Network,
        };
        Self::new(kind, err.to_string())
    }
}

/// What every caller receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub data: Option<T>,
    pub error: Option<ErrorInfo>,
    pub status: u16,
}

impl<T> ResponseEnvelope<T> {
    pub fn success(data: T, status: u16) -> Self {
        Self {
            data: Some(data),
            error: None,
            status,
        }
    }

    pub fn failure(error: ErrorInfo, status: u16) -> Self {
        Self {
            data: None,
            error: Some(error),
            status,
        }
    }

    /// Envelope for a request accepted into the offline queue.
    pub fn queued() -> Self {
        Self::failure(ErrorInfo::queued(), 0)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_queued(&self) -> bool {
        matches!(&self.error, Some(e) if e.kind == ErrorKind::Queued)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Convert into a `Result`, dropping the status.
    pub fn into_result(self) -> Result<Option<T>, ErrorInfo> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            data: self.data.map(f),
            error: self.error,
            status: self.status,
        }
    }
}

impl<T: DeserializeOwned> ResponseEnvelope<T> {
    /// Build an envelope from a completed HTTP exchange.
    pub fn from_raw(raw: RawResponse) -> Self {
        let status = raw.status;
        if !raw.is_success() {
            let error = ErrorInfo::new(
                ErrorKind::from_status(status),
                format!("API Error: {}", status),
            )
            .with_body(raw.body.into_value());
            return Self::failure(error, status);
        }

        match serde_json::from_value::<T>(raw.body.into_value()) {
            Ok(data) => Self::success(data, status),
            Err(e) => Self::failure(
                ErrorInfo::new(ErrorKind::Decode, format!("failed to decode response: {}", e)),
                status,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::ResponseBody;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Lead {
        name: String,
    }

    #[test]
    fn test_success_decodes_json() {
        let raw = RawResponse::new(200, ResponseBody::Json(json!({"name": "A"})));
        let envelope = ResponseEnvelope::<Lead>::from_raw(raw);
        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.data, Some(Lead { name: "A".into() }));
        assert!(envelope.error.is_none());
    }

    #[test]
    fn test_text_body_decodes_as_string() {
        let raw = RawResponse::new(200, ResponseBody::Text("pong".into()));
        let envelope = ResponseEnvelope::<String>::from_raw(raw);
        assert_eq!(envelope.data.as_deref(), Some("pong"));
    }

    #[test]
    fn test_http_error_keeps_body_on_error() {
        let raw = RawResponse::new(422, ResponseBody::Json(json!({"field": "name"})));
        let envelope = ResponseEnvelope::<Lead>::from_raw(raw);
        assert!(envelope.data.is_none());
        let error = envelope.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Client);
        assert_eq!(error.message, "API Error: 422");
        assert_eq!(error.body, Some(json!({"field": "name"})));
    }

    #[test]
    fn test_server_error_kind() {
        let envelope = ResponseEnvelope::<Value>::from_raw(RawResponse::new(503, ResponseBody::Empty));
        assert_eq!(envelope.error_kind(), Some(ErrorKind::Server));
        assert!(envelope.error.unwrap().body.is_none());
    }

    #[test]
    fn test_decode_failure_keeps_status() {
        let raw = RawResponse::new(200, ResponseBody::Json(json!([1, 2])));
        let envelope = ResponseEnvelope::<Lead>::from_raw(raw);
        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.error_kind(), Some(ErrorKind::Decode));
    }

    #[test]
    fn test_queued_envelope() {
        let envelope = ResponseEnvelope::<Value>::queued();
        assert_eq!(envelope.status, 0);
        assert!(envelope.data.is_none());
        assert!(envelope.is_queued());
        assert_eq!(envelope.error.unwrap().message, QUEUED_MESSAGE);
    }
}
