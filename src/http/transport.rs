//! Single HTTP exchange.
//!
//! # Responsibilities
//! - Turn a fully-formed `RequestDescriptor` into one HTTP request
//! - Normalize the reply into a `RawResponse` (status + parsed body)
//! - Report "no response at all" as a distinct `TransportError`
//!
//! # Design Decisions
//! - No retry or queueing awareness here
//! - HTTP error statuses are normal results, not errors
//! - Bodies are JSON-parsed only when the content type says so

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::ApiConfig;
use crate::http::request::RequestDescriptor;
use crate::observability::metrics;

/// Failures where no HTTP response was obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, connect or mid-flight connection failure.
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be built (bad URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// True when the failure means the network itself is gone.
    pub fn is_connectivity_loss(&self) -> bool {
        matches!(self, TransportError::Unreachable(_))
    }

    /// True when sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Unreachable(_) | TransportError::Timeout(_)
        )
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    /// Convert into a JSON value (text becomes a JSON string, empty becomes null).
    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
            ResponseBody::Empty => Value::Null,
        }
    }
}

/// The normalized outcome of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl RawResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Performs one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError>;
}

/// `Transport` backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from the `[api]` configuration section.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self::with_client(client, &config.base_url, timeout))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve the endpoint against the base URL and append query parameters.
    pub fn build_url(&self, request: &RequestDescriptor) -> Result<Url, TransportError> {
        let separator = if request.endpoint.starts_with('/') { "" } else { "/" };
        let raw = format!("{}{}{}", self.base_url, separator, request.endpoint);
        let mut url = Url::parse(&raw)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid URL '{}': {}", raw, e)))?;

        if !request.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        let url = self.build_url(request)?;
        let started = Instant::now();

        let mut builder = self.client.request(request.method.into(), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        metrics::record_transport_duration(started.elapsed());

        let body = if bytes.is_empty() {
            ResponseBody::Empty
        } else if is_json {
            match serde_json::from_slice(&bytes) {
                Ok(value) => ResponseBody::Json(value),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Response declared JSON but failed to parse; keeping raw text");
                    ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
            }
        } else {
            ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned())
        };

        tracing::debug!(
            method = %request.method,
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "HTTP exchange complete"
        );

        Ok(RawResponse::new(status, body))
    }
}
