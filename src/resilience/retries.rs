//! Retry logic.
//!
//! # Responsibilities
//! - Send one logical request through the transport
//! - Retry 5xx and "no response" failures with exponential backoff
//! - Stop after `max_retries` retries and hand back the last outcome
//!
//! # Design Decisions
//! - 4xx is never retried (client errors are not transient)
//! - Attempts are strictly sequential: each delay is awaited before the next send
//! - Intermediate failures never reach the caller

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::RetryConfig;
use crate::http::request::RequestDescriptor;
use crate::http::response::ResponseEnvelope;
use crate::http::transport::{RawResponse, Transport, TransportError};
use crate::observability::metrics::{self, RetryReason};
use crate::resilience::backoff::calculate_backoff;

/// Bounded exponential-backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay awaited before retry `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Wraps a transport with the retry policy.
#[derive(Clone)]
pub struct RetryController {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send with retry and decode the final response into an envelope.
    ///
    /// Returns `Err` only when no HTTP response was obtained after the last attempt.
    pub async fn send_with_retry<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<ResponseEnvelope<T>, TransportError> {
        self.execute(request).await.map(ResponseEnvelope::from_raw)
    }

    /// Send with retry and return the final raw response.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        let mut attempt: u32 = 0;
        loop {
            let reason = match self.transport.send(request).await {
                Ok(raw) if raw.is_server_error() && attempt < self.policy.max_retries => {
                    tracing::warn!(
                        method = %request.method,
                        endpoint = %request.endpoint,
                        status = raw.status,
                        attempt,
                        "Server error, retrying"
                    );
                    RetryReason::ServerError
                }
                Ok(raw) => return Ok(raw),
                Err(err) if err.is_retryable() && attempt < self.policy.max_retries => {
                    tracing::warn!(
                        method = %request.method,
                        endpoint = %request.endpoint,
                        error = %err,
                        attempt,
                        "Transport failure, retrying"
                    );
                    RetryReason::Transport
                }
                Err(err) => return Err(err),
            };

            let delay = self.policy.delay_for(attempt);
            metrics::record_retry(reason);
            tracing::debug!(delay_ms = delay.as_millis() as u64, attempt, "Backing off");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
