//! Test doubles for the request pipeline.
//!
//! `ScriptedTransport` replays a script of outcomes and records every call, so
//! retry counts, backoff timing and replay order can be asserted without a
//! network. Timestamps use `tokio::time::Instant`, which follows a paused clock.
//!
//! ```rust
//! use resilient_client::testing::{Outcome, ScriptedTransport};
//!
//! let transport = ScriptedTransport::new();
//! transport.push(Outcome::Status(503));
//! transport.push(Outcome::Status(200));
//! assert_eq!(transport.call_count(), 0);
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::http::request::RequestDescriptor;
use crate::http::transport::{RawResponse, ResponseBody, Transport, TransportError};

/// One scripted transport result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Respond with this status and an empty body.
    Status(u16),
    /// Respond with this status and a JSON body.
    Json(u16, Value),
    /// Fail with `TransportError::Unreachable`.
    Unreachable,
    /// Fail with `TransportError::Timeout`.
    Timeout,
}

impl Outcome {
    fn materialize(&self) -> Result<RawResponse, TransportError> {
        match self {
            Outcome::Status(status) => Ok(RawResponse::new(*status, ResponseBody::Empty)),
            Outcome::Json(status, body) => {
                Ok(RawResponse::new(*status, ResponseBody::Json(body.clone())))
            }
            Outcome::Unreachable => Err(TransportError::Unreachable("scripted".to_string())),
            Outcome::Timeout => Err(TransportError::Timeout(Duration::from_secs(30))),
        }
    }
}

/// A call observed by `ScriptedTransport`.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: RequestDescriptor,
    pub at: Instant,
}

/// Transport that answers from a script, then from a fallback outcome.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Mutex<Outcome>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    /// Empty script; every call answers `200` once the script is exhausted.
    pub fn new() -> Self {
        Self::with_fallback(Outcome::Status(200))
    }

    pub fn with_fallback(fallback: Outcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Delay every answer by `latency` (after the call is recorded).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push(&self, outcome: Outcome) {
        lock(&self.script).push_back(outcome);
    }

    pub fn push_many(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        lock(&self.script).extend(outcomes);
    }

    pub fn set_fallback(&self, outcome: Outcome) {
        *lock(&self.fallback) = outcome;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// `"METHOD endpoint"` for every call, in order.
    pub fn call_log(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .map(|c| format!("{} {}", c.request.method, c.request.endpoint))
            .collect()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        lock(&self.calls).push(RecordedCall {
            request: request.clone(),
            at: Instant::now(),
        });
        let outcome = {
            let next = lock(&self.script).pop_front();
            match next {
                Some(outcome) => outcome,
                None => lock(&self.fallback).clone(),
            }
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        outcome.materialize()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
