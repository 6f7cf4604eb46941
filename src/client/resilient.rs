//! The public request entry point.
//!
//! # Responsibilities
//! - Route each request: offline → queue, online → retry controller
//! - Turn connectivity loss observed mid-request into a queued request
//! - Drain the queue on every offline → online transition
//! - Own the shared default headers (auth token included)
//!
//! # Design Decisions
//! - Callers always get a `ResponseEnvelope`; nothing here returns `Err`
//! - A queued request's eventual outcome is published on the queue's event
//!   channel, never returned to the original caller
//! - State reads are snapshots; a request that races a reconnect is simply
//!   replayed by the next drain

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::http::headers::DefaultHeaders;
use crate::http::request::{Method, RequestDescriptor};
use crate::http::response::{ErrorInfo, ErrorKind, ResponseEnvelope};
use crate::http::transport::Transport;
use crate::network::{ConnectivitySignal, NetworkMonitor, NetworkState};
use crate::observability::metrics;
use crate::queue::{DrainReport, OfflineQueue, QueueEvent, QueueSettings, QueueStore};
use crate::resilience::{RetryController, RetryPolicy};

pub struct ResilientClient {
    headers: DefaultHeaders,
    retry: RetryController,
    monitor: Arc<NetworkMonitor>,
    queue: Arc<OfflineQueue>,
    reconnect: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl ResilientClient {
    /// Build the pipeline and start following connectivity.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn QueueStore>,
        signal: Arc<dyn ConnectivitySignal>,
        config: &ClientConfig,
    ) -> Self {
        let headers = DefaultHeaders::new(config.api.default_headers.clone());
        let retry = RetryController::new(transport.clone(), RetryPolicy::from(&config.retry));
        let monitor = Arc::new(NetworkMonitor::new(signal));
        monitor.start();

        let queue = Arc::new(
            OfflineQueue::new(store, transport, headers.clone(), QueueSettings::from(config))
                .with_monitor(monitor.clone()),
        );
        let reconnect = spawn_reconnect_listener(monitor.subscribe(), queue.clone());

        if config.queue.drain_on_startup && monitor.is_online() && !queue.is_empty() {
            tracing::info!(entries = queue.len(), "Replaying persisted queue at startup");
            let queue = queue.clone();
            tokio::spawn(async move {
                queue.drain().await;
            });
        }

        Self {
            headers,
            retry,
            monitor,
            queue,
            reconnect: Mutex::new(Some(reconnect)),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Issue a request and fold every outcome into an envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> ResponseEnvelope<T> {
        let method = descriptor.method;

        if !self.monitor.is_online() {
            tracing::debug!(%method, endpoint = %descriptor.endpoint, "Offline, queueing request");
            return self.enqueue(descriptor);
        }

        let request = descriptor.with_defaults(&self.headers.snapshot());
        match self.retry.execute(&request).await {
            Ok(raw) => {
                let envelope = ResponseEnvelope::from_raw(raw);
                metrics::record_request(method.as_str(), outcome_label(&envelope));
                envelope
            }
            Err(err) if err.is_connectivity_loss() || !self.monitor.is_online() => {
                tracing::warn!(
                    %method,
                    endpoint = %descriptor.endpoint,
                    error = %err,
                    "Connectivity lost, queueing request"
                );
                self.monitor.report_connectivity_loss();
                let envelope = self.enqueue(descriptor);
                if self.monitor.is_pinned() {
                    self.queue.schedule_pass();
                }
                envelope
            }
            Err(err) => {
                tracing::warn!(%method, endpoint = %descriptor.endpoint, error = %err, "Request failed");
                metrics::record_request(method.as_str(), "failed");
                ResponseEnvelope::failure(ErrorInfo::from(&err), 0)
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ResponseEnvelope<T> {
        self.request(RequestDescriptor::get(endpoint)).await
    }

    /// GET with query parameters.
    pub async fn get_with<T, I, K, V>(&self, endpoint: &str, params: I) -> ResponseEnvelope<T>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.request(RequestDescriptor::get(endpoint).with_params(params))
            .await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> ResponseEnvelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_body(Method::Post, endpoint, body).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> ResponseEnvelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_body(Method::Put, endpoint, body).await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, body: &B) -> ResponseEnvelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_body(Method::Patch, endpoint, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ResponseEnvelope<T> {
        self.request(RequestDescriptor::delete(endpoint)).await
    }

    pub fn set_header(&self, name: &str, value: &str) {
        self.headers.set(name, value);
    }

    /// Send `Authorization: Bearer <token>` from now on, queued replays included.
    pub fn set_auth_token(&self, token: &str) {
        self.headers.set_auth_token(token);
    }

    pub fn clear_auth_token(&self) {
        self.headers.clear_auth_token();
    }

    pub fn headers(&self) -> &DefaultHeaders {
        &self.headers
    }

    pub fn network_state(&self) -> NetworkState {
        self.monitor.state()
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    /// Replay the offline queue now.
    pub async fn drain(&self) -> DrainReport {
        self.queue.drain().await
    }

    /// Delivery outcomes of queued requests.
    pub fn queue_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.queue.subscribe()
    }

    /// Release the connectivity listeners and cancel pending replay passes.
    /// In-flight requests are not aborted. Safe to call more than once.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let reconnect = self
            .reconnect
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = reconnect {
            handle.abort();
        }
        self.monitor.stop();
        self.queue.shutdown();
        tracing::debug!("Client destroyed");
    }

    async fn send_body<T, B>(&self, method: Method, endpoint: &str, body: &B) -> ResponseEnvelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match serde_json::to_value(body) {
            Ok(body) => {
                self.request(RequestDescriptor::new(method, endpoint).with_body(body))
                    .await
            }
            Err(e) => ResponseEnvelope::failure(
                ErrorInfo::new(ErrorKind::InvalidRequest, format!("failed to serialize body: {}", e)),
                0,
            ),
        }
    }

    fn enqueue<T>(&self, descriptor: RequestDescriptor) -> ResponseEnvelope<T> {
        let method = descriptor.method;
        match self.queue.enqueue(descriptor) {
            Ok(_) => {
                metrics::record_request(method.as_str(), "queued");
                ResponseEnvelope::queued()
            }
            Err(e) => {
                metrics::record_request(method.as_str(), "failed");
                ResponseEnvelope::failure(ErrorInfo::new(ErrorKind::Persistence, e.to_string()), 0)
            }
        }
    }
}

impl Drop for ResilientClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn spawn_reconnect_listener(
    mut transitions: broadcast::Receiver<NetworkState>,
    queue: Arc<OfflineQueue>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(NetworkState::Online) => {}
                Ok(NetworkState::Offline) => continue,
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
            let queue = queue.clone();
            tokio::spawn(async move {
                queue.drain().await;
            });
        }
    })
}

fn outcome_label<T>(envelope: &ResponseEnvelope<T>) -> &'static str {
    match envelope.error_kind() {
        None => "success",
        Some(ErrorKind::Client) => "client_error",
        Some(ErrorKind::Server) => "server_error",
        Some(ErrorKind::Decode) => "decode_error",
        Some(_) => "failed",
    }
}

/// Untyped JSON envelope, the common case for callers that inspect payloads loosely.
pub type JsonEnvelope = ResponseEnvelope<Value>;
