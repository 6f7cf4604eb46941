//! Durable FIFO of requests that could not be sent.
//!
//! # Responsibilities
//! - Capture requests issued while offline and persist them on every mutation
//! - Replay them in FIFO order on reconnect, one attempt per entry per pass
//! - Enforce the per-entry replay budget and surface every drop
//!
//! # Design Decisions
//! - The queue itself is the retry mechanism across reconnects, so replays
//!   bypass the retry controller
//! - One drain at a time; re-entrant calls return a skipped report
//! - Failed entries are re-drained after a fixed delay, never hot-looped
//! - A pass stops at the first connectivity loss; the reconnect drain resumes it
//! - A cancelled pass puts its unresolved entries back at the front of the queue
//! - Lock order is `entries` then `replaying`; no lock is held across an await

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{ClientConfig, HeaderPolicy, ReplayCheckpoint};
use crate::http::headers::DefaultHeaders;
use crate::http::request::RequestDescriptor;
use crate::http::transport::Transport;
use crate::network::NetworkMonitor;
use crate::observability::metrics;
use crate::queue::store::{QueueStore, StoreError};
use crate::queue::types::{DrainReport, QueueEvent, QueuedRequest};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to persist offline queue: {0}")]
    Persist(#[from] StoreError),
}

/// Replay behaviour of an [`OfflineQueue`].
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Failed replays allowed per entry before it is dropped.
    pub max_retries: u32,
    pub redrain_delay: Duration,
    pub header_policy: HeaderPolicy,
    pub checkpoint: ReplayCheckpoint,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            redrain_delay: Duration::from_secs(5),
            header_policy: HeaderPolicy::default(),
            checkpoint: ReplayCheckpoint::default(),
        }
    }
}

impl From<&ClientConfig> for QueueSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.retry.max_retries,
            redrain_delay: Duration::from_millis(config.queue.redrain_delay_ms),
            header_policy: config.queue.header_policy,
            checkpoint: config.queue.checkpoint,
        }
    }
}

enum Resolution {
    Delivered(u16),
    Rejected(u16),
    Failed(String),
}

pub struct OfflineQueue {
    entries: Mutex<Vec<QueuedRequest>>,
    /// Unresolved remainder of a per-entry checkpointed pass.
    replaying: Mutex<VecDeque<QueuedRequest>>,
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn Transport>,
    headers: DefaultHeaders,
    settings: QueueSettings,
    draining: AtomicBool,
    closed: AtomicBool,
    pending_pass: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<QueueEvent>,
    monitor: Option<Arc<NetworkMonitor>>,
}

impl OfflineQueue {
    /// Load the persisted queue. A corrupt or unreadable image is logged and
    /// the queue starts empty.
    pub fn new(
        store: Arc<dyn QueueStore>,
        transport: Arc<dyn Transport>,
        headers: DefaultHeaders,
        settings: QueueSettings,
    ) -> Self {
        let entries = match store.load() {
            Ok(entries) => {
                if !entries.is_empty() {
                    tracing::info!(entries = entries.len(), "Restored offline queue");
                }
                entries
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load offline queue, starting empty");
                Vec::new()
            }
        };
        metrics::record_queue_depth(entries.len());
        let (events, _) = broadcast::channel(256);

        Self {
            entries: Mutex::new(entries),
            replaying: Mutex::new(VecDeque::new()),
            store,
            transport,
            headers,
            settings,
            draining: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            pending_pass: Mutex::new(None),
            events,
            monitor: None,
        }
    }

    /// Tie replay to the network monitor: connectivity loss seen during a
    /// pass is reported to it, and delayed passes wait while it is offline.
    pub fn with_monitor(mut self, monitor: Arc<NetworkMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Append a request and persist the queue. On a persistence failure the
    /// entry is not kept.
    pub fn enqueue(&self, descriptor: RequestDescriptor) -> Result<QueuedRequest, QueueError> {
        let descriptor = match self.settings.header_policy {
            HeaderPolicy::ReplayTime => descriptor,
            HeaderPolicy::EnqueueTime => descriptor.with_defaults(&self.headers.snapshot()),
        };
        let entry = QueuedRequest::new(descriptor);

        let depth = {
            let mut entries = lock(&self.entries);
            entries.push(entry.clone());
            if let Err(e) = self.persist(&entries) {
                entries.pop();
                tracing::error!(
                    error = %e,
                    method = %entry.descriptor.method,
                    endpoint = %entry.descriptor.endpoint,
                    "Failed to persist queued request"
                );
                return Err(e.into());
            }
            entries.len()
        };

        tracing::info!(
            id = %entry.id,
            method = %entry.descriptor.method,
            endpoint = %entry.descriptor.endpoint,
            depth,
            "Request queued for replay"
        );
        metrics::record_queue_depth(depth);
        let _ = self.events.send(QueueEvent::Enqueued { id: entry.id.clone() });
        Ok(entry)
    }

    /// Number of entries in the persisted image.
    pub fn len(&self) -> usize {
        let entries = lock(&self.entries);
        let replaying = lock(&self.replaying);
        entries.len() + replaying.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The persisted image, in replay order.
    pub fn snapshot(&self) -> Vec<QueuedRequest> {
        let entries = lock(&self.entries);
        let replaying = lock(&self.replaying);
        replaying.iter().chain(entries.iter()).cloned().collect()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Replay every queued entry once, in FIFO order.
    pub async fn drain(self: &Arc<Self>) -> DrainReport {
        if self.closed.load(Ordering::SeqCst) {
            return DrainReport::skipped();
        }
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Drain already in progress, skipping");
            return DrainReport::skipped();
        }
        let mut pass = DrainPass {
            queue: &**self,
            pending: VecDeque::new(),
        };

        pass.pending = self.take_batch().into();
        let mut report = DrainReport::default();
        if pass.pending.is_empty() {
            return report;
        }
        tracing::info!(entries = pass.pending.len(), "Draining offline queue");

        // An entry leaves `pending` only once its send has resolved.
        while let Some(entry) = pass.pending.front().cloned() {
            let request = match self.settings.header_policy {
                HeaderPolicy::ReplayTime => entry.descriptor.with_defaults(&self.headers.snapshot()),
                HeaderPolicy::EnqueueTime => entry.descriptor.clone(),
            };

            let mut connectivity_lost = false;
            let resolution = match self.transport.send(&request).await {
                Ok(raw) if raw.is_success() => Resolution::Delivered(raw.status),
                Ok(raw) if raw.is_client_error() => Resolution::Rejected(raw.status),
                Ok(raw) => Resolution::Failed(format!("API Error: {}", raw.status)),
                Err(e) => {
                    connectivity_lost = e.is_connectivity_loss();
                    Resolution::Failed(e.to_string())
                }
            };
            pass.pending.pop_front();
            self.resolve(entry, resolution, &mut report);

            if connectivity_lost {
                if let Some(monitor) = &self.monitor {
                    monitor.report_connectivity_loss();
                    if !monitor.is_online() && !pass.pending.is_empty() {
                        tracing::info!(
                            remaining = pass.pending.len(),
                            "Network unreachable during replay, pausing drain"
                        );
                        let unresolved = mem::take(&mut pass.pending);
                        self.restore(unresolved);
                        break;
                    }
                }
            }
        }

        let remaining = lock(&self.entries).len();
        metrics::record_queue_depth(remaining);
        tracing::info!(
            delivered = report.delivered,
            rejected = report.rejected,
            requeued = report.requeued,
            dropped = report.dropped,
            remaining,
            "Drain pass complete"
        );

        if remaining > 0 {
            self.schedule_pass();
        }
        report
    }

    /// Stop scheduling replay passes and cancel a pending one. An in-flight
    /// drain finishes its current pass.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(handle) = lock(&self.pending_pass).take() {
            handle.abort();
            tracing::debug!("Cancelled pending drain pass");
        }
    }

    fn take_batch(&self) -> Vec<QueuedRequest> {
        let mut entries = lock(&self.entries);
        let batch = mem::take(&mut *entries);
        if batch.is_empty() {
            return batch;
        }

        if self.settings.checkpoint == ReplayCheckpoint::PerEntry {
            lock(&self.replaying).extend(batch.iter().cloned());
        }
        if let Err(e) = self.persist(&entries) {
            tracing::error!(error = %e, "Failed to persist offline queue before replay");
        }
        batch
    }

    fn resolve(&self, mut entry: QueuedRequest, resolution: Resolution, report: &mut DrainReport) {
        let event = {
            let mut entries = lock(&self.entries);
            if self.settings.checkpoint == ReplayCheckpoint::PerEntry {
                lock(&self.replaying).pop_front();
            }

            let event = match resolution {
                Resolution::Delivered(status) => {
                    report.delivered += 1;
                    tracing::info!(id = %entry.id, endpoint = %entry.descriptor.endpoint, status, "Queued request delivered");
                    metrics::record_replay("delivered");
                    QueueEvent::Delivered { id: entry.id, status }
                }
                Resolution::Rejected(status) => {
                    report.rejected += 1;
                    tracing::warn!(
                        id = %entry.id,
                        method = %entry.descriptor.method,
                        endpoint = %entry.descriptor.endpoint,
                        status,
                        "Queued request rejected by server, dropping"
                    );
                    metrics::record_replay("rejected");
                    QueueEvent::Rejected { id: entry.id, status }
                }
                Resolution::Failed(reason) if entry.retry_count < self.settings.max_retries => {
                    report.requeued += 1;
                    entry.retry_count += 1;
                    tracing::info!(
                        id = %entry.id,
                        endpoint = %entry.descriptor.endpoint,
                        retry_count = entry.retry_count,
                        reason = %reason,
                        "Replay failed, requeued"
                    );
                    metrics::record_replay("requeued");
                    let event = QueueEvent::Requeued {
                        id: entry.id.clone(),
                        retry_count: entry.retry_count,
                    };
                    entries.push(entry);
                    event
                }
                Resolution::Failed(reason) => {
                    report.dropped += 1;
                    tracing::warn!(
                        id = %entry.id,
                        method = %entry.descriptor.method,
                        endpoint = %entry.descriptor.endpoint,
                        retry_count = entry.retry_count,
                        reason = %reason,
                        "Replay budget exhausted, dropping queued request"
                    );
                    metrics::record_replay("dropped");
                    QueueEvent::Dropped { request: entry, reason }
                }
            };

            if let Err(e) = self.persist(&entries) {
                tracing::error!(error = %e, "Failed to persist offline queue after replay");
            }
            event
        };
        let _ = self.events.send(event);
    }

    /// Run a pass after the redrain delay, unless one is pending.
    pub fn schedule_pass(self: &Arc<Self>) {
        let mut pending = lock(&self.pending_pass);
        if self.closed.load(Ordering::SeqCst) || pending.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let delay = self.settings.redrain_delay;
        let queue: Weak<Self> = Arc::downgrade(self);
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Scheduling drain pass");
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(queue) = queue.upgrade() else {
                return;
            };
            lock(&queue.pending_pass).take();
            if queue.monitor.as_ref().is_some_and(|m| !m.is_online()) {
                tracing::debug!("Network offline, leaving replay to the reconnect drain");
                return;
            }
            queue.drain().await;
        }));
    }

    /// Put entries a pass did not resolve back at the front of the live queue.
    fn restore(&self, unresolved: VecDeque<QueuedRequest>) {
        let restored = unresolved.len();
        let mut entries = lock(&self.entries);
        lock(&self.replaying).clear();

        let mut image: Vec<QueuedRequest> = unresolved.into();
        image.append(&mut entries);
        *entries = image;

        if let Err(e) = self.persist(&entries) {
            tracing::error!(error = %e, "Failed to persist offline queue after interrupted replay");
        }
        metrics::record_queue_depth(entries.len());
        tracing::debug!(restored, depth = entries.len(), "Unresolved entries returned to queue");
    }

    /// Persist the image: unresolved replay remainder first, then the live queue.
    /// Callers hold the `entries` lock.
    fn persist(&self, entries: &[QueuedRequest]) -> Result<(), StoreError> {
        let replaying = lock(&self.replaying);
        if replaying.is_empty() {
            return self.store.save(entries);
        }
        let image: Vec<QueuedRequest> = replaying.iter().chain(entries.iter()).cloned().collect();
        self.store.save(&image)
    }
}

/// Entries of the running pass not yet resolved. Dropping the pass early
/// (the drain future was cancelled) returns them to the queue.
struct DrainPass<'a> {
    queue: &'a OfflineQueue,
    pending: VecDeque<QueuedRequest>,
}

impl Drop for DrainPass<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(
                unresolved = self.pending.len(),
                "Drain cancelled mid-pass, returning entries to the queue"
            );
            self.queue.restore(mem::take(&mut self.pending));
        }
        self.queue.draining.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ManualSignal;
    use crate::queue::store::MemoryStore;
    use crate::testing::{Outcome, ScriptedTransport};
    use serde_json::json;

    struct Fixture {
        queue: Arc<OfflineQueue>,
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryStore>,
        headers: DefaultHeaders,
    }

    fn fixture(transport: ScriptedTransport, settings: QueueSettings) -> Fixture {
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryStore::new());
        let headers = DefaultHeaders::default();
        let queue = Arc::new(OfflineQueue::new(
            store.clone(),
            transport.clone(),
            headers.clone(),
            settings,
        ));
        Fixture {
            queue,
            transport,
            store,
            headers,
        }
    }

    fn persisted(store: &MemoryStore) -> Vec<QueuedRequest> {
        store.load().unwrap()
    }

    struct BrokenStore;

    impl QueueStore for BrokenStore {
        fn load(&self) -> Result<Vec<QueuedRequest>, StoreError> {
            Ok(Vec::new())
        }

        fn save(&self, _entries: &[QueuedRequest]) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn test_enqueue_persists_and_publishes() {
        let f = fixture(ScriptedTransport::new(), QueueSettings::default());
        let mut events = f.queue.subscribe();

        let entry = f
            .queue
            .enqueue(RequestDescriptor::post("/leads", json!({"name": "A"})))
            .unwrap();

        assert_eq!(entry.retry_count, 0);
        assert_eq!(f.queue.len(), 1);
        assert_eq!(persisted(&f.store), vec![entry.clone()]);
        assert_eq!(events.try_recv().unwrap(), QueueEvent::Enqueued { id: entry.id });
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_rolls_back_on_persist_failure() {
        let queue = OfflineQueue::new(
            Arc::new(BrokenStore),
            Arc::new(ScriptedTransport::new()),
            DefaultHeaders::default(),
            QueueSettings::default(),
        );

        let result = queue.enqueue(RequestDescriptor::get("/x"));
        assert!(matches!(result, Err(QueueError::Persist(StoreError::Io(_)))));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_is_fifo_and_clears_store() {
        let f = fixture(ScriptedTransport::new(), QueueSettings::default());
        f.queue.enqueue(RequestDescriptor::post("/a", json!(1))).unwrap();
        f.queue.enqueue(RequestDescriptor::post("/b", json!(2))).unwrap();
        f.queue.enqueue(RequestDescriptor::delete("/c")).unwrap();

        let report = f.queue.drain().await;

        assert_eq!(report.delivered, 3);
        assert!(!report.skipped);
        assert_eq!(f.transport.call_log(), vec!["POST /a", "POST /b", "DELETE /c"]);
        assert!(f.queue.is_empty());
        assert!(persisted(&f.store).is_empty());
    }

    #[tokio::test]
    async fn test_empty_drain_does_nothing() {
        let f = fixture(ScriptedTransport::new(), QueueSettings::default());
        let report = f.queue.drain().await;
        assert_eq!(report, DrainReport::default());
        assert!(f.store.raw().is_none());
    }

    #[tokio::test]
    async fn test_client_error_is_rejected_not_retried() {
        let f = fixture(ScriptedTransport::new(), QueueSettings::default());
        f.transport.push(Outcome::Status(422));
        let entry = f.queue.enqueue(RequestDescriptor::post("/leads", json!({}))).unwrap();
        let mut events = f.queue.subscribe();

        let report = f.queue.drain().await;

        assert_eq!(report.rejected, 1);
        assert!(f.queue.is_empty());
        assert_eq!(
            events.try_recv().unwrap(),
            QueueEvent::Rejected { id: entry.id, status: 422 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_budget_exhaustion_drops_entry() {
        let f = fixture(
            ScriptedTransport::with_fallback(Outcome::Status(503)),
            QueueSettings::default(),
        );
        let entry = f.queue.enqueue(RequestDescriptor::post("/leads", json!({}))).unwrap();
        let mut events = f.queue.subscribe();

        let report = f.queue.drain().await;
        assert_eq!(report.requeued, 1);
        assert_eq!(persisted(&f.store)[0].retry_count, 1);

        let dropped = tokio::time::timeout(Duration::from_secs(60), async {
            loop {
                if let QueueEvent::Dropped { request, .. } = events.recv().await.unwrap() {
                    return request;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(dropped.id, entry.id);
        assert_eq!(dropped.retry_count, 3);
        assert_eq!(f.transport.call_count(), 4);
        assert!(f.queue.is_empty());
        assert!(persisted(&f.store).is_empty());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redrain_waits_for_delay() {
        let f = fixture(ScriptedTransport::new(), QueueSettings::default());
        f.transport.push(Outcome::Unreachable);
        f.queue.enqueue(RequestDescriptor::get("/slow")).unwrap();

        f.queue.drain().await;
        let calls = f.transport.calls();
        assert_eq!(calls.len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let calls = f.transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].at - calls[0].at, Duration::from_secs(5));
        assert!(f.queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_drain_is_skipped() {
        let f = fixture(
            ScriptedTransport::new().with_latency(Duration::from_millis(100)),
            QueueSettings::default(),
        );
        f.queue.enqueue(RequestDescriptor::get("/a")).unwrap();

        let queue = f.queue.clone();
        let first = tokio::spawn(async move { queue.drain().await });
        while !f.queue.is_draining() {
            tokio::task::yield_now().await;
        }

        let second = f.queue.drain().await;
        assert!(second.skipped);

        let first = first.await.unwrap();
        assert_eq!(first.delivered, 1);
        assert_eq!(f.transport.call_count(), 1);
        assert!(!f.queue.is_draining());
    }

    #[tokio::test]
    async fn test_replay_uses_current_headers() {
        let f = fixture(ScriptedTransport::new(), QueueSettings::default());
        f.headers.set_auth_token("old");
        f.queue.enqueue(RequestDescriptor::get("/me")).unwrap();
        assert!(persisted(&f.store)[0].descriptor.headers.is_empty());

        f.headers.set_auth_token("new");
        f.queue.drain().await;

        let call = &f.transport.calls()[0];
        assert_eq!(call.request.header("authorization"), Some("Bearer new"));
        assert_eq!(call.request.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_enqueue_time_headers_are_captured() {
        let settings = QueueSettings {
            header_policy: HeaderPolicy::EnqueueTime,
            ..QueueSettings::default()
        };
        let f = fixture(ScriptedTransport::new(), settings);
        f.headers.set_auth_token("old");
        f.queue
            .enqueue(RequestDescriptor::get("/me").with_header("X-Trace", "1"))
            .unwrap();

        f.headers.set_auth_token("new");
        f.queue.drain().await;

        let call = &f.transport.calls()[0];
        assert_eq!(call.request.header("authorization"), Some("Bearer old"));
        assert_eq!(call.request.header("x-trace"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_checkpoint_clears_store_before_replay() {
        let f = fixture(
            ScriptedTransport::new().with_latency(Duration::from_millis(100)),
            QueueSettings::default(),
        );
        f.queue.enqueue(RequestDescriptor::get("/a")).unwrap();
        f.queue.enqueue(RequestDescriptor::get("/b")).unwrap();

        let queue = f.queue.clone();
        let drain = tokio::spawn(async move { queue.drain().await });
        while f.transport.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(persisted(&f.store).is_empty());
        drain.await.unwrap();
        assert_eq!(f.transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_entry_checkpoint_keeps_unresolved_entries() {
        let settings = QueueSettings {
            checkpoint: ReplayCheckpoint::PerEntry,
            ..QueueSettings::default()
        };
        let f = fixture(
            ScriptedTransport::new().with_latency(Duration::from_millis(100)),
            settings,
        );
        let a = f.queue.enqueue(RequestDescriptor::get("/a")).unwrap();
        let b = f.queue.enqueue(RequestDescriptor::get("/b")).unwrap();

        let queue = f.queue.clone();
        let drain = tokio::spawn(async move { queue.drain().await });
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(f.transport.call_count(), 2);
        assert_eq!(persisted(&f.store), vec![b.clone()]);
        assert_eq!(f.queue.snapshot(), vec![b]);
        assert_ne!(persisted(&f.store)[0].id, a.id);

        drain.await.unwrap();
        assert!(persisted(&f.store).is_empty());
        assert!(f.queue.is_empty());
    }

    fn endpoints(entries: &[QueuedRequest]) -> Vec<String> {
        entries.iter().map(|e| e.descriptor.endpoint.clone()).collect()
    }

    async fn assert_cancelled_drain_keeps_entries(checkpoint: ReplayCheckpoint) {
        let settings = QueueSettings {
            checkpoint,
            ..QueueSettings::default()
        };
        let f = fixture(
            ScriptedTransport::new().with_latency(Duration::from_millis(100)),
            settings,
        );
        f.queue.enqueue(RequestDescriptor::get("/a")).unwrap();
        f.queue.enqueue(RequestDescriptor::get("/b")).unwrap();
        f.queue.enqueue(RequestDescriptor::get("/c")).unwrap();

        let cut = tokio::time::timeout(Duration::from_millis(150), f.queue.drain()).await;
        assert!(cut.is_err());

        // `/a` resolved; `/b` was in flight and goes back with `/c`
        assert!(!f.queue.is_draining());
        assert_eq!(f.queue.len(), 2);
        assert_eq!(endpoints(&f.queue.snapshot()), vec!["/b", "/c"]);
        assert_eq!(endpoints(&persisted(&f.store)), vec!["/b", "/c"]);

        f.queue.enqueue(RequestDescriptor::get("/d")).unwrap();
        let report = f.queue.drain().await;

        assert_eq!(report.delivered, 3);
        assert_eq!(
            f.transport.call_log(),
            vec!["GET /a", "GET /b", "GET /b", "GET /c", "GET /d"]
        );
        assert!(f.queue.is_empty());
        assert!(persisted(&f.store).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_drain_returns_unresolved_entries() {
        assert_cancelled_drain_keeps_entries(ReplayCheckpoint::Batch).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_per_entry_drain_returns_unresolved_entries() {
        assert_cancelled_drain_keeps_entries(ReplayCheckpoint::PerEntry).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_loss_pauses_replay_until_online() {
        let monitor = Arc::new(NetworkMonitor::new(Arc::new(ManualSignal::online())));
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(
            OfflineQueue::new(
                store.clone(),
                transport.clone(),
                DefaultHeaders::default(),
                QueueSettings::default(),
            )
            .with_monitor(monitor.clone()),
        );
        transport.push(Outcome::Unreachable);
        queue.enqueue(RequestDescriptor::get("/a")).unwrap();
        queue.enqueue(RequestDescriptor::get("/b")).unwrap();

        let report = queue.drain().await;
        assert_eq!(report.requeued, 1);
        assert_eq!(transport.call_count(), 1);
        assert!(!monitor.is_online());
        assert_eq!(endpoints(&persisted(&store)), vec!["/b", "/a"]);
        assert_eq!(persisted(&store)[0].retry_count, 0);

        // No delayed pass spends budget while offline
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.call_count(), 1);
        assert_eq!(queue.len(), 2);

        monitor.handle_online();
        let report = queue.drain().await;
        assert_eq!(report.delivered, 2);
        assert_eq!(transport.call_log(), vec!["GET /a", "GET /b", "GET /a"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_restart_replays_same_calls() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryStore::new());

        let before = OfflineQueue::new(
            store.clone(),
            transport.clone(),
            DefaultHeaders::default(),
            QueueSettings::default(),
        );
        before.enqueue(RequestDescriptor::post("/leads", json!({"name": "A"}))).unwrap();
        before.enqueue(RequestDescriptor::put("/leads/1", json!({"name": "B"}))).unwrap();
        drop(before);

        let after = Arc::new(OfflineQueue::new(
            store.clone(),
            transport.clone(),
            DefaultHeaders::default(),
            QueueSettings::default(),
        ));
        assert_eq!(after.len(), 2);

        after.drain().await;
        assert_eq!(transport.call_log(), vec!["POST /leads", "PUT /leads/1"]);
        assert_eq!(transport.calls()[0].request.body, Some(json!({"name": "A"})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_pass() {
        let f = fixture(
            ScriptedTransport::with_fallback(Outcome::Status(500)),
            QueueSettings::default(),
        );
        f.queue.enqueue(RequestDescriptor::get("/a")).unwrap();

        f.queue.drain().await;
        f.queue.shutdown();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(f.transport.call_count(), 1);
        assert_eq!(f.queue.len(), 1);
        assert!(f.queue.drain().await.skipped);
    }
}
