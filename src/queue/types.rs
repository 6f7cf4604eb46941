//! Queue records, events and reports.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::http::request::RequestDescriptor;

/// A request waiting for replay.
///
/// Serialized as `{id, descriptor, enqueuedAt, retryCount}` with
/// `enqueuedAt` in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub id: String,
    pub descriptor: RequestDescriptor,
    pub enqueued_at: u64,
    pub retry_count: u32,
}

impl QueuedRequest {
    pub fn new(descriptor: RequestDescriptor) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            descriptor,
            enqueued_at: now_millis(),
            retry_count: 0,
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Observable queue lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued { id: String },
    /// Replay answered with a 2xx status.
    Delivered { id: String, status: u16 },
    /// Replay answered with a 4xx status. The entry is dropped without retry.
    Rejected { id: String, status: u16 },
    /// Replay failed transiently; the entry waits for the next pass.
    Requeued { id: String, retry_count: u32 },
    /// Replay budget exhausted. The request is lost.
    Dropped { request: QueuedRequest, reason: String },
}

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub rejected: usize,
    pub requeued: usize,
    pub dropped: usize,
    /// A drain was already running; this call did nothing.
    pub skipped: bool,
}

impl DrainReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn processed(&self) -> usize {
        self.delivered + self.rejected + self.requeued + self.dropped
    }
}
