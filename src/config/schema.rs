//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the resilient client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend API location, timeouts and default headers.
    pub api: ApiConfig,

    /// Retry budget and backoff for online requests and queue replays.
    pub retry: RetryConfig,

    /// Offline queue persistence and replay settings.
    pub queue: QueueConfig,

    /// Active connectivity probe.
    pub network: ProbeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is appended to (e.g., "https://api.example.com/v1").
    pub base_url: String,

    /// Total request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Headers sent with every request, including queued replays.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            default_headers: BTreeMap::new(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retries per request, and replay attempts per queued entry.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Which default headers a queued request is replayed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// Headers current when the replay is sent (e.g. the latest auth token).
    #[default]
    ReplayTime,
    /// Defaults captured into the queued entry when it is enqueued.
    EnqueueTime,
}

/// When a drain pass rewrites the persisted queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayCheckpoint {
    /// Persist the empty queue before replay starts. A crash mid-pass loses
    /// the entries not yet replayed, but never sends one twice.
    #[default]
    Batch,
    /// Keep the not-yet-resolved remainder persisted until each entry
    /// resolves. A crash mid-pass may send the in-flight entry twice.
    PerEntry,
}

/// Offline queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Directory holding the persisted queue. `None` keeps the queue in memory only.
    pub storage_dir: Option<PathBuf>,

    /// Key the queue is stored under (file stem inside `storage_dir`).
    pub storage_key: String,

    /// Delay before re-draining entries that failed a replay pass, in milliseconds.
    pub redrain_delay_ms: u64,

    pub header_policy: HeaderPolicy,

    pub checkpoint: ReplayCheckpoint,

    /// Replay a non-empty persisted queue when the client starts online.
    pub drain_on_startup: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_dir: Some(PathBuf::from(".resilient-client")),
            storage_key: "apiOfflineQueue".to_string(),
            redrain_delay_ms: 5000,
            header_policy: HeaderPolicy::default(),
            checkpoint: ReplayCheckpoint::default(),
            drain_on_startup: true,
        }
    }
}

/// Active connectivity probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Enable the probe. Without it (and without a host-provided signal) the
    /// client treats the network as permanently online.
    pub probe_enabled: bool,

    /// URL probed with GET. Any HTTP response counts as reachable.
    pub probe_url: Option<String>,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Consecutive failed probes before going offline.
    pub offline_threshold: u32,

    /// Consecutive successful probes before going back online.
    pub online_threshold: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe_enabled: false,
            probe_url: None,
            interval_secs: 10,
            timeout_secs: 5,
            offline_threshold: 2,
            online_threshold: 1,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
