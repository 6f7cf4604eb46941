//! Resilient API client.
//!
//! Issues requests to a remote API over an unreliable network without
//! silently losing caller-initiated mutations.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller ──▶ client::ResilientClient ──┬─ offline ─▶ queue::OfflineQueue ──▶ store (JSON)
//!                       ▲                  │                    │
//!                       │                  └─ online ──▶ resilience::RetryController
//!                       │                                       │
//!            network::NetworkMonitor                            ▼
//!            (signal / probe, drains                    http::Transport ──▶ API
//!             the queue on reconnect)                           │
//!                                                               ▼
//!     caller ◀──────────────── http::ResponseEnvelope ◀─────────┘
//! ```

// Core pipeline
pub mod client;
pub mod http;
pub mod network;
pub mod queue;
pub mod resilience;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub mod testing;

pub use client::{JsonEnvelope, ResilientClient, Resource};
pub use config::ClientConfig;
pub use http::{ErrorInfo, ErrorKind, Method, RequestDescriptor, ResponseEnvelope};
pub use lifecycle::{start, start_with_signal, ClientRuntime};
pub use network::{ConnectivitySignal, ManualSignal, NetworkState};
pub use queue::{DrainReport, QueueEvent};
