//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Queue lifecycle events (enqueue, replay, drop) are logged with the entry id
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;
