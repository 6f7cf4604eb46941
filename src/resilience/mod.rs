//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request while online:
//!     → retries.rs (send, classify outcome)
//!     → 5xx / no response: backoff.rs (1s, 2s, 4s, ... capped at 30s)
//!     → retry until max_retries, then return the last outcome
//! ```
//!
//! # Design Decisions
//! - Only 5xx and "no response" are transient
//! - Retries are sequential and never concurrent
//! - Retries across reconnects belong to the offline queue, not here

pub mod backoff;
pub mod retries;

pub use retries::{RetryController, RetryPolicy};
