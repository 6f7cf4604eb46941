//! Offline queue subsystem.
//!
//! # Data Flow
//! ```text
//! Request while offline (or connectivity lost mid-request):
//!     → offline.rs enqueue (append, persist via store.rs)
//!
//! Reconnect:
//!     → offline.rs drain
//!     → snapshot the queue, checkpoint the store
//!     → one transport send per entry, FIFO
//!     → 2xx delivered | 4xx rejected | otherwise requeue or drop
//!     → leftovers re-drained after a delay
//! ```
//!
//! # Design Decisions
//! - Every mutation is persisted before it is acknowledged
//! - Drops are never silent: each one is logged and published as a `QueueEvent`

pub mod offline;
pub mod store;
pub mod types;

pub use offline::{OfflineQueue, QueueError, QueueSettings};
pub use store::{FileStore, MemoryStore, QueueStore, StoreError};
pub use types::{DrainReport, QueueEvent, QueuedRequest};
