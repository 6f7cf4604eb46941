//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Build transport + store + signal → Start probe → Client
//!
//! Shutdown (shutdown.rs):
//!     ClientRuntime::shutdown → broadcast to background tasks
//!     → client.destroy() (listeners released, pending drain passes cancelled)
//! ```
//!
//! # Design Decisions
//! - One explicit composition root; no global client instance
//! - Shutdown never aborts in-flight requests

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, start_with_signal, ClientRuntime, StartupError};
