//! Connectivity detection subsystem.
//!
//! # Data Flow
//! ```text
//! Platform signal (signal.rs / probe.rs):
//!     OS events, host callbacks or periodic probes
//!     → broadcast of online/offline
//!
//! Monitor (monitor.rs):
//!     signal transitions + request-observed connectivity loss
//!     → state.rs (Online ←→ Offline)
//!     → transition broadcast (client drains the queue on Online)
//! ```
//!
//! # Design Decisions
//! - The signal is an injected capability so tests drive transitions directly
//! - No signal means permanently online

pub mod monitor;
pub mod probe;
pub mod signal;
pub mod state;

pub use monitor::NetworkMonitor;
pub use probe::ProbeSignal;
pub use signal::{ConnectivitySignal, ManualSignal, NoSignal};
pub use state::NetworkState;
