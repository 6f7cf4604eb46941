//! Client subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → resilient.rs request()
//!     → offline: queue::OfflineQueue (returns "queued" envelope)
//!     → online:  resilience::RetryController → http::Transport
//!     → ResponseEnvelope → caller
//!
//! network::NetworkMonitor (Offline → Online)
//!     → resilient.rs reconnect listener → queue drain
//!
//! resource.rs: typed CRUD wrappers over resilient.rs
//! ```

pub mod resilient;
pub mod resource;

pub use resilient::{JsonEnvelope, ResilientClient};
pub use resource::Resource;
