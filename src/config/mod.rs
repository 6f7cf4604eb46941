//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → lifecycle::startup builds transport, store, signal and client from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ApiConfig, ClientConfig, HeaderPolicy, ObservabilityConfig, ProbeConfig, QueueConfig,
    ReplayCheckpoint, RetryConfig,
};
pub use validation::{validate_config, ValidationError};
