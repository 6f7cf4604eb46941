//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delays ordered, thresholds > 0)
//! - Check the storage key cannot escape the storage directory
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api.base_url '{0}' is not an http(s) URL")]
    InvalidBaseUrl(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("retry.base_delay_ms ({base}) exceeds retry.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("queue.storage_key '{0}' must be non-empty and must not contain path separators")]
    InvalidStorageKey(String),

    #[error("network.probe_url is required when the probe is enabled")]
    MissingProbeUrl,

    #[error("network.probe_url '{0}' is not an http(s) URL")]
    InvalidProbeUrl(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting every violation.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_http_url(&config.api.base_url) {
        errors.push(ValidationError::InvalidBaseUrl(config.api.base_url.clone()));
    }
    if config.api.timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("api.timeout_ms"));
    }
    if config.api.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("api.connect_timeout_ms"));
    }

    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: config.retry.base_delay_ms,
            max: config.retry.max_delay_ms,
        });
    }

    if config.queue.redrain_delay_ms == 0 {
        errors.push(ValidationError::ZeroValue("queue.redrain_delay_ms"));
    }

    let key = &config.queue.storage_key;
    if key.trim().is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        errors.push(ValidationError::InvalidStorageKey(key.clone()));
    }

    let probe = &config.network;
    if probe.probe_enabled {
        match &probe.probe_url {
            None => errors.push(ValidationError::MissingProbeUrl),
            Some(url) if !is_http_url(url) => {
                errors.push(ValidationError::InvalidProbeUrl(url.clone()))
            }
            Some(_) => {}
        }
        if probe.interval_secs == 0 {
            errors.push(ValidationError::ZeroValue("network.interval_secs"));
        }
        if probe.timeout_secs == 0 {
            errors.push(ValidationError::ZeroValue("network.timeout_secs"));
        }
        if probe.offline_threshold == 0 {
            errors.push(ValidationError::ZeroValue("network.offline_threshold"));
        }
        if probe.online_threshold == 0 {
            errors.push(ValidationError::ZeroValue("network.online_threshold"));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
