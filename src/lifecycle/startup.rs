//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build transport, queue store, connectivity signal and client in order
//! - Start background tasks (connectivity probe, metrics endpoint)
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned before a client exists
//! - The runtime owns every background task so shutdown can stop them

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::client::ResilientClient;
use crate::config::{validate_config, ClientConfig, ValidationError};
use crate::http::transport::{HttpTransport, TransportError};
use crate::lifecycle::shutdown::Shutdown;
use crate::network::{ConnectivitySignal, NoSignal, ProbeSignal};
use crate::observability::metrics;
use crate::queue::{FileStore, MemoryStore, QueueStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to build connectivity probe: {0}")]
    Probe(#[from] reqwest::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A running client and the background tasks it depends on.
pub struct ClientRuntime {
    pub client: Arc<ResilientClient>,
    shutdown: Shutdown,
    probe_task: Option<JoinHandle<()>>,
}

impl ClientRuntime {
    /// Stop background tasks and release the client's listeners and timers.
    pub async fn shutdown(mut self) {
        tracing::info!("Shutting down client runtime");
        self.shutdown.trigger();
        self.client.destroy();

        if let Some(handle) = self.probe_task.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Connectivity probe task ended abnormally");
            }
        }
    }
}

/// Build a client from configuration. Connectivity comes from the active
/// probe when enabled; otherwise the network is treated as always online.
pub fn start(config: &ClientConfig) -> Result<ClientRuntime, StartupError> {
    validate_config(config).map_err(StartupError::Invalid)?;
    let shutdown = Shutdown::new();

    let probe_url = config
        .network
        .probe_url
        .as_deref()
        .filter(|_| config.network.probe_enabled);
    let (signal, probe_task): (Arc<dyn ConnectivitySignal>, _) = match probe_url {
        Some(url) => {
            let probe = Arc::new(ProbeSignal::new(url, &config.network)?);
            let task = tokio::spawn(probe.clone().run(shutdown.subscribe()));
            (probe as Arc<dyn ConnectivitySignal>, Some(task))
        }
        None => (Arc::new(NoSignal) as Arc<dyn ConnectivitySignal>, None),
    };

    build(config, signal, shutdown, probe_task)
}

/// Build a client that follows a host-provided connectivity signal.
pub fn start_with_signal(
    config: &ClientConfig,
    signal: Arc<dyn ConnectivitySignal>,
) -> Result<ClientRuntime, StartupError> {
    validate_config(config).map_err(StartupError::Invalid)?;
    build(config, signal, Shutdown::new(), None)
}

fn build(
    config: &ClientConfig,
    signal: Arc<dyn ConnectivitySignal>,
    shutdown: Shutdown,
    probe_task: Option<JoinHandle<()>>,
) -> Result<ClientRuntime, StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let transport = match HttpTransport::new(&config.api) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            shutdown.trigger();
            return Err(e.into());
        }
    };

    let store: Arc<dyn QueueStore> = match &config.queue.storage_dir {
        Some(dir) => {
            let store = FileStore::new(dir, &config.queue.storage_key);
            tracing::info!(path = %store.path().display(), "Offline queue persisted to disk");
            Arc::new(store)
        }
        None => {
            tracing::info!("Offline queue kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let client = Arc::new(ResilientClient::new(transport, store, signal, config));
    tracing::info!(
        base_url = %config.api.base_url,
        max_retries = config.retry.max_retries,
        network = %client.network_state(),
        queued = client.queue().len(),
        "Client started"
    );

    Ok(ClientRuntime {
        client,
        shutdown,
        probe_task,
    })
}
