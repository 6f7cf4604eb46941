//! Active connectivity probing.
//!
//! # Responsibilities
//! - Periodically probe a reachability URL
//! - Derive online/offline transitions with hysteresis
//!
//! # Design Decisions
//! - Any HTTP response counts as reachable; only "no response" is a failure
//! - Consecutive thresholds prevent flapping; counters reset on transition
//! - Starts optimistic (online) until enough probes fail

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::ProbeConfig;
use crate::network::signal::ConnectivitySignal;
use crate::network::state::NetworkState;

pub struct ProbeSignal {
    client: reqwest::Client,
    url: String,
    interval: Duration,
    offline_threshold: usize,
    online_threshold: usize,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
    tx: broadcast::Sender<NetworkState>,
}

impl ProbeSignal {
    pub fn new(url: impl Into<String>, config: &ProbeConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("resilient-client-probe")
            .build()?;
        let (tx, _) = broadcast::channel(16);

        Ok(Self {
            client,
            url: url.into(),
            interval: Duration::from_secs(config.interval_secs),
            offline_threshold: config.offline_threshold.max(1) as usize,
            online_threshold: config.online_threshold.max(1) as usize,
            state: AtomicU8::new(NetworkState::Online as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
            tx,
        })
    }

    pub fn state(&self) -> NetworkState {
        NetworkState::from(self.state.load(Ordering::Relaxed))
    }

    /// Probe on every tick until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            url = %self.url,
            interval_secs = self.interval.as_secs(),
            "Connectivity probe starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reachable = self.probe_once().await;
                    self.record(reachable);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Connectivity probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Issue one probe request.
    pub async fn probe_once(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                tracing::trace!(url = %self.url, status = %response.status(), "Probe reached host");
                true
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Probe failed");
                false
            }
        }
    }

    /// Fold a probe result into the state. Returns the new state on transition.
    pub fn record(&self, reachable: bool) -> Option<NetworkState> {
        let transition = if reachable {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            if self.state() == NetworkState::Online {
                return None;
            }
            let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
            (successes >= self.online_threshold).then_some(NetworkState::Online)
        } else {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            if self.state() == NetworkState::Offline {
                return None;
            }
            let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
            (failures >= self.offline_threshold).then_some(NetworkState::Offline)
        }?;

        self.state.store(transition as u8, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);
        tracing::info!(url = %self.url, state = %transition, "Probe detected connectivity change");
        let _ = self.tx.send(transition);
        Some(transition)
    }
}

impl ConnectivitySignal for ProbeSignal {
    fn current_state(&self) -> Option<NetworkState> {
        Some(self.state())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<NetworkState>> {
        Some(self.tx.subscribe())
    }

    fn report_unreachable(&self) {
        let previous = self.state.swap(NetworkState::Offline as u8, Ordering::Relaxed);
        if NetworkState::from(previous) == NetworkState::Online {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.consecutive_successes.store(0, Ordering::Relaxed);
            tracing::info!(url = %self.url, "Request failure reported, probing for recovery");
            let _ = self.tx.send(NetworkState::Offline);
        }
    }
}
