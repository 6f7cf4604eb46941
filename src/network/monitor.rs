//! Network state ownership.
//!
//! # Responsibilities
//! - Own the process-wide `NetworkState`
//! - Follow the platform signal and request-observed connectivity loss
//! - Publish each transition exactly once
//!
//! # Design Decisions
//! - The monitor never fails; it is a pure transition source
//! - Without a platform signal the monitor is pinned online
//! - Readers take snapshot loads, never compare-and-swap
//! - The listener task holds a weak reference so dropping the monitor stops it

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::network::signal::ConnectivitySignal;
use crate::network::state::NetworkState;
use crate::observability::metrics;

pub struct NetworkMonitor {
    state: AtomicU8,
    pinned: bool,
    signal: Arc<dyn ConnectivitySignal>,
    transitions: broadcast::Sender<NetworkState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkMonitor {
    /// Seed the state from the signal. A platform without a signal is online.
    pub fn new(signal: Arc<dyn ConnectivitySignal>) -> Self {
        let initial = signal.current_state();
        let pinned = initial.is_none();
        let state = initial.unwrap_or(NetworkState::Online);
        let (transitions, _) = broadcast::channel(16);

        if pinned {
            tracing::debug!("No connectivity signal, network pinned online");
        }
        metrics::record_network_state(state.is_online());

        Self {
            state: AtomicU8::new(state as u8),
            pinned,
            signal,
            transitions,
            listener: Mutex::new(None),
        }
    }

    /// Start following the platform signal. Must be called inside a runtime.
    pub fn start(self: &Arc<Self>) {
        let Some(mut rx) = self.signal.subscribe() else {
            return;
        };
        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if listener.is_some() {
            return;
        }

        let monitor: Weak<Self> = Arc::downgrade(self);
        *listener = Some(tokio::spawn(async move {
            loop {
                let event = rx.recv().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                match event {
                    Ok(state) => {
                        monitor.apply(state);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Connectivity events lagged, resyncing");
                        if let Some(state) = monitor.signal.current_state() {
                            monitor.apply(state);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    pub fn state(&self) -> NetworkState {
        NetworkState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// True when the platform has no connectivity signal.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NetworkState> {
        self.transitions.subscribe()
    }

    /// Offline → online. Returns true if this call made the transition.
    pub fn handle_online(&self) -> bool {
        self.transition(NetworkState::Offline, NetworkState::Online)
    }

    /// Online → offline. Returns true if this call made the transition.
    pub fn handle_offline(&self) -> bool {
        self.transition(NetworkState::Online, NetworkState::Offline)
    }

    /// A request failed for lack of connectivity.
    pub fn report_connectivity_loss(&self) -> bool {
        self.signal.report_unreachable();
        self.handle_offline()
    }

    /// Stop following the platform signal.
    pub fn stop(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn apply(&self, state: NetworkState) -> bool {
        match state {
            NetworkState::Online => self.handle_online(),
            NetworkState::Offline => self.handle_offline(),
        }
    }

    fn transition(&self, from: NetworkState, to: NetworkState) -> bool {
        if self.pinned {
            return false;
        }
        let changed = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if changed {
            tracing::info!(from = %from, to = %to, "Network state changed");
            metrics::record_network_state(to.is_online());
            let _ = self.transitions.send(to);
        }
        changed
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
