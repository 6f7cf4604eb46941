//! Platform connectivity signals.
//!
//! A signal is the only input the monitor trusts besides request outcomes.
//! Hosts without one use [`NoSignal`]; hosts that receive OS events forward
//! them through [`ManualSignal`]; headless deployments that want detection
//! use [`ProbeSignal`](crate::network::probe::ProbeSignal).

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::broadcast;

use crate::network::state::NetworkState;

/// Source of online/offline transitions.
pub trait ConnectivitySignal: Send + Sync {
    /// Current platform state, or `None` if the platform has no signal.
    fn current_state(&self) -> Option<NetworkState>;

    /// Stream of transitions, or `None` if the platform has no signal.
    fn subscribe(&self) -> Option<broadcast::Receiver<NetworkState>>;

    /// A request observed connectivity loss the signal has not reported yet.
    /// Signals that track state move to offline so their next online report
    /// is a real transition.
    fn report_unreachable(&self) {}
}

/// Platform without a connectivity signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignal;

impl ConnectivitySignal for NoSignal {
    fn current_state(&self) -> Option<NetworkState> {
        None
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<NetworkState>> {
        None
    }
}

/// Signal driven by the host application (or a test).
#[derive(Debug)]
pub struct ManualSignal {
    state: AtomicU8,
    tx: broadcast::Sender<NetworkState>,
}

impl ManualSignal {
    pub fn new(initial: NetworkState) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            state: AtomicU8::new(initial as u8),
            tx,
        }
    }

    pub fn online() -> Self {
        Self::new(NetworkState::Online)
    }

    pub fn offline() -> Self {
        Self::new(NetworkState::Offline)
    }

    /// Report a platform event. Repeated events for the same state are ignored.
    pub fn set(&self, state: NetworkState) {
        let previous = NetworkState::from(self.state.swap(state as u8, Ordering::SeqCst));
        if previous != state {
            let _ = self.tx.send(state);
        }
    }

    pub fn set_online(&self) {
        self.set(NetworkState::Online);
    }

    pub fn set_offline(&self) {
        self.set(NetworkState::Offline);
    }
}

impl ConnectivitySignal for ManualSignal {
    fn current_state(&self) -> Option<NetworkState> {
        Some(NetworkState::from(self.state.load(Ordering::SeqCst)))
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<NetworkState>> {
        Some(self.tx.subscribe())
    }

    fn report_unreachable(&self) {
        self.set_offline();
    }
}
