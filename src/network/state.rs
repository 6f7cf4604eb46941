//! Connectivity state.
//!
//! # States
//! - Online: requests go to the transport
//! - Offline: requests go to the offline queue
//!
//! # State Transitions
//! ```text
//! Online → Offline: platform loss-of-connectivity signal, or a request
//!                   observed a connectivity failure
//! Offline → Online: platform regained-connectivity signal (triggers a drain)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Online = 0,
    Offline = 1,
}

impl From<u8> for NetworkState {
    fn from(val: u8) -> Self {
        match val {
            1 => NetworkState::Offline,
            _ => NetworkState::Online,
        }
    }
}

impl NetworkState {
    pub fn is_online(self) -> bool {
        self == NetworkState::Online
    }
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkState::Online => f.write_str("online"),
            NetworkState::Offline => f.write_str("offline"),
        }
    }
}
