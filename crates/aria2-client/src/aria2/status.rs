//! Coarse connection status for display layers.

use crate::transport::ReadyState;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    /// Collapse the transport ready state; no connection means disconnected.
    pub fn from_ready_state(state: Option<ReadyState>) -> Self {
        match state {
            Some(ReadyState::Connecting) => ConnectionStatus::Connecting,
            Some(ReadyState::Open) => ConnectionStatus::Connected,
            Some(ReadyState::Closing | ReadyState::Closed | ReadyState::Errored) | None => {
                ConnectionStatus::Disconnected
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}
