//! Connection state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a `Connecting` state is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Opening,
    Closing,
}

/// Voice connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session object exists
    #[default]
    Disconnected,

    /// A session is being opened or closed; toggles are ignored
    Connecting { direction: Direction },

    /// Exactly one session is live
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Connecting { .. })
    }

    /// Label shown next to the voice button
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting {
                direction: Direction::Opening,
            } => "connecting",
            Self::Connecting {
                direction: Direction::Closing,
            } => "disconnecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
