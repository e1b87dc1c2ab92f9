//! Connection states of a session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one connection session.
///
/// ```text
/// Disconnected → Connecting → ServiceDiscovery → Syncing → Ready → Disconnecting → Disconnected
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    ServiceDiscovery,
    Syncing,
    Ready,
    Disconnecting,
}

impl ConnectionState {
    /// Whether a session in this state holds the link (or is acquiring it).
    ///
    /// Scanning is only allowed when this is `false`.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::ServiceDiscovery | Self::Syncing | Self::Ready
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::ServiceDiscovery => "service_discovery",
            Self::Syncing => "syncing",
            Self::Ready => "ready",
            Self::Disconnecting => "disconnecting",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn should_treat_only_link_holding_states_as_active() {
        assert!(!ConnectionState::Disconnected.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::ServiceDiscovery.is_active());
        assert!(ConnectionState::Syncing.is_active());
        assert!(ConnectionState::Ready.is_active());
        assert!(!ConnectionState::Disconnecting.is_active());
    }

    #[test]
    fn should_display_snake_case() {
        assert_eq!(ConnectionState::ServiceDiscovery.to_string(), "service_discovery");
    }
}
