//! Session timing and retry configuration.

use std::time::Duration;

use serde::Deserialize;

/// Tunables for the synchronization engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Period of the motor flush timer, in milliseconds.
    pub motor_flush_interval_ms: u64,
    /// Period of the signal-strength poll, in milliseconds.
    pub rssi_poll_interval_ms: u64,
    /// How long a scan runs before it stops by itself, in seconds.
    pub scan_duration_secs: u64,
    /// Consecutive failures tolerated per bootstrap read before giving up.
    ///
    /// `None` retries forever.
    pub bootstrap_retry_limit: Option<u32>,
    /// Capacity of the UI event broadcast channel.
    pub event_capacity: usize,
}

impl SessionConfig {
    #[must_use]
    pub fn motor_flush_interval(&self) -> Duration {
        Duration::from_millis(self.motor_flush_interval_ms)
    }

    #[must_use]
    pub fn rssi_poll_interval(&self) -> Duration {
        Duration::from_millis(self.rssi_poll_interval_ms)
    }

    #[must_use]
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan_duration_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            motor_flush_interval_ms: 200,
            rssi_poll_interval_ms: 1000,
            scan_duration_secs: 10,
            bootstrap_retry_limit: None,
            event_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.motor_flush_interval(), Duration::from_millis(200));
        assert_eq!(config.rssi_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.scan_duration(), Duration::from_secs(10));
        assert_eq!(config.bootstrap_retry_limit, None);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let config: SessionConfig = toml::from_str(
            "
            motor_flush_interval_ms = 100
            bootstrap_retry_limit = 3
            ",
        )
        .unwrap();
        assert_eq!(config.motor_flush_interval_ms, 100);
        assert_eq!(config.bootstrap_retry_limit, Some(3));
        assert_eq!(config.rssi_poll_interval_ms, 1000);
    }
}
