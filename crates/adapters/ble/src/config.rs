//! BLE adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the btleplug transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Which host adapter to use when several are present.
    pub adapter_index: usize,
    /// Upper bound on locating and connecting to the robot, in seconds.
    pub connect_timeout_secs: u64,
}

impl BleConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            connect_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_first_adapter() {
        let config = BleConfig::default();
        assert_eq!(config.adapter_index, 0);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn should_parse_from_toml() {
        let config: BleConfig = toml::from_str("connect_timeout_secs = 4").unwrap();
        assert_eq!(config.connect_timeout_secs, 4);
        assert_eq!(config.adapter_index, 0);
    }
}
