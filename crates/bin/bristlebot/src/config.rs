//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `bristlebot.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use bristlebot_adapter_ble::BleConfig;
use bristlebot_app::config::SessionConfig;
use bristlebot_domain::address::DeviceAddress;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Robot to connect to on startup.
    pub address: Option<DeviceAddress>,
    /// Engine timing and retry settings.
    pub session: SessionConfig,
    /// Host adapter settings.
    pub ble: BleConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `bristlebot.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("bristlebot.toml")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("BRISTLEBOT_ADDRESS") {
            let address = val
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid BRISTLEBOT_ADDRESS {val:?}")))?;
            self.address = Some(address);
        }
        if let Ok(val) = std::env::var("BRISTLEBOT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.motor_flush_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "session.motor_flush_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.session.rssi_poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "session.rssi_poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.session.scan_duration_secs == 0 {
            return Err(ConfigError::Validation(
                "session.scan_duration_secs must be non-zero".to_string(),
            ));
        }
        if self.session.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "session.event_capacity must be non-zero".to_string(),
            ));
        }
        if self.ble.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "ble.connect_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "bristlebot=info,bristlebot_app=info,bristlebot_adapter_ble=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
