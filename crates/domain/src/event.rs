//! Events: typed notifications delivered to the UI layer.
//!
//! This is a closed set: the UI registers one listener and matches on
//! [`SessionEvent`] instead of decoding string-keyed broadcasts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;

/// Why a connection attempt did not reach `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectFailReason {
    /// The link could not be established (or dropped before discovery).
    LinkFailure,
    /// The peer's attribute table is not the bristlebot profile.
    ProfileMismatch,
    /// Service discovery itself failed.
    ServicesNotFound,
    /// A bootstrap read exhausted its configured retry budget.
    BootstrapFailed,
}

impl ConnectFailReason {
    /// Human-readable explanation suitable for display.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::LinkFailure => "Connect Error: Could not connect to device.",
            Self::ProfileMismatch => "Connect Error: Device is not a bristlebot.",
            Self::ServicesNotFound => "Connect Error: Services not found.",
            Self::BootstrapFailed => "Connect Error: Could not read device settings.",
        }
    }
}

impl fmt::Display for ConnectFailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A notification emitted to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The radio is switched off; the user must enable it.
    BluetoothDisabled,
    /// A scan result.
    DeviceFound {
        name: Option<String>,
        address: DeviceAddress,
        rssi: Option<i16>,
    },
    /// The scan window closed or was cancelled.
    ScanComplete,
    /// A connection attempt started.
    Connecting,
    /// The link is up and services are being compared to the profile.
    ServicesMatching,
    /// The profile matched and initial values are being read.
    BootstrapInProgress,
    /// Bootstrap finished; the robot accepts commands.
    Connected,
    /// The connection attempt was abandoned.
    ///
    /// Serialised as `{"code": ..., "message": ...}` so the UI can show
    /// [`ConnectFailReason::message`] directly.
    ConnectFailed {
        #[serde(with = "reason_with_message")]
        reason: ConnectFailReason,
    },
    /// The session ended.
    Disconnected,
    /// Battery level changed (0–100).
    BatteryChanged { percent: u8 },
    /// A fresh signal-strength reading.
    SignalStrengthChanged { dbm: i16 },
}

impl SessionEvent {
    /// Short event name for structured logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BluetoothDisabled => "bluetooth_disabled",
            Self::DeviceFound { .. } => "device_found",
            Self::ScanComplete => "scan_complete",
            Self::Connecting => "connecting",
            Self::ServicesMatching => "services_matching",
            Self::BootstrapInProgress => "bootstrap_in_progress",
            Self::Connected => "connected",
            Self::ConnectFailed { .. } => "connect_failed",
            Self::Disconnected => "disconnected",
            Self::BatteryChanged { .. } => "battery_changed",
            Self::SignalStrengthChanged { .. } => "signal_strength_changed",
        }
    }
}

mod reason_with_message {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ConnectFailReason;

    #[derive(Serialize)]
    struct Tagged {
        code: ConnectFailReason,
        message: &'static str,
    }

    #[derive(Deserialize)]
    struct Code {
        code: ConnectFailReason,
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(
        reason: &ConnectFailReason,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Tagged {
            code: *reason,
            message: reason.message(),
        }
        .serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ConnectFailReason, D::Error> {
        Code::deserialize(deserializer).map(|c| c.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_connect_failed_with_reason() {
        let event = SessionEvent::ConnectFailed {
            reason: ConnectFailReason::ProfileMismatch,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "connect_failed",
                "reason": {
                    "code": "profile_mismatch",
                    "message": "Connect Error: Device is not a bristlebot."
                }
            })
        );
    }

    #[test]
    fn should_read_back_connect_failed_reason() {
        let event = SessionEvent::ConnectFailed {
            reason: ConnectFailReason::BootstrapFailed,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn should_serialize_device_found_with_address_string() {
        let event = SessionEvent::DeviceFound {
            name: Some("bristle".to_string()),
            address: "AA:BB:CC:DD:EE:FF".parse().unwrap(),
            rssi: Some(-60),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["address"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(json["rssi"], -60);
    }

    #[test]
    fn should_provide_human_readable_reason() {
        assert_eq!(
            ConnectFailReason::LinkFailure.to_string(),
            "Connect Error: Could not connect to device."
        );
    }

    #[test]
    fn should_name_event_kinds() {
        assert_eq!(SessionEvent::Connected.kind(), "connected");
        assert_eq!(
            SessionEvent::BatteryChanged { percent: 50 }.kind(),
            "battery_changed"
        );
    }
}
