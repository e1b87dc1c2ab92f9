//! BLE adapter error types.

use bristlebot_domain::error::{BotError, InitializationError, LinkError, OperationError};

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// A btleplug call failed.
    #[error("BLE operation failed")]
    Btle(#[from] btleplug::Error),

    /// The robot was not seen by the adapter.
    #[error("peripheral {address} not found")]
    PeripheralNotFound {
        /// Address that was looked up.
        address: String,
    },

    /// The connected peripheral lacks a characteristic.
    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound {
        /// UUID of the missing characteristic.
        uuid: uuid::Uuid,
    },

    /// No link is open.
    #[error("not connected")]
    NotConnected,
}

impl BleError {
    /// Flatten into the per-operation error carried by transport events.
    #[must_use]
    pub fn into_operation(self) -> OperationError {
        match self {
            Self::Btle(err) => OperationError::Transport(err.to_string()),
            other => OperationError::Transport(other.to_string()),
        }
    }
}

impl From<BleError> for BotError {
    fn from(err: BleError) -> Self {
        match err {
            BleError::NotAvailable => InitializationError::AdapterUnavailable.into(),
            BleError::PeripheralNotFound { .. } => LinkError::ConnectFailed.into(),
            other => other.into_operation().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_btle_error() {
        let err = BleError::Btle(btleplug::Error::DeviceNotFound);
        assert_eq!(err.to_string(), "BLE operation failed");
    }

    #[test]
    fn should_convert_not_available_to_initialization_error() {
        let err: BotError = BleError::NotAvailable.into();
        assert!(matches!(
            err,
            BotError::Initialization(InitializationError::AdapterUnavailable)
        ));
    }

    #[test]
    fn should_convert_missing_peripheral_to_link_error() {
        let err: BotError = BleError::PeripheralNotFound {
            address: "AA:BB:CC:DD:EE:FF".to_owned(),
        }
        .into();
        assert!(matches!(err, BotError::Link(LinkError::ConnectFailed)));
    }

    #[test]
    fn should_flatten_btle_error_into_transport_failure() {
        let err = BleError::Btle(btleplug::Error::NotConnected).into_operation();
        assert!(matches!(err, OperationError::Transport(_)));
    }

    #[test]
    fn should_keep_detail_for_not_connected() {
        assert_eq!(
            BleError::NotConnected.into_operation(),
            OperationError::Transport("not connected".to_owned())
        );
    }
}
