//! Transport port: the attribute-protocol primitives of the radio stack.
//!
//! Every method is **fire-and-forget**: it starts the operation and returns
//! immediately. The outcome is delivered later as a [`TransportEvent`] on the
//! channel the adapter was built with, and fed back into the
//! [`Controller`](crate::controller::Controller) on its dispatch context.
//!
//! The transport allows one outstanding characteristic read or write per
//! link. Callers are responsible for honouring that; adapters may assume it.

use bristlebot_domain::address::DeviceAddress;
use bristlebot_domain::error::{LinkError, OperationError};
use bristlebot_domain::profile::{CharacteristicHandle, DiscoveredService};

/// Asynchronous radio primitives.
pub trait Transport {
    /// Begin reporting nearby devices as [`TransportEvent::DeviceFound`].
    fn start_scan(&self);

    /// Stop an active scan. A no-op when not scanning.
    fn stop_scan(&self);

    /// Open a link to `address`. Completes with
    /// [`TransportEvent::LinkEstablished`] or [`TransportEvent::LinkFailed`].
    fn connect(&self, address: &DeviceAddress);

    /// Close the current link. Completes with [`TransportEvent::LinkLost`].
    fn disconnect(&self);

    /// Enumerate the peer's services. Completes with
    /// [`TransportEvent::ServicesDiscovered`].
    fn discover_services(&self);

    /// Completes with [`TransportEvent::ReadCompleted`].
    fn read_characteristic(&self, handle: CharacteristicHandle);

    /// Write with response. Completes with [`TransportEvent::WriteCompleted`].
    fn write_characteristic(&self, handle: CharacteristicHandle, payload: &[u8]);

    /// Enable or disable change notifications for `handle`. Subsequent
    /// changes arrive as [`TransportEvent::CharacteristicChanged`].
    fn set_notify(&self, handle: CharacteristicHandle, enabled: bool);

    /// Completes with [`TransportEvent::SignalStrength`].
    fn read_signal_strength(&self);
}

/// Completion and unsolicited events raised by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A scan result.
    DeviceFound {
        name: Option<String>,
        address: DeviceAddress,
        rssi: Option<i16>,
    },
    /// The radio is off or the adapter refused to scan.
    RadioUnavailable,
    /// The requested link is up.
    LinkEstablished,
    /// The requested link could not be established.
    LinkFailed(LinkError),
    /// The link is gone, either solicited or not.
    LinkLost,
    /// Result of [`Transport::discover_services`], in attribute-table order.
    ServicesDiscovered(Result<Vec<DiscoveredService>, OperationError>),
    /// Result of [`Transport::read_characteristic`].
    ReadCompleted {
        handle: CharacteristicHandle,
        result: Result<Vec<u8>, OperationError>,
    },
    /// Result of [`Transport::write_characteristic`].
    WriteCompleted {
        handle: CharacteristicHandle,
        result: Result<(), OperationError>,
    },
    /// A subscribed characteristic changed on the peer.
    CharacteristicChanged {
        characteristic: uuid::Uuid,
        value: Vec<u8>,
    },
    /// Result of [`Transport::read_signal_strength`], in dBm.
    SignalStrength(Result<i16, OperationError>),
}
