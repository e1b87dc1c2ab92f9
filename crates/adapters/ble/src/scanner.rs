//! Central-event listener: turns adapter events into scan results and
//! unsolicited link losses.

use std::pin::Pin;

use btleplug::api::{BDAddr, Central, CentralEvent, Peripheral as _, PeripheralProperties};
use btleplug::platform::PeripheralId;
use tokio_stream::{Stream, StreamExt as _};

use bristlebot_app::ports::TransportEvent;
use bristlebot_domain::address::DeviceAddress;

use crate::transport::BtleplugTransport;

/// Build a scan result from advertised properties.
///
/// Returns `None` for a zeroed address (macOS hides real addresses) or one
/// that does not parse.
pub(crate) fn device_found(properties: &PeripheralProperties) -> Option<TransportEvent> {
    if properties.address == BDAddr::default() {
        return None;
    }
    let address: DeviceAddress = properties.address.to_string().parse().ok()?;
    Some(TransportEvent::DeviceFound {
        name: properties.local_name.clone(),
        address,
        rssi: properties.rssi,
    })
}

/// Forward adapter events until the stream ends.
pub(crate) async fn forward_central_events(
    transport: BtleplugTransport,
    mut events: Pin<Box<dyn Stream<Item = CentralEvent> + Send>>,
) {
    while let Some(event) = events.next().await {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                if transport.is_scanning() {
                    report(&transport, &id).await;
                }
            }
            CentralEvent::DeviceDisconnected(id) => {
                if transport.release_if_current(&id).await {
                    tracing::warn!(?id, "peripheral dropped the link");
                    transport.send(TransportEvent::LinkLost);
                }
            }
            _ => {}
        }
    }
    tracing::debug!("central event stream ended");
}

async fn report(transport: &BtleplugTransport, id: &PeripheralId) {
    let Ok(peripheral) = transport.central().peripheral(id).await else {
        return;
    };
    match peripheral.properties().await {
        Ok(Some(properties)) => {
            if let Some(event) = device_found(&properties) {
                tracing::trace!(name = ?properties.local_name, rssi = ?properties.rssi, "device detected");
                transport.send(event);
            }
        }
        Ok(None) => {}
        Err(err) => tracing::debug!(%err, "could not read peripheral properties"),
    }
}
