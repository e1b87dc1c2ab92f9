//! btleplug-backed [`Transport`].
//!
//! Every primitive spawns a short task on the current runtime and returns at
//! once; the outcome is sent as a [`TransportEvent`] on the channel returned
//! by [`BtleplugTransport::open`]. The connected peripheral lives in a shared
//! slot so that completions of one link can never leak into the next.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use btleplug::api::{BDAddr, Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

use bristlebot_app::ports::{Transport, TransportEvent};
use bristlebot_domain::address::DeviceAddress;
use bristlebot_domain::error::{LinkError, OperationError};
use bristlebot_domain::profile::{CharacteristicHandle, DiscoveredService};

use crate::config::BleConfig;
use crate::discovery::order_services;
use crate::error::BleError;
use crate::scanner;

/// How often the peripheral cache is checked while looking for the robot.
const LOOKUP_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Default)]
struct LinkSlot {
    peripheral: Option<Peripheral>,
    notifications: Option<JoinHandle<()>>,
    /// Last signal strength handed to the engine for this link.
    last_rssi: Option<i16>,
}

/// btleplug only exposes the RSSI of the last advertisement, which most
/// stacks stop refreshing once connected. A value equal to the previous
/// reading is treated as stale rather than reported again.
fn fresh_reading(last: &mut Option<i16>, current: Option<i16>) -> Result<i16, OperationError> {
    match current {
        Some(dbm) if *last != Some(dbm) => {
            *last = Some(dbm);
            Ok(dbm)
        }
        _ => Err(OperationError::SignalStrengthUnavailable),
    }
}

/// Transport driving one robot through a host BLE adapter.
#[derive(Clone)]
pub struct BtleplugTransport {
    central: Adapter,
    config: BleConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    link: Arc<Mutex<LinkSlot>>,
    scanning: Arc<AtomicBool>,
    /// Bumped on every disconnect; a connect attempt started under an older
    /// generation is abandoned.
    generation: Arc<AtomicU64>,
}

impl BtleplugTransport {
    /// Acquire the configured host adapter and start listening for its
    /// events.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NotAvailable`] when the adapter index does not
    /// exist, or [`BleError::Btle`] when the platform manager fails.
    pub async fn open(
        config: BleConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), BleError> {
        let manager = Manager::new().await?;
        let central = manager
            .adapters()
            .await?
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(BleError::NotAvailable)?;
        let central_events = central.events().await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            central,
            config,
            events: sender,
            link: Arc::default(),
            scanning: Arc::default(),
            generation: Arc::default(),
        };

        tokio::spawn(scanner::forward_central_events(
            transport.clone(),
            central_events,
        ));
        tracing::info!(adapter_index = transport.config.adapter_index, "BLE transport ready");

        Ok((transport, receiver))
    }

    pub(crate) fn central(&self) -> &Adapter {
        &self.central
    }

    pub(crate) fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Relaxed)
    }

    pub(crate) fn send(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("transport event receiver dropped");
        }
    }

    /// Forget the link if `id` is the connected peripheral. Returns whether
    /// it was.
    pub(crate) async fn release_if_current(&self, id: &PeripheralId) -> bool {
        let mut slot = self.link.lock().await;
        let current = slot.peripheral.as_ref().is_some_and(|p| &p.id() == id);
        if current {
            slot.peripheral = None;
            if let Some(task) = slot.notifications.take() {
                task.abort();
            }
        }
        current
    }

    async fn peripheral(&self) -> Result<Peripheral, BleError> {
        self.link
            .lock()
            .await
            .peripheral
            .clone()
            .ok_or(BleError::NotConnected)
    }

    async fn characteristic(
        &self,
        handle: CharacteristicHandle,
    ) -> Result<(Peripheral, Characteristic), BleError> {
        let peripheral = self.peripheral().await?;
        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == handle.service && c.uuid == handle.characteristic)
            .ok_or(BleError::CharacteristicNotFound {
                uuid: handle.characteristic,
            })?;
        Ok((peripheral, characteristic))
    }

    async fn lookup(&self, target: BDAddr) -> Result<Option<Peripheral>, BleError> {
        for peripheral in self.central.peripherals().await? {
            if peripheral.address() == target {
                return Ok(Some(peripheral));
            }
            if let Ok(Some(props)) = peripheral.properties().await {
                if props.address == target {
                    return Ok(Some(peripheral));
                }
            }
        }
        Ok(None)
    }

    /// Find the robot, scanning for it if the adapter has not seen it yet.
    async fn find_peripheral(&self, target: BDAddr) -> Result<Peripheral, BleError> {
        if let Some(peripheral) = self.lookup(target).await? {
            return Ok(peripheral);
        }

        tracing::debug!(%target, "peripheral not cached, scanning for it");
        self.central.start_scan(ScanFilter::default()).await?;
        let found = loop {
            if let Some(peripheral) = self.lookup(target).await? {
                break peripheral;
            }
            tokio::time::sleep(LOOKUP_INTERVAL).await;
        };
        if !self.is_scanning() {
            self.central.stop_scan().await?;
        }
        Ok(found)
    }

    async fn open_link(&self, target: BDAddr, generation: u64) -> Result<bool, BleError> {
        let peripheral = self.find_peripheral(target).await?;
        peripheral.connect().await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(%target, "connect superseded by disconnect, dropping link");
            peripheral.disconnect().await?;
            return Ok(false);
        }

        let mut slot = self.link.lock().await;
        slot.peripheral = Some(peripheral);
        slot.last_rssi = None;
        Ok(true)
    }

    async fn discover(&self) -> Result<Vec<DiscoveredService>, BleError> {
        let peripheral = self.peripheral().await?;
        peripheral.discover_services().await?;
        let services = peripheral.services().into_iter().map(|service| {
            let characteristics = service.characteristics.iter().map(|c| c.uuid).collect();
            (service.uuid, characteristics)
        });
        Ok(order_services(services))
    }

    async fn read(&self, handle: CharacteristicHandle) -> Result<Vec<u8>, BleError> {
        let (peripheral, characteristic) = self.characteristic(handle).await?;
        Ok(peripheral.read(&characteristic).await?)
    }

    async fn write(&self, handle: CharacteristicHandle, payload: &[u8]) -> Result<(), BleError> {
        let (peripheral, characteristic) = self.characteristic(handle).await?;
        peripheral
            .write(&characteristic, payload, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn notify(&self, handle: CharacteristicHandle, enabled: bool) -> Result<(), BleError> {
        let (peripheral, characteristic) = self.characteristic(handle).await?;
        if !enabled {
            peripheral.unsubscribe(&characteristic).await?;
            return Ok(());
        }

        peripheral.subscribe(&characteristic).await?;
        let mut slot = self.link.lock().await;
        if slot.notifications.is_none() {
            let mut stream = peripheral.notifications().await?;
            let this = self.clone();
            slot.notifications = Some(tokio::spawn(async move {
                while let Some(notification) = stream.next().await {
                    this.send(TransportEvent::CharacteristicChanged {
                        characteristic: notification.uuid,
                        value: notification.value,
                    });
                }
                tracing::debug!("notification stream ended");
            }));
        }
        Ok(())
    }

    async fn signal_strength(&self) -> Result<i16, OperationError> {
        let peripheral = self.peripheral().await.map_err(BleError::into_operation)?;
        let properties = peripheral
            .properties()
            .await
            .map_err(|err| BleError::from(err).into_operation())?;
        let mut slot = self.link.lock().await;
        fresh_reading(&mut slot.last_rssi, properties.and_then(|p| p.rssi))
    }
}

impl Transport for BtleplugTransport {
    fn start_scan(&self) {
        self.scanning.store(true, Ordering::Relaxed);
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(err) = this.central.start_scan(ScanFilter::default()).await {
                tracing::warn!(%err, "could not start scan");
                this.scanning.store(false, Ordering::Relaxed);
                this.send(TransportEvent::RadioUnavailable);
            }
        });
    }

    fn stop_scan(&self) {
        self.scanning.store(false, Ordering::Relaxed);
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(err) = this.central.stop_scan().await {
                tracing::debug!(%err, "could not stop scan");
            }
        });
    }

    fn connect(&self, address: &DeviceAddress) {
        let this = self.clone();
        let target = BDAddr::from(address.octets());
        let generation = self.generation.load(Ordering::SeqCst);
        tokio::spawn(async move {
            let timeout = this.config.connect_timeout();
            let event = match tokio::time::timeout(timeout, this.open_link(target, generation)).await {
                Ok(Ok(true)) => TransportEvent::LinkEstablished,
                Ok(Ok(false)) => return,
                Ok(Err(err)) => {
                    tracing::warn!(%target, %err, "connect failed");
                    TransportEvent::LinkFailed(LinkError::ConnectFailed)
                }
                Err(_) => {
                    tracing::warn!(%target, ?timeout, "connect timed out");
                    if !this.is_scanning() {
                        let _ = this.central.stop_scan().await;
                    }
                    TransportEvent::LinkFailed(LinkError::ConnectTimedOut)
                }
            };
            this.send(event);
        });
    }

    fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let this = self.clone();
        tokio::spawn(async move {
            let peripheral = {
                let mut slot = this.link.lock().await;
                if let Some(task) = slot.notifications.take() {
                    task.abort();
                }
                slot.peripheral.take()
            };
            if let Some(peripheral) = peripheral {
                if let Err(err) = peripheral.disconnect().await {
                    tracing::warn!(%err, "disconnect failed");
                }
            }
            this.send(TransportEvent::LinkLost);
        });
    }

    fn discover_services(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let result = this.discover().await.map_err(BleError::into_operation);
            this.send(TransportEvent::ServicesDiscovered(result));
        });
    }

    fn read_characteristic(&self, handle: CharacteristicHandle) {
        let this = self.clone();
        tokio::spawn(async move {
            let result = this.read(handle).await.map_err(BleError::into_operation);
            this.send(TransportEvent::ReadCompleted { handle, result });
        });
    }

    fn write_characteristic(&self, handle: CharacteristicHandle, payload: &[u8]) {
        let this = self.clone();
        let payload = payload.to_vec();
        tokio::spawn(async move {
            let result = this
                .write(handle, &payload)
                .await
                .map_err(BleError::into_operation);
            this.send(TransportEvent::WriteCompleted { handle, result });
        });
    }

    fn set_notify(&self, handle: CharacteristicHandle, enabled: bool) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(err) = this.notify(handle, enabled).await {
                tracing::warn!(%handle, enabled, %err, "could not change notification state");
            }
        });
    }

    /// Reports the last advertised RSSI, or `SignalStrengthUnavailable`
    /// when it has not moved since the previous reading.
    fn read_signal_strength(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let result = this.signal_strength().await;
            this.send(TransportEvent::SignalStrength(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_new_signal_strength() {
        let mut last = None;
        assert_eq!(fresh_reading(&mut last, Some(-60)), Ok(-60));
        assert_eq!(fresh_reading(&mut last, Some(-72)), Ok(-72));
        assert_eq!(last, Some(-72));
    }

    #[test]
    fn should_treat_repeated_signal_strength_as_stale() {
        let mut last = None;
        fresh_reading(&mut last, Some(-60)).unwrap();
        assert_eq!(
            fresh_reading(&mut last, Some(-60)),
            Err(OperationError::SignalStrengthUnavailable)
        );
        assert_eq!(
            fresh_reading(&mut last, None),
            Err(OperationError::SignalStrengthUnavailable)
        );
        assert_eq!(last, Some(-60));
    }
}
