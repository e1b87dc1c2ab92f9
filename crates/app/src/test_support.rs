//! In-memory port implementations for unit tests.

use std::sync::{Arc, Mutex};

use bristlebot_domain::address::DeviceAddress;
use bristlebot_domain::event::SessionEvent;
use bristlebot_domain::profile::{
    CharacteristicHandle, CharacteristicRole, DEVICE_PROFILE, DiscoveredService,
};

use crate::ports::{EventSink, Transport};

/// A transport primitive as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartScan,
    StopScan,
    Connect(DeviceAddress),
    Disconnect,
    DiscoverServices,
    Read(CharacteristicRole),
    Write(CharacteristicRole, Vec<u8>),
    SetNotify(CharacteristicRole, bool),
    ReadSignalStrength,
}

/// Records every call; never completes anything on its own.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn role(handle: CharacteristicHandle) -> CharacteristicRole {
        DEVICE_PROFILE.role_for(handle.characteristic).unwrap()
    }
}

impl Transport for RecordingTransport {
    fn start_scan(&self) {
        self.record(Call::StartScan);
    }

    fn stop_scan(&self) {
        self.record(Call::StopScan);
    }

    fn connect(&self, address: &DeviceAddress) {
        self.record(Call::Connect(address.clone()));
    }

    fn disconnect(&self) {
        self.record(Call::Disconnect);
    }

    fn discover_services(&self) {
        self.record(Call::DiscoverServices);
    }

    fn read_characteristic(&self, handle: CharacteristicHandle) {
        self.record(Call::Read(Self::role(handle)));
    }

    fn write_characteristic(&self, handle: CharacteristicHandle, payload: &[u8]) {
        self.record(Call::Write(Self::role(handle), payload.to_vec()));
    }

    fn set_notify(&self, handle: CharacteristicHandle, enabled: bool) {
        self.record(Call::SetNotify(Self::role(handle), enabled));
    }

    fn read_signal_strength(&self) {
        self.record(Call::ReadSignalStrength);
    }
}

/// Collects emitted events in order.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn address() -> DeviceAddress {
    "AA:BB:CC:DD:EE:01".parse().unwrap()
}

/// The attribute table a genuine robot reports.
pub fn profile_services() -> Vec<DiscoveredService> {
    DEVICE_PROFILE
        .services()
        .iter()
        .map(|s| DiscoveredService::new(s.uuid, s.characteristics.iter().map(|c| c.uuid).collect()))
        .collect()
}

pub fn handle(role: CharacteristicRole) -> CharacteristicHandle {
    let (_, service) = DEVICE_PROFILE.service_for(role).unwrap();
    let characteristic = service
        .characteristics
        .iter()
        .find(|c| c.role == role)
        .unwrap();
    CharacteristicHandle {
        service: service.uuid,
        characteristic: characteristic.uuid,
    }
}
