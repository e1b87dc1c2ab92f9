//! Connection session: the per-link state machine.
//!
//! A [`ConnectionSession`] owns everything that lives and dies with one
//! link: the resolved characteristic handles, the bootstrap and command
//! queues, the telemetry state and the cached device values. It never blocks
//! and never spawns; every transport primitive is fire-and-forget and its
//! outcome comes back through [`handle_transport_event`].
//!
//! Both queues feed a single in-flight slot. Bootstrap reads exist only while
//! `Syncing` and command writes only while `Ready`, so reads always drain
//! before the first write is issued.
//!
//! [`handle_transport_event`]: ConnectionSession::handle_transport_event

use std::collections::HashMap;

use serde::Serialize;

use bristlebot_domain::address::DeviceAddress;
use bristlebot_domain::error::OperationError;
use bristlebot_domain::event::{ConnectFailReason, SessionEvent};
use bristlebot_domain::id::SessionId;
use bristlebot_domain::motor::MotorSide;
use bristlebot_domain::operation::{OperationKind, PendingOperation};
use bristlebot_domain::profile::{
    CHAR_BATTERY_LEVEL, CharacteristicHandle, CharacteristicRole, DiscoveredService,
};
use bristlebot_domain::settings::{DeviceName, Rgb};
use bristlebot_domain::state::ConnectionState;
use bristlebot_domain::validator::ProfileValidator;

use crate::error::CommandError;
use crate::ports::{EventSink, Transport, TransportEvent};
use crate::sync_queue::{BootstrapValue, CharacteristicSyncQueue, ReadRetry, decode};
use crate::telemetry::{TelemetryPoller, decode_battery};
use crate::write_queue::{CommandWriteQueue, WriteDisposition};

/// Read-only view of a session for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub address: Option<DeviceAddress>,
    pub name: Option<String>,
    pub color: Rgb,
    pub battery: Option<u8>,
    pub rssi: Option<i16>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            address: None,
            name: None,
            color: Rgb::WHITE,
            battery: None,
            rssi: None,
        }
    }
}

/// Name and colour as known for one side of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    name: Option<DeviceName>,
    color: Rgb,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: None,
            color: Rgb::WHITE,
        }
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    op: PendingOperation,
    handle: CharacteristicHandle,
}

/// One connection to one robot.
pub struct ConnectionSession<T, S> {
    id: SessionId,
    address: DeviceAddress,
    state: ConnectionState,
    transport: T,
    sink: S,
    validator: ProfileValidator,
    retry_limit: Option<u32>,
    handles: HashMap<CharacteristicRole, CharacteristicHandle>,
    in_flight: Option<InFlight>,
    sync_queue: Option<CharacteristicSyncQueue>,
    write_queue: Option<CommandWriteQueue>,
    telemetry: TelemetryPoller,
    /// What the robot acknowledged, via bootstrap reads or successful writes.
    confirmed: Settings,
    /// What the user asked for last.
    requested: Settings,
    battery: Option<u8>,
    rssi: Option<i16>,
}

impl<T, S> ConnectionSession<T, S>
where
    T: Transport,
    S: EventSink,
{
    /// Create an idle session for `address`. Nothing is sent until
    /// [`connect`](Self::connect).
    pub fn new(address: DeviceAddress, transport: T, sink: S, retry_limit: Option<u32>) -> Self {
        Self {
            id: SessionId::new(),
            address,
            state: ConnectionState::Disconnected,
            transport,
            sink,
            validator: ProfileValidator::default(),
            retry_limit,
            handles: HashMap::new(),
            in_flight: None,
            sync_queue: None,
            write_queue: None,
            telemetry: TelemetryPoller::default(),
            confirmed: Settings::default(),
            requested: Settings::default(),
            battery: None,
            rssi: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            address: Some(self.address.clone()),
            name: self.confirmed.name.as_ref().map(|n| n.as_str().to_owned()),
            color: self.confirmed.color,
            battery: self.battery,
            rssi: self.rssi,
        }
    }

    /// Whether the motor flush or signal-strength timer is armed.
    #[must_use]
    pub fn timers_running(&self) -> bool {
        self.telemetry.is_running()
            || self
                .write_queue
                .as_ref()
                .is_some_and(CommandWriteQueue::is_flush_running)
    }

    /// Whether both queues and the in-flight slot are empty.
    #[must_use]
    pub fn queues_empty(&self) -> bool {
        self.sync_queue.is_none() && self.write_queue.is_none() && self.in_flight.is_none()
    }

    /// Open the link.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidState`] unless `Disconnected`.
    #[tracing::instrument(skip(self), fields(session = %self.id, address = %self.address))]
    pub fn connect(&mut self) -> Result<(), CommandError> {
        self.require(ConnectionState::Disconnected, "connect")?;
        self.transport.connect(&self.address);
        self.set_state(ConnectionState::Connecting);
        self.sink.emit(SessionEvent::Connecting);
        Ok(())
    }

    /// Close the link. Completes with `Disconnected` once the transport
    /// confirms the link is gone.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidState`] when already `Disconnected`.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub fn disconnect(&mut self) -> Result<(), CommandError> {
        match self.state {
            ConnectionState::Disconnected => Err(CommandError::InvalidState {
                command: "disconnect",
                state: self.state,
            }),
            ConnectionState::Disconnecting => Ok(()),
            _ => {
                self.cancel_runtime(true);
                self.transport.disconnect();
                self.set_state(ConnectionState::Disconnecting);
                Ok(())
            }
        }
    }

    /// Drop the link without waiting for confirmation. Used when the session
    /// is superseded or the controller shuts down.
    pub fn teardown(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.cancel_runtime(true);
        self.transport.disconnect();
        self.set_state(ConnectionState::Disconnected);
        self.sink.emit(SessionEvent::Disconnected);
    }

    /// Record a motor request for the next flush.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidState`] unless `Ready`, or
    /// [`CommandError::Validation`] for a percentage outside `0..=100`.
    pub fn set_motor(&mut self, side: MotorSide, percent: i32) -> Result<(), CommandError> {
        let command = match side {
            MotorSide::Left => "set_left_motor",
            MotorSide::Right => "set_right_motor",
        };
        let queue = self.commands(command)?;
        let accepted = queue.request_motor(side, percent)?;
        tracing::trace!(%side, percent = accepted.get(), "motor request recorded");
        Ok(())
    }

    /// Rename the robot. A name the robot already has, with no other name
    /// pending, writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidState`] unless `Ready`, or
    /// [`CommandError::Validation`] for an empty or oversized name.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub fn set_name(&mut self, name: &str) -> Result<(), CommandError> {
        self.commands("set_name")?;
        let name = DeviceName::new(name)?;
        if self.confirmed.name.as_ref() == Some(&name) && self.requested.name == self.confirmed.name {
            tracing::debug!("name unchanged, skipping write");
            return Ok(());
        }
        self.commands("set_name")?.push_name(&name);
        self.requested.name = Some(name);
        self.pump();
        Ok(())
    }

    /// Change the LED colour.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidState`] unless `Ready`.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub fn set_color(&mut self, color: Rgb) -> Result<(), CommandError> {
        self.commands("set_color")?.push_color(color);
        self.requested.color = color;
        self.pump();
        Ok(())
    }

    /// Write the requested name and colour, commit them on the peer, then
    /// disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidState`] unless `Ready`.
    #[tracing::instrument(skip(self), fields(session = %self.id))]
    pub fn save_and_disconnect(&mut self) -> Result<(), CommandError> {
        let Settings { name, color } = self.requested.clone();
        self.commands("save_and_disconnect")?
            .push_save(name.as_ref(), color);
        self.pump();
        Ok(())
    }

    /// Motor flush timer tick.
    pub fn on_motor_flush_tick(&mut self) {
        if self.state != ConnectionState::Ready {
            return;
        }
        let busy = self.in_flight.is_some();
        let queued = self.write_queue.as_mut().map_or(0, |q| q.flush(busy));
        if queued > 0 {
            self.pump();
        }
    }

    /// Signal-strength poll timer tick.
    pub fn on_rssi_tick(&mut self) {
        if self.state == ConnectionState::Ready && self.telemetry.begin_poll() {
            self.transport.read_signal_strength();
        }
    }

    /// Advance the state machine with a transport completion or
    /// unsolicited event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::LinkEstablished => self.on_link_established(),
            TransportEvent::LinkFailed(err) => {
                tracing::warn!(session = %self.id, %err, "link failed");
                self.on_link_down();
            }
            TransportEvent::LinkLost => self.on_link_down(),
            TransportEvent::ServicesDiscovered(Ok(services)) => self.on_services(&services),
            TransportEvent::ServicesDiscovered(Err(err)) => {
                if self.state == ConnectionState::ServiceDiscovery {
                    tracing::warn!(session = %self.id, %err, "service discovery failed");
                    self.fail_connect(ConnectFailReason::ServicesNotFound);
                }
            }
            TransportEvent::ReadCompleted { handle, result } => self.on_read(handle, result),
            TransportEvent::WriteCompleted { handle, result } => {
                self.on_write(handle, result.is_ok());
            }
            TransportEvent::CharacteristicChanged {
                characteristic,
                value,
            } => self.on_changed(characteristic, &value),
            TransportEvent::SignalStrength(result) => {
                if self.state != ConnectionState::Ready {
                    return;
                }
                if let Some(dbm) = self.telemetry.finish_poll(result) {
                    self.rssi = Some(dbm);
                    self.sink.emit(SessionEvent::SignalStrengthChanged { dbm });
                }
            }
            TransportEvent::DeviceFound { .. } | TransportEvent::RadioUnavailable => {}
        }
    }

    fn on_link_established(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(session = %self.id, state = %self.state, "ignoring stale link-established");
            return;
        }
        self.set_state(ConnectionState::ServiceDiscovery);
        self.sink.emit(SessionEvent::ServicesMatching);
        self.transport.discover_services();
    }

    fn on_link_down(&mut self) {
        match self.state {
            ConnectionState::Disconnected => {}
            ConnectionState::Connecting => {
                self.set_state(ConnectionState::Disconnected);
                self.sink.emit(SessionEvent::ConnectFailed {
                    reason: ConnectFailReason::LinkFailure,
                });
            }
            state => {
                if state != ConnectionState::Disconnecting {
                    tracing::warn!(session = %self.id, %state, "link lost");
                }
                self.cancel_runtime(false);
                self.set_state(ConnectionState::Disconnected);
                self.sink.emit(SessionEvent::Disconnected);
            }
        }
    }

    fn on_services(&mut self, services: &[DiscoveredService]) {
        if self.state != ConnectionState::ServiceDiscovery {
            tracing::debug!(session = %self.id, state = %self.state, "ignoring stale discovery result");
            return;
        }
        match self.validator.resolve(services) {
            Ok(handles) => {
                self.handles = handles;
                self.sync_queue = Some(CharacteristicSyncQueue::new(self.retry_limit));
                self.set_state(ConnectionState::Syncing);
                self.sink.emit(SessionEvent::BootstrapInProgress);
                self.pump();
            }
            Err(err) => {
                tracing::warn!(session = %self.id, %err, "device profile mismatch");
                self.fail_connect(ConnectFailReason::ProfileMismatch);
            }
        }
    }

    fn on_read(
        &mut self,
        handle: CharacteristicHandle,
        result: Result<Vec<u8>, OperationError>,
    ) {
        if self.state != ConnectionState::Syncing {
            tracing::debug!(session = %self.id, %handle, "ignoring read completion outside bootstrap");
            return;
        }
        let Some(op) = self.take_in_flight(handle, false) else {
            return;
        };

        let decoded = result.and_then(|bytes| decode(op.role, &bytes));
        match decoded {
            Ok(value) => {
                self.apply(value);
                self.pump();
            }
            Err(err) => {
                tracing::debug!(session = %self.id, role = %op.role, attempt = op.attempts, %err, "bootstrap read failed");
                let retry = self
                    .sync_queue
                    .as_ref()
                    .map_or(ReadRetry::GiveUp, |q| q.on_failure(op));
                match retry {
                    ReadRetry::Retry(op) => self.issue(op),
                    ReadRetry::GiveUp => {
                        tracing::error!(session = %self.id, "bootstrap retry budget exhausted");
                        self.fail_connect(ConnectFailReason::BootstrapFailed);
                    }
                }
            }
        }
    }

    fn on_write(&mut self, handle: CharacteristicHandle, succeeded: bool) {
        if self.state != ConnectionState::Ready {
            tracing::debug!(session = %self.id, %handle, "ignoring write completion outside ready");
            return;
        }
        let Some(op) = self.take_in_flight(handle, true) else {
            return;
        };
        if succeeded {
            self.confirm(&op);
        }
        let Some(queue) = self.write_queue.as_mut() else {
            return;
        };

        match queue.complete(op, succeeded) {
            WriteDisposition::Retry(op) => self.issue(op),
            WriteDisposition::Continue => self.pump(),
            WriteDisposition::SaveCommitted => {
                tracing::info!(session = %self.id, "settings saved, disconnecting");
                let _ = self.disconnect();
            }
        }
    }

    fn on_changed(&mut self, characteristic: uuid::Uuid, value: &[u8]) {
        if characteristic != CHAR_BATTERY_LEVEL || !self.telemetry.battery_subscribed() {
            tracing::debug!(session = %self.id, %characteristic, "ignoring notification");
            return;
        }
        match decode_battery(value) {
            Ok(percent) => {
                self.battery = Some(percent);
                self.sink.emit(SessionEvent::BatteryChanged { percent });
            }
            Err(err) => tracing::warn!(session = %self.id, %err, "bad battery notification"),
        }
    }

    fn apply(&mut self, value: BootstrapValue) {
        match value {
            BootstrapValue::Name(name) => self.confirmed.name = Some(name),
            BootstrapValue::Battery(percent) => {
                self.battery = Some(percent);
                self.sink.emit(SessionEvent::BatteryChanged { percent });
            }
            BootstrapValue::Red(red) => self.confirmed.color.red = red,
            BootstrapValue::Green(green) => self.confirmed.color.green = green,
            BootstrapValue::Blue(blue) => self.confirmed.color.blue = blue,
        }
        self.requested = self.confirmed.clone();
    }

    /// Record a setting the robot acknowledged.
    fn confirm(&mut self, op: &PendingOperation) {
        let Some(payload) = op.payload() else {
            return;
        };
        match (op.role, payload) {
            (CharacteristicRole::DeviceName, bytes) => {
                self.confirmed.name = Some(DeviceName::from_wire(bytes));
            }
            (CharacteristicRole::LedRed, [red]) => self.confirmed.color.red = *red,
            (CharacteristicRole::LedGreen, [green]) => self.confirmed.color.green = *green,
            (CharacteristicRole::LedBlue, [blue]) => self.confirmed.color.blue = *blue,
            _ => {}
        }
    }

    /// Fill the in-flight slot from whichever queue the state owns.
    fn pump(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        match self.state {
            ConnectionState::Syncing => {
                match self.sync_queue.as_mut().and_then(CharacteristicSyncQueue::next_read) {
                    Some(op) => self.issue(op),
                    None => self.enter_ready(),
                }
            }
            ConnectionState::Ready => {
                if let Some(op) = self.write_queue.as_mut().and_then(CommandWriteQueue::next_write) {
                    self.issue(op);
                }
            }
            _ => {}
        }
    }

    fn issue(&mut self, mut op: PendingOperation) {
        let Some(handle) = self.handles.get(&op.role).copied() else {
            tracing::warn!(session = %self.id, role = %op.role, "no handle for role, dropping");
            return;
        };
        op.attempts += 1;
        match &op.kind {
            OperationKind::Read => {
                tracing::debug!(session = %self.id, role = %op.role, attempt = op.attempts, "read");
                self.transport.read_characteristic(handle);
            }
            OperationKind::Write { payload } => {
                tracing::debug!(session = %self.id, role = %op.role, attempt = op.attempts, ?payload, "write");
                self.transport.write_characteristic(handle, payload);
            }
        }
        self.in_flight = Some(InFlight { op, handle });
    }

    fn take_in_flight(&mut self, handle: CharacteristicHandle, write: bool) -> Option<PendingOperation> {
        let matches = self.in_flight.as_ref().is_some_and(|f| {
            f.handle == handle && matches!(f.op.kind, OperationKind::Write { .. }) == write
        });
        if !matches {
            tracing::debug!(session = %self.id, %handle, "completion does not match in-flight operation");
            return None;
        }
        self.in_flight.take().map(|f| f.op)
    }

    fn enter_ready(&mut self) {
        self.sync_queue = None;
        if let Some(handle) = self.handles.get(&CharacteristicRole::BatteryLevel).copied() {
            self.transport.set_notify(handle, true);
        }
        self.telemetry.start();
        self.write_queue = Some(CommandWriteQueue::new());
        self.set_state(ConnectionState::Ready);
        self.sink.emit(SessionEvent::Connected);
    }

    fn fail_connect(&mut self, reason: ConnectFailReason) {
        self.cancel_runtime(false);
        self.transport.disconnect();
        self.set_state(ConnectionState::Disconnecting);
        self.sink.emit(SessionEvent::ConnectFailed { reason });
    }

    /// Stop timers and discard queues. `link_up` tells whether the battery
    /// subscription can still be disabled on the peer.
    fn cancel_runtime(&mut self, link_up: bool) {
        let was_subscribed = self.telemetry.stop();
        if link_up && was_subscribed {
            if let Some(handle) = self.handles.get(&CharacteristicRole::BatteryLevel).copied() {
                self.transport.set_notify(handle, false);
            }
        }
        if let Some(queue) = self.write_queue.take() {
            if queue.waiting() > 0 {
                tracing::debug!(session = %self.id, dropped = queue.waiting(), "discarding queued writes");
            }
        }
        self.sync_queue = None;
        self.in_flight = None;
        self.handles.clear();
    }

    fn commands(&mut self, command: &'static str) -> Result<&mut CommandWriteQueue, CommandError> {
        let state = self.state;
        match (state, self.write_queue.as_mut()) {
            (ConnectionState::Ready, Some(queue)) => Ok(queue),
            _ => Err(CommandError::InvalidState { command, state }),
        }
    }

    fn require(&self, expected: ConnectionState, command: &'static str) -> Result<(), CommandError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CommandError::InvalidState {
                command,
                state: self.state,
            })
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        tracing::info!(session = %self.id, from = %self.state, to = %next, "state transition");
        self.state = next;
    }
}
