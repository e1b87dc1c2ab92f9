//! Single dispatch context for UI commands, transport events and timers.
//!
//! The [`Controller`] owns the live [`ConnectionSession`] (at most one) and
//! the scan window. [`Controller::run`] multiplexes every input source with
//! `tokio::select!`, so each handler runs to completion before the next one
//! starts and no state is ever shared between tasks.

use std::future;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use bristlebot_domain::address::DeviceAddress;
use bristlebot_domain::event::SessionEvent;
use bristlebot_domain::motor::MotorSide;
use bristlebot_domain::settings::Rgb;
use bristlebot_domain::state::ConnectionState;

use crate::config::SessionConfig;
use crate::error::CommandError;
use crate::ports::{EventSink, Transport, TransportEvent};
use crate::session::{ConnectionSession, SessionSnapshot};

/// Commands accepted from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan(bool),
    Connect(DeviceAddress),
    Disconnect,
    SetLeftMotor(i32),
    SetRightMotor(i32),
    SetName(String),
    SetColor(Rgb),
    SaveAndDisconnect,
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::Connect(_) => "connect",
            Self::Disconnect => "disconnect",
            Self::SetLeftMotor(_) => "set_left_motor",
            Self::SetRightMotor(_) => "set_right_motor",
            Self::SetName(_) => "set_name",
            Self::SetColor(_) => "set_color",
            Self::SaveAndDisconnect => "save_and_disconnect",
        }
    }
}

/// Owns the session and the scan state.
pub struct Controller<T, S> {
    transport: T,
    sink: S,
    config: SessionConfig,
    session: Option<ConnectionSession<T, S>>,
    scan_deadline: Option<Instant>,
}

impl<T, S> Controller<T, S>
where
    T: Transport + Clone,
    S: EventSink + Clone,
{
    pub fn new(transport: T, sink: S, config: SessionConfig) -> Self {
        Self {
            transport,
            sink,
            config,
            session: None,
            scan_deadline: None,
        }
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scan_deadline.is_some()
    }

    /// When the running scan stops by itself.
    #[must_use]
    pub fn scan_deadline(&self) -> Option<Instant> {
        self.scan_deadline
    }

    #[must_use]
    pub fn session_state(&self) -> ConnectionState {
        self.session
            .as_ref()
            .map_or(ConnectionState::Disconnected, ConnectionSession::state)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session
            .as_ref()
            .map(ConnectionSession::snapshot)
            .unwrap_or_default()
    }

    /// Apply one UI command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the command is not valid in the current
    /// state or carries an invalid argument. Nothing changes in that case.
    pub fn handle_command(&mut self, command: Command) -> Result<(), CommandError> {
        tracing::debug!(command = command.name(), "handling command");
        match command {
            Command::Scan(true) => {
                self.start_scan();
                Ok(())
            }
            Command::Scan(false) => {
                self.stop_scan();
                Ok(())
            }
            Command::Connect(address) => self.connect(address),
            Command::Disconnect => self.session_mut("disconnect")?.disconnect(),
            Command::SetLeftMotor(percent) => self
                .session_mut("set_left_motor")?
                .set_motor(MotorSide::Left, percent),
            Command::SetRightMotor(percent) => self
                .session_mut("set_right_motor")?
                .set_motor(MotorSide::Right, percent),
            Command::SetName(name) => self.session_mut("set_name")?.set_name(&name),
            Command::SetColor(color) => self.session_mut("set_color")?.set_color(color),
            Command::SaveAndDisconnect => self
                .session_mut("save_and_disconnect")?
                .save_and_disconnect(),
        }
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::DeviceFound {
                name,
                address,
                rssi,
            } => {
                if self.is_scanning() {
                    self.sink
                        .emit(SessionEvent::DeviceFound { name, address, rssi });
                }
            }
            TransportEvent::RadioUnavailable => {
                tracing::warn!("radio unavailable");
                self.scan_deadline = None;
                self.sink.emit(SessionEvent::BluetoothDisabled);
            }
            other => match self.session.as_mut() {
                Some(session) => session.handle_transport_event(other),
                None => tracing::debug!(event = ?other, "no session, dropping transport event"),
            },
        }
    }

    pub fn on_motor_flush_tick(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.on_motor_flush_tick();
        }
    }

    pub fn on_rssi_tick(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.on_rssi_tick();
        }
    }

    /// The scan window closed.
    pub fn on_scan_timeout(&mut self) {
        if self.is_scanning() {
            tracing::info!("scan window elapsed");
            self.stop_scan();
        }
    }

    /// Tear down the session, if any, and stop scanning.
    pub fn shutdown(&mut self) {
        self.stop_scan();
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }

    fn start_scan(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.state().is_active() {
                tracing::info!(address = %session.address(), "scan requested, closing live session");
                let _ = session.disconnect();
            }
        }
        if !self.is_scanning() {
            self.transport.start_scan();
        }
        self.scan_deadline = Some(Instant::now() + self.config.scan_duration());
    }

    fn stop_scan(&mut self) {
        if self.scan_deadline.take().is_some() {
            self.transport.stop_scan();
            self.sink.emit(SessionEvent::ScanComplete);
        }
    }

    fn connect(&mut self, address: DeviceAddress) -> Result<(), CommandError> {
        let state = self.session_state();
        if state != ConnectionState::Disconnected {
            return Err(CommandError::InvalidState {
                command: "connect",
                state,
            });
        }
        self.stop_scan();

        let mut session = ConnectionSession::new(
            address,
            self.transport.clone(),
            self.sink.clone(),
            self.config.bootstrap_retry_limit,
        );
        session.connect()?;
        self.session = Some(session);
        Ok(())
    }

    fn session_mut(&mut self, command: &'static str) -> Result<&mut ConnectionSession<T, S>, CommandError> {
        self.session.as_mut().ok_or(CommandError::InvalidState {
            command,
            state: ConnectionState::Disconnected,
        })
    }
}

impl<T, S> Controller<T, S>
where
    T: Transport + Clone + Send + 'static,
    S: EventSink + Clone + Send + 'static,
{
    /// Drive the controller until every [`ControllerHandle`] is dropped.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        let mut flush = tokio::time::interval(self.config.motor_flush_interval());
        flush.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut rssi = tokio::time::interval(self.config.rssi_poll_interval());
        rssi.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("controller started");
        loop {
            let deadline = self.scan_deadline;
            tokio::select! {
                request = requests.recv() => match request {
                    Some(Request::Command { command, reply }) => {
                        let result = self.handle_command(command);
                        if let Err(err) = &result {
                            tracing::warn!(%err, "command rejected");
                        }
                        let _ = reply.send(result);
                    }
                    Some(Request::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    None => break,
                },
                Some(event) = events.recv() => self.handle_transport_event(event),
                _ = flush.tick() => self.on_motor_flush_tick(),
                _ = rssi.tick() => self.on_rssi_tick(),
                () = wait_until(deadline) => self.on_scan_timeout(),
            }
        }

        self.shutdown();
        tracing::info!("controller stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(
        self,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(32);
        let task = tokio::spawn(self.run(receiver, events));
        (ControllerHandle { sender }, task)
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

/// Message sent to a running controller.
#[derive(Debug)]
pub enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<(), CommandError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Cloneable handle used by the UI layer to talk to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<Request>,
}

impl ControllerHandle {
    /// Send a command and wait for it to be applied.
    ///
    /// # Errors
    ///
    /// Returns whatever the controller rejected the command with, or
    /// [`CommandError::Stopped`] if it is no longer running.
    pub async fn send(&self, command: Command) -> Result<(), CommandError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| CommandError::Stopped)?;
        response.await.map_err(|_| CommandError::Stopped)?
    }

    /// Current session values.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Stopped`] if the controller is gone.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, CommandError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request::Snapshot { reply })
            .await
            .map_err(|_| CommandError::Stopped)?;
        response.await.map_err(|_| CommandError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{Call, CollectingSink, RecordingTransport, address, profile_services};

    fn controller() -> (Controller<RecordingTransport, CollectingSink>, RecordingTransport, CollectingSink) {
        let transport = RecordingTransport::default();
        let sink = CollectingSink::default();
        let controller = Controller::new(transport.clone(), sink.clone(), SessionConfig::default());
        (controller, transport, sink)
    }

    fn found() -> TransportEvent {
        TransportEvent::DeviceFound {
            name: Some("Bristle".to_owned()),
            address: address(),
            rssi: Some(-50),
        }
    }

    #[test]
    fn should_forward_scan_results_only_while_scanning() {
        let (mut controller, transport, sink) = controller();
        controller.handle_transport_event(found());
        assert!(sink.events().is_empty());

        controller.handle_command(Command::Scan(true)).unwrap();
        controller.handle_transport_event(found());
        controller.handle_command(Command::Scan(false)).unwrap();

        assert_eq!(transport.calls(), vec![Call::StartScan, Call::StopScan]);
        assert_eq!(
            sink.events(),
            vec![
                SessionEvent::DeviceFound {
                    name: Some("Bristle".to_owned()),
                    address: address(),
                    rssi: Some(-50),
                },
                SessionEvent::ScanComplete,
            ]
        );
    }

    #[test]
    fn should_not_emit_scan_complete_when_idle() {
        let (mut controller, transport, sink) = controller();
        controller.handle_command(Command::Scan(false)).unwrap();
        controller.on_scan_timeout();
        assert!(transport.calls().is_empty());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn should_stop_scan_on_connect() {
        let (mut controller, transport, _) = controller();
        controller.handle_command(Command::Scan(true)).unwrap();
        controller.handle_command(Command::Connect(address())).unwrap();

        assert!(!controller.is_scanning());
        assert_eq!(
            transport.calls(),
            vec![Call::StartScan, Call::StopScan, Call::Connect(address())]
        );
        assert_eq!(controller.session_state(), ConnectionState::Connecting);
    }

    #[test]
    fn should_disconnect_live_session_when_scan_starts() {
        let (mut controller, transport, _) = controller();
        controller.handle_command(Command::Connect(address())).unwrap();
        controller.handle_transport_event(TransportEvent::LinkEstablished);
        transport.take();

        controller.handle_command(Command::Scan(true)).unwrap();
        assert_eq!(transport.calls(), vec![Call::Disconnect, Call::StartScan]);
        assert_eq!(controller.session_state(), ConnectionState::Disconnecting);
    }

    #[test]
    fn should_reject_second_connect() {
        let (mut controller, _, _) = controller();
        controller.handle_command(Command::Connect(address())).unwrap();
        assert_eq!(
            controller.handle_command(Command::Connect(address())),
            Err(CommandError::InvalidState {
                command: "connect",
                state: ConnectionState::Connecting,
            })
        );
    }

    #[test]
    fn should_reconnect_after_session_ended() {
        let (mut controller, transport, _) = controller();
        controller.handle_command(Command::Connect(address())).unwrap();
        controller.handle_transport_event(TransportEvent::LinkLost);
        assert_eq!(controller.session_state(), ConnectionState::Disconnected);

        controller.handle_command(Command::Connect(address())).unwrap();
        assert_eq!(
            transport.calls(),
            vec![Call::Connect(address()), Call::Connect(address())]
        );
    }

    #[test]
    fn should_reject_commands_without_session() {
        let (mut controller, _, _) = controller();
        assert_eq!(
            controller.handle_command(Command::SetLeftMotor(10)),
            Err(CommandError::InvalidState {
                command: "set_left_motor",
                state: ConnectionState::Disconnected,
            })
        );
        assert!(controller.handle_command(Command::Disconnect).is_err());
    }

    #[test]
    fn should_emit_bluetooth_disabled_and_drop_scan() {
        let (mut controller, _, sink) = controller();
        controller.handle_command(Command::Scan(true)).unwrap();
        controller.handle_transport_event(TransportEvent::RadioUnavailable);
        assert!(!controller.is_scanning());
        assert_eq!(sink.events(), vec![SessionEvent::BluetoothDisabled]);
    }

    #[test]
    fn should_tear_down_on_shutdown() {
        let (mut controller, transport, sink) = controller();
        controller.handle_command(Command::Connect(address())).unwrap();
        controller.handle_transport_event(TransportEvent::LinkEstablished);
        controller.handle_transport_event(TransportEvent::ServicesDiscovered(Ok(profile_services())));
        controller.shutdown();

        assert_eq!(transport.calls().last(), Some(&Call::Disconnect));
        assert_eq!(sink.events().last(), Some(&SessionEvent::Disconnected));
        assert_eq!(controller.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_scan_after_window() {
        let (controller, transport, sink) = controller();
        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let (handle, task) = controller.spawn(events_rx);

        handle.send(Command::Scan(true)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(transport.calls(), vec![Call::StartScan, Call::StopScan]);
        assert_eq!(sink.events(), vec![SessionEvent::ScanComplete]);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_rejections_through_handle() {
        let (controller, _, _) = controller();
        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let (handle, task) = controller.spawn(events_rx);

        assert!(matches!(
            handle.send(Command::SetName("bot".to_owned())).await,
            Err(CommandError::InvalidState { .. })
        ));
        assert_eq!(handle.snapshot().await.unwrap(), SessionSnapshot::default());

        drop(handle);
        task.await.unwrap();
    }
}
