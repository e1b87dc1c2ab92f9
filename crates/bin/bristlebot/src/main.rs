//! # bristlebot: robot controller console
//!
//! Composition root that wires the BLE transport to the synchronization
//! engine and drives it from stdin.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing (stderr)
//! - Open the host BLE adapter
//! - Spawn the controller and feed it console commands
//! - Print every UI event as a JSON line on stdout
//! - Tear the session down on `quit`, end of input or Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;
mod console;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use bristlebot_adapter_ble::BtleplugTransport;
use bristlebot_app::controller::{Command, Controller, ControllerHandle};
use bristlebot_app::event_bus::InProcessEventBus;
use bristlebot_domain::error::BotError;
use bristlebot_domain::event::SessionEvent;

use crate::config::Config;
use crate::console::Input;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();

    let (transport, transport_events) = BtleplugTransport::open(config.ble.clone())
        .await
        .map_err(BotError::from)
        .context("opening BLE adapter")?;

    let bus = InProcessEventBus::new(config.session.event_capacity);
    let printer = tokio::spawn(print_events(bus.subscribe()));

    let controller = Controller::new(transport, bus.clone(), config.session.clone());
    let (handle, task) = controller.spawn(transport_events);

    if let Some(address) = config.address.clone() {
        tracing::info!(%address, "connecting on startup");
        if let Err(err) = handle.send(Command::Connect(address)).await {
            tracing::warn!(%err, "startup connect rejected");
        }
    }

    run_console(&handle).await?;

    drop(handle);
    task.await.context("controller task")?;
    drop(bus);
    printer.await.context("event printer task")?;
    Ok(())
}

async fn run_console(handle: &ControllerHandle) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                return Ok(());
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        match console::parse_line(&line) {
            Ok(Input::Empty) => {}
            Ok(Input::Quit) => return Ok(()),
            Ok(Input::Status) => {
                let snapshot = handle.snapshot().await?;
                println!("{}", serde_json::to_string(&snapshot)?);
            }
            Ok(Input::Command(command)) => {
                if let Err(err) = handle.send(command).await {
                    eprintln!("error: {err}");
                }
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(err) => tracing::warn!(%err, "could not serialize event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event printer lagging");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
