//! # bristlebot-adapter-ble
//!
//! BLE adapter: implements the `Transport` port on top of `btleplug`.
//!
//! ## How it works
//!
//! The robot is a GATT peripheral with five services. Each port method
//! spawns a task that performs one btleplug call and reports the outcome as
//! a `TransportEvent` on an unbounded channel. The application controller
//! owns the receiving end and feeds every event into its state machine.
//!
//! | Port primitive | btleplug call |
//! |----------------|---------------|
//! | `start_scan` / `stop_scan` | `Central::start_scan` / `stop_scan` |
//! | `connect` | peripheral lookup (scanning if needed) + `Peripheral::connect` |
//! | `discover_services` | `Peripheral::discover_services` + profile ordering |
//! | `read_characteristic` | `Peripheral::read` |
//! | `write_characteristic` | `Peripheral::write` with response |
//! | `set_notify` | `subscribe` / `unsubscribe` + notification stream |
//! | `read_signal_strength` | last RSSI from `Peripheral::properties` |
//!
//! ## Dependency rule
//!
//! Depends on `bristlebot-app` and `bristlebot-domain`.

mod config;
pub mod discovery;
mod error;
mod scanner;
mod transport;

pub use config::BleConfig;
pub use error::BleError;
pub use transport::BtleplugTransport;
