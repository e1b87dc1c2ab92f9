//! # bristlebot-app
//!
//! Application layer: the device-synchronization engine and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Transport`: fire-and-forget attribute-protocol primitives whose
//!     results come back as [`TransportEvent`](ports::TransportEvent)s
//!   - `EventSink`: typed notifications to the UI layer
//! - Drive one [`ConnectionSession`](session::ConnectionSession): connect,
//!   validate, bootstrap, relay commands, poll telemetry, tear down
//! - Serialize every input (UI commands, transport completions, timer ticks)
//!   through a single [`Controller`](controller::Controller) so no two
//!   handlers ever run at once
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `bristlebot-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod config;
pub mod controller;
pub mod error;
pub mod event_bus;
pub mod ports;
pub mod session;
pub mod sync_queue;
pub mod telemetry;
pub mod write_queue;

#[cfg(test)]
pub(crate) mod test_support;
