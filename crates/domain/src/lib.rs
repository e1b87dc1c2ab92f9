//! # bristlebot-domain
//!
//! Pure domain model for the bristlebot controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy
//! - Define the **device profile** (the five services and eight
//!   characteristics the robot must expose, in their required order)
//! - Validate a discovered attribute table against that profile
//! - Define the **connection states** and the typed **events** surfaced to
//!   the UI layer
//! - Define the value objects carried by user commands (motor percent,
//!   LED colour, device name, peer address)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod address;
pub mod event;
pub mod motor;
pub mod operation;
pub mod profile;
pub mod settings;
pub mod state;
pub mod validator;
