//! Error taxonomy shared across the workspace.
//!
//! Each failure class gets its own typed enum; [`BotError`] aggregates them
//! via `#[from]` so layers can propagate with `?` without `String` variants.

use crate::profile::CharacteristicRole;

/// Top-level error for the bristlebot workspace.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// The wireless stack could not be brought up.
    #[error("initialization error")]
    Initialization(#[from] InitializationError),

    /// The peer does not expose the expected attribute table.
    #[error("profile mismatch")]
    ProfileMismatch(#[from] ProfileMismatchError),

    /// The link could not be established or dropped unexpectedly.
    #[error("link error")]
    Link(#[from] LinkError),

    /// A single characteristic operation failed.
    #[error("operation error")]
    Operation(#[from] OperationError),

    /// A user-supplied value was rejected.
    #[error("validation error")]
    Validation(#[from] ValidationError),
}

/// Fatal errors raised before any session can start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitializationError {
    /// The host has no low-energy wireless capability at all.
    #[error("wireless capability unavailable")]
    CapabilityUnavailable,

    /// The platform manager or adapter could not be obtained.
    #[error("wireless adapter unavailable")]
    AdapterUnavailable,
}

/// Reasons a discovered attribute table is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileMismatchError {
    /// The peer exposes a different number of services.
    #[error("expected {expected} services, discovered {actual}")]
    ServiceCount {
        /// Number of services in the device profile.
        expected: usize,
        /// Number of services actually discovered.
        actual: usize,
    },

    /// A service UUID differs from the profile at the same ordinal position.
    #[error("service #{position} is {actual}, expected {expected}")]
    ServiceUuid {
        /// Zero-based ordinal position of the mismatching service.
        position: usize,
        /// UUID required by the profile.
        expected: uuid::Uuid,
        /// UUID actually discovered.
        actual: uuid::Uuid,
    },

    /// A service matched but lacks one of its required characteristics.
    #[error("service {service} has no {role} characteristic")]
    MissingCharacteristic {
        /// The role that could not be resolved.
        role: CharacteristicRole,
        /// The service that should have contained it.
        service: uuid::Uuid,
    },
}

/// Link-layer failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The connection attempt failed.
    #[error("could not connect to device")]
    ConnectFailed,

    /// The connection attempt did not complete in time.
    #[error("connection attempt timed out")]
    ConnectTimedOut,

    /// An established link dropped without being asked to.
    #[error("link lost")]
    LinkLost,
}

/// Per-operation failures. These are retried or dropped internally and never
/// surfaced to the UI individually.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// The transport reported a failed characteristic read.
    #[error("read of {role} failed")]
    ReadFailed {
        /// Characteristic that was being read.
        role: CharacteristicRole,
    },

    /// The transport reported a failed characteristic write.
    #[error("write of {role} failed")]
    WriteFailed {
        /// Characteristic that was being written.
        role: CharacteristicRole,
    },

    /// A value arrived with an unexpected length.
    #[error("{role} payload must be {expected} byte(s), got {actual}")]
    MalformedPayload {
        /// Characteristic the payload belongs to.
        role: CharacteristicRole,
        /// Expected minimum length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The signal-strength reading was not available.
    #[error("signal strength unavailable")]
    SignalStrengthUnavailable,

    /// The transport reported a generic failure (platform detail attached).
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Motor percent outside `0..=100`.
    #[error("motor percent must be within 0..=100, got {0}")]
    PercentOutOfRange(i32),

    /// The device name is empty.
    #[error("device name must not be empty")]
    EmptyName,

    /// The device name exceeds the attribute length limit.
    #[error("device name is {len} bytes, maximum is {max}")]
    NameTooLong {
        /// UTF-8 length of the rejected name.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The peer address is not a six-octet MAC address.
    #[error("invalid device address {0:?}")]
    InvalidAddress(String),
}
