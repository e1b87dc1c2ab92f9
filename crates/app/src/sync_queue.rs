//! Bootstrap read queue.
//!
//! Built once after the profile validates, in [`BOOTSTRAP_ORDER`]:
//! device name, battery level, then the red, green and blue LED channels.
//! Reads are handed out one at a time; a failed read is retried before the
//! queue advances, so the order is preserved regardless of how completions
//! are timed.

use std::collections::VecDeque;

use bristlebot_domain::error::OperationError;
use bristlebot_domain::operation::PendingOperation;
use bristlebot_domain::profile::{BOOTSTRAP_ORDER, CharacteristicRole};
use bristlebot_domain::settings::DeviceName;

use crate::telemetry::decode_battery;

/// A decoded bootstrap value, ready to be stored on the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapValue {
    Name(DeviceName),
    Battery(u8),
    Red(u8),
    Green(u8),
    Blue(u8),
}

/// What to do after a bootstrap read failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadRetry {
    /// Issue the same read again.
    Retry(PendingOperation),
    /// The retry budget is spent; abandon the connection.
    GiveUp,
}

/// FIFO of bootstrap reads.
#[derive(Debug, Clone)]
pub struct CharacteristicSyncQueue {
    pending: VecDeque<PendingOperation>,
    retry_limit: Option<u32>,
}

impl CharacteristicSyncQueue {
    /// Build the queue in bootstrap order.
    #[must_use]
    pub fn new(retry_limit: Option<u32>) -> Self {
        Self {
            pending: BOOTSTRAP_ORDER
                .iter()
                .copied()
                .map(PendingOperation::read)
                .collect(),
            retry_limit,
        }
    }

    /// Take the next read to issue.
    pub fn next_read(&mut self) -> Option<PendingOperation> {
        self.pending.pop_front()
    }

    /// Whether every read has been handed out.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    /// Decide whether a failed read is issued again.
    ///
    /// Without a retry limit the read is always retried.
    #[must_use]
    pub fn on_failure(&self, op: PendingOperation) -> ReadRetry {
        match self.retry_limit {
            Some(limit) if op.attempts > limit => ReadRetry::GiveUp,
            _ => ReadRetry::Retry(op),
        }
    }
}

/// Decode the raw value of a bootstrap read.
///
/// # Errors
///
/// Returns [`OperationError::MalformedPayload`] for an empty single-byte
/// value, or [`OperationError::Transport`] for a role that is never read
/// during bootstrap.
pub fn decode(role: CharacteristicRole, bytes: &[u8]) -> Result<BootstrapValue, OperationError> {
    let single = || {
        bytes.first().copied().ok_or(OperationError::MalformedPayload {
            role,
            expected: 1,
            actual: bytes.len(),
        })
    };

    match role {
        CharacteristicRole::DeviceName => Ok(BootstrapValue::Name(DeviceName::from_wire(bytes))),
        CharacteristicRole::BatteryLevel => decode_battery(bytes).map(BootstrapValue::Battery),
        CharacteristicRole::LedRed => single().map(BootstrapValue::Red),
        CharacteristicRole::LedGreen => single().map(BootstrapValue::Green),
        CharacteristicRole::LedBlue => single().map(BootstrapValue::Blue),
        other => Err(OperationError::Transport(format!(
            "{other} is not part of the bootstrap sequence"
        ))),
    }
}
