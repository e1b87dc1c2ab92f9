//! Pending characteristic operations.

use crate::profile::CharacteristicRole;

/// Read or write, with the payload attached to writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write { payload: Vec<u8> },
}

/// One queued or in-flight attribute operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub role: CharacteristicRole,
    pub kind: OperationKind,
    /// How many times this operation has been issued to the transport.
    pub attempts: u32,
}

impl PendingOperation {
    #[must_use]
    pub fn read(role: CharacteristicRole) -> Self {
        Self {
            role,
            kind: OperationKind::Read,
            attempts: 0,
        }
    }

    #[must_use]
    pub fn write(role: CharacteristicRole, payload: Vec<u8>) -> Self {
        Self {
            role,
            kind: OperationKind::Write { payload },
            attempts: 0,
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.kind {
            OperationKind::Read => None,
            OperationKind::Write { payload } => Some(payload),
        }
    }

    /// A motor write whose payload stops the motor.
    ///
    /// These are the only writes that are retried after a failure.
    #[must_use]
    pub fn is_motor_stop(&self) -> bool {
        self.role.is_motor() && self.payload() == Some(&[0][..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_identify_motor_stop_write() {
        assert!(PendingOperation::write(CharacteristicRole::MotorLeft, vec![0]).is_motor_stop());
        assert!(!PendingOperation::write(CharacteristicRole::MotorLeft, vec![127]).is_motor_stop());
        assert!(!PendingOperation::write(CharacteristicRole::LedRed, vec![0]).is_motor_stop());
        assert!(!PendingOperation::read(CharacteristicRole::MotorRight).is_motor_stop());
    }

    #[test]
    fn should_expose_payload_for_writes_only() {
        assert_eq!(PendingOperation::read(CharacteristicRole::DeviceName).payload(), None);
        assert_eq!(
            PendingOperation::write(CharacteristicRole::SaveCommit, vec![1]).payload(),
            Some(&[1][..])
        );
    }
}
