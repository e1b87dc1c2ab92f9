//! Command write queue with motor coalescing.
//!
//! Motor setters only update [`MotorCommandState`]. A periodic flush turns
//! dirty sides into writes, so however fast the user drags a slider each
//! side sees at most one write per flush interval.
//!
//! A dirty stop request jumps the queue: everything waiting is discarded and
//! the zero-writes are queued behind the operation already in flight.
//! Name, colour and save writes bypass coalescing and are appended directly.
//! Saving re-sends the requested name and colour ahead of the commit byte so
//! the robot persists them even if an earlier write was dropped.

use std::collections::VecDeque;

use bristlebot_domain::error::ValidationError;
use bristlebot_domain::motor::{MotorCommandState, MotorPercent, MotorSide};
use bristlebot_domain::operation::PendingOperation;
use bristlebot_domain::profile::{CharacteristicRole, SAVE_COMMIT_VALUE};
use bristlebot_domain::settings::{DeviceName, Rgb};

/// What to do after a write completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteDisposition {
    /// Issue the next queued write, if any.
    Continue,
    /// Issue this same write again.
    Retry(PendingOperation),
    /// The save commit landed; the session must disconnect.
    SaveCommitted,
}

/// FIFO of outbound writes plus the motor intent that feeds it.
#[derive(Debug, Clone)]
pub struct CommandWriteQueue {
    pending: VecDeque<PendingOperation>,
    motors: MotorCommandState,
    flush_running: bool,
}

impl Default for CommandWriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandWriteQueue {
    /// Empty queue with the flush timer armed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            motors: MotorCommandState::default(),
            flush_running: true,
        }
    }

    /// Record a motor request. Nothing is written until the next flush.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PercentOutOfRange`]; state is unchanged.
    pub fn request_motor(&mut self, side: MotorSide, percent: i32) -> Result<MotorPercent, ValidationError> {
        self.motors.request(side, percent)
    }

    /// Queue a device-name write.
    pub fn push_name(&mut self, name: &DeviceName) {
        self.pending
            .push_back(PendingOperation::write(CharacteristicRole::DeviceName, name.to_wire()));
    }

    /// Queue writes for all three LED channels.
    pub fn push_color(&mut self, color: Rgb) {
        self.pending
            .push_back(PendingOperation::write(CharacteristicRole::LedRed, vec![color.red]));
        self.pending
            .push_back(PendingOperation::write(CharacteristicRole::LedGreen, vec![color.green]));
        self.pending
            .push_back(PendingOperation::write(CharacteristicRole::LedBlue, vec![color.blue]));
    }

    /// Stop motor coalescing, then queue the settings followed by the
    /// commit write.
    pub fn push_save(&mut self, name: Option<&DeviceName>, color: Rgb) {
        self.flush_running = false;
        if let Some(name) = name {
            self.push_name(name);
        }
        self.push_color(color);
        self.pending.push_back(PendingOperation::write(
            CharacteristicRole::SaveCommit,
            vec![SAVE_COMMIT_VALUE],
        ));
    }

    /// Take the next write to issue.
    pub fn next_write(&mut self) -> Option<PendingOperation> {
        self.pending.pop_front()
    }

    /// Number of writes waiting behind the in-flight slot.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_flush_running(&self) -> bool {
        self.flush_running
    }

    #[must_use]
    pub fn motors(&self) -> &MotorCommandState {
        &self.motors
    }

    /// Run one flush cycle. `in_flight` tells whether a write is currently
    /// outstanding. Returns the number of writes queued.
    pub fn flush(&mut self, in_flight: bool) -> usize {
        if !self.flush_running {
            return 0;
        }

        if !in_flight && self.pending.is_empty() {
            let mut queued = 0;
            for side in MotorSide::BOTH {
                if let Some(percent) = self.motors.take_dirty(side) {
                    tracing::debug!(%side, percent = percent.get(), "queueing motor write");
                    self.pending.push_back(motor_write(side, percent));
                    queued += 1;
                }
            }
            return queued;
        }

        let stops: Vec<MotorSide> = MotorSide::BOTH
            .into_iter()
            .filter(|side| self.motors.wants_stop(*side))
            .collect();
        if stops.is_empty() {
            return 0;
        }

        let dropped = self.pending.len();
        self.pending.clear();
        for side in &stops {
            if let Some(percent) = self.motors.take_dirty(*side) {
                self.pending.push_back(motor_write(*side, percent));
            }
        }
        tracing::info!(dropped, ?stops, "stop request overrides queued writes");
        stops.len()
    }

    /// Apply the retry policy to a completed write.
    ///
    /// Failed motor stops are retried; every other failure is dropped.
    pub fn complete(&mut self, op: PendingOperation, succeeded: bool) -> WriteDisposition {
        if succeeded {
            if op.role == CharacteristicRole::SaveCommit {
                return WriteDisposition::SaveCommitted;
            }
            return WriteDisposition::Continue;
        }

        if op.is_motor_stop() {
            tracing::debug!(role = %op.role, attempt = op.attempts, "retrying motor stop");
            return WriteDisposition::Retry(op);
        }

        tracing::warn!(role = %op.role, "write failed, dropping");
        if op.role == CharacteristicRole::SaveCommit {
            self.flush_running = true;
        }
        WriteDisposition::Continue
    }
}

fn motor_write(side: MotorSide, percent: MotorPercent) -> PendingOperation {
    PendingOperation::write(side.role(), vec![percent.to_native()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut CommandWriteQueue) -> Vec<PendingOperation> {
        std::iter::from_fn(|| queue.next_write()).collect()
    }

    #[test]
    fn should_not_write_on_motor_request() {
        let mut queue = CommandWriteQueue::new();
        queue.request_motor(MotorSide::Left, 50).unwrap();
        assert_eq!(queue.waiting(), 0);
    }

    #[test]
    fn should_flush_dirty_sides_when_idle() {
        let mut queue = CommandWriteQueue::new();
        queue.request_motor(MotorSide::Right, 100).unwrap();
        queue.request_motor(MotorSide::Left, 50).unwrap();

        assert_eq!(queue.flush(false), 2);
        assert_eq!(
            drain(&mut queue),
            vec![
                PendingOperation::write(CharacteristicRole::MotorLeft, vec![127]),
                PendingOperation::write(CharacteristicRole::MotorRight, vec![255]),
            ]
        );
        assert_eq!(queue.flush(false), 0);
    }

    #[test]
    fn should_coalesce_requests_within_one_interval() {
        let mut queue = CommandWriteQueue::new();
        queue.request_motor(MotorSide::Left, 50).unwrap();
        queue.request_motor(MotorSide::Left, 0).unwrap();

        queue.flush(false);
        assert_eq!(
            drain(&mut queue),
            vec![PendingOperation::write(CharacteristicRole::MotorLeft, vec![0])]
        );
    }

    #[test]
    fn should_hold_nonzero_request_while_busy() {
        let mut queue = CommandWriteQueue::new();
        queue.request_motor(MotorSide::Left, 30).unwrap();
        assert_eq!(queue.flush(true), 0);
        assert!(queue.motors().channel(MotorSide::Left).dirty);
    }

    #[test]
    fn should_override_backlog_with_stop() {
        let mut queue = CommandWriteQueue::new();
        queue.push_color(Rgb::new(1, 2, 3));
        queue.request_motor(MotorSide::Right, 80).unwrap();
        queue.request_motor(MotorSide::Left, 0).unwrap();

        assert_eq!(queue.flush(true), 1);
        assert_eq!(
            drain(&mut queue),
            vec![PendingOperation::write(CharacteristicRole::MotorLeft, vec![0])]
        );
        assert!(queue.motors().channel(MotorSide::Right).dirty);
        assert!(!queue.motors().channel(MotorSide::Left).dirty);
    }

    #[test]
    fn should_queue_both_stops_on_override() {
        let mut queue = CommandWriteQueue::new();
        queue.push_name(&DeviceName::new("bot").unwrap());
        queue.request_motor(MotorSide::Left, 0).unwrap();
        queue.request_motor(MotorSide::Right, 0).unwrap();

        assert_eq!(queue.flush(false), 2);
        assert_eq!(queue.waiting(), 2);
    }

    #[test]
    fn should_retry_failed_motor_stop_only() {
        let mut queue = CommandWriteQueue::new();
        let stop = PendingOperation::write(CharacteristicRole::MotorLeft, vec![0]);
        let drive = PendingOperation::write(CharacteristicRole::MotorLeft, vec![127]);
        let color = PendingOperation::write(CharacteristicRole::LedRed, vec![0]);

        assert_eq!(
            queue.complete(stop.clone(), false),
            WriteDisposition::Retry(stop)
        );
        assert_eq!(queue.complete(drive, false), WriteDisposition::Continue);
        assert_eq!(queue.complete(color, false), WriteDisposition::Continue);
    }

    #[test]
    fn should_write_settings_before_save_commit() {
        let mut queue = CommandWriteQueue::new();
        let name = DeviceName::new("Zoomer").unwrap();
        queue.push_save(Some(&name), Rgb::new(1, 2, 3));
        assert_eq!(
            drain(&mut queue),
            vec![
                PendingOperation::write(CharacteristicRole::DeviceName, b"Zoomer".to_vec()),
                PendingOperation::write(CharacteristicRole::LedRed, vec![1]),
                PendingOperation::write(CharacteristicRole::LedGreen, vec![2]),
                PendingOperation::write(CharacteristicRole::LedBlue, vec![3]),
                PendingOperation::write(CharacteristicRole::SaveCommit, vec![SAVE_COMMIT_VALUE]),
            ]
        );
    }

    #[test]
    fn should_signal_save_committed_on_success() {
        let mut queue = CommandWriteQueue::new();
        queue.push_save(None, Rgb::WHITE);
        assert!(!queue.is_flush_running());
        let save = drain(&mut queue).pop().unwrap();
        assert_eq!(save.payload(), Some(&[SAVE_COMMIT_VALUE][..]));
        assert_eq!(queue.complete(save, true), WriteDisposition::SaveCommitted);
    }

    #[test]
    fn should_resume_flush_when_save_fails() {
        let mut queue = CommandWriteQueue::new();
        queue.push_save(None, Rgb::WHITE);
        let save = drain(&mut queue).pop().unwrap();
        assert_eq!(queue.complete(save, false), WriteDisposition::Continue);
        assert!(queue.is_flush_running());
    }

    #[test]
    fn should_not_flush_after_save_queued() {
        let mut queue = CommandWriteQueue::new();
        queue.push_save(None, Rgb::WHITE);
        queue.request_motor(MotorSide::Left, 0).unwrap();
        assert_eq!(queue.flush(false), 0);
        assert_eq!(queue.waiting(), 4);
    }
}
