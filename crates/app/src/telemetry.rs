//! Telemetry: periodic signal-strength polling and battery notifications.
//!
//! Signal strength is read on a timer while the session is `Ready`. It does
//! not occupy the characteristic in-flight slot: the radio reports it on an
//! independent channel. A tick that arrives while the previous reading is
//! still outstanding is skipped, so requests never pile up.
//!
//! Battery level is not polled; it is pushed by the peer once the
//! notification is enabled at the end of bootstrap.

use bristlebot_domain::error::OperationError;
use bristlebot_domain::profile::CharacteristicRole;

/// Interpret a battery-level value as a percentage.
///
/// Values above 100 are clamped.
///
/// # Errors
///
/// Returns [`OperationError::MalformedPayload`] for an empty value.
pub fn decode_battery(bytes: &[u8]) -> Result<u8, OperationError> {
    let raw = bytes
        .first()
        .copied()
        .ok_or(OperationError::MalformedPayload {
            role: CharacteristicRole::BatteryLevel,
            expected: 1,
            actual: 0,
        })?;
    if raw > 100 {
        tracing::debug!(raw, "battery level above 100, clamping");
    }
    Ok(raw.min(100))
}

/// Timer and subscription state for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryPoller {
    rssi_running: bool,
    rssi_outstanding: bool,
    battery_subscribed: bool,
}

impl TelemetryPoller {
    /// Arm the signal-strength timer and record the battery subscription.
    pub fn start(&mut self) {
        self.rssi_running = true;
        self.rssi_outstanding = false;
        self.battery_subscribed = true;
    }

    /// Disarm everything. Returns whether the battery subscription was
    /// active (and so needs disabling on the peer).
    pub fn stop(&mut self) -> bool {
        let was_subscribed = self.battery_subscribed;
        *self = Self::default();
        was_subscribed
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.rssi_running
    }

    #[must_use]
    pub fn battery_subscribed(&self) -> bool {
        self.battery_subscribed
    }

    /// Called on every poll tick. Returns `true` when a reading should be
    /// requested now.
    pub fn begin_poll(&mut self) -> bool {
        if !self.rssi_running || self.rssi_outstanding {
            return false;
        }
        self.rssi_outstanding = true;
        true
    }

    /// Record a completed reading. Failures are logged and the cycle skipped.
    pub fn finish_poll(&mut self, result: Result<i16, OperationError>) -> Option<i16> {
        self.rssi_outstanding = false;
        match result {
            Ok(dbm) => Some(dbm),
            Err(err) => {
                tracing::debug!(%err, "signal strength poll failed, skipping cycle");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_and_clamp_battery() {
        assert_eq!(decode_battery(&[0]), Ok(0));
        assert_eq!(decode_battery(&[100]), Ok(100));
        assert_eq!(decode_battery(&[200, 7]), Ok(100));
        assert!(decode_battery(&[]).is_err());
    }

    #[test]
    fn should_not_poll_until_started() {
        let mut poller = TelemetryPoller::default();
        assert!(!poller.begin_poll());
        poller.start();
        assert!(poller.begin_poll());
    }

    #[test]
    fn should_skip_tick_while_reading_outstanding() {
        let mut poller = TelemetryPoller::default();
        poller.start();
        assert!(poller.begin_poll());
        assert!(!poller.begin_poll());
        assert_eq!(poller.finish_poll(Ok(-70)), Some(-70));
        assert!(poller.begin_poll());
    }

    #[test]
    fn should_continue_schedule_after_failed_poll() {
        let mut poller = TelemetryPoller::default();
        poller.start();
        assert!(poller.begin_poll());
        assert_eq!(
            poller.finish_poll(Err(OperationError::SignalStrengthUnavailable)),
            None
        );
        assert!(poller.is_running());
        assert!(poller.begin_poll());
    }

    #[test]
    fn should_report_subscription_on_stop() {
        let mut poller = TelemetryPoller::default();
        assert!(!poller.stop());
        poller.start();
        assert!(poller.stop());
        assert!(!poller.is_running());
        assert!(!poller.battery_subscribed());
    }
}
