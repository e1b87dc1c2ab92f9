//! Motor command state: the latest requested power per side.
//!
//! Setters only record intent; the periodic flush in the app layer turns
//! dirty sides into characteristic writes. Repeated requests between two
//! flushes therefore collapse into the most recent value.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::profile::CharacteristicRole;

/// Which motor a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorSide {
    Left,
    Right,
}

impl MotorSide {
    /// Both sides, left first (flush order).
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// The characteristic that drives this side.
    #[must_use]
    pub fn role(self) -> CharacteristicRole {
        match self {
            Self::Left => CharacteristicRole::MotorLeft,
            Self::Right => CharacteristicRole::MotorRight,
        }
    }
}

impl fmt::Display for MotorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Motor power in percent, guaranteed to be within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "u8")]
pub struct MotorPercent(u8);

impl MotorPercent {
    pub const STOP: Self = Self(0);
    pub const MAX: Self = Self(100);

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_stop(self) -> bool {
        self.0 == 0
    }

    /// Scale to the characteristic's native `0..=255` range.
    #[must_use]
    pub fn to_native(self) -> u8 {
        let scaled = u16::from(self.0) * 255 / 100;
        u8::try_from(scaled).unwrap_or(u8::MAX)
    }
}

impl TryFrom<i32> for MotorPercent {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(p) if p <= 100 => Ok(Self(p)),
            _ => Err(ValidationError::PercentOutOfRange(value)),
        }
    }
}

impl From<MotorPercent> for u8 {
    fn from(value: MotorPercent) -> Self {
        value.0
    }
}

/// Bookkeeping for one motor side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorChannel {
    pub last_requested: MotorPercent,
    pub dirty: bool,
    pub last_sent: Option<DateTime<Utc>>,
}

/// Requested power for both motors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorCommandState {
    left: MotorChannel,
    right: MotorChannel,
}

impl MotorCommandState {
    #[must_use]
    pub fn channel(&self, side: MotorSide) -> &MotorChannel {
        match side {
            MotorSide::Left => &self.left,
            MotorSide::Right => &self.right,
        }
    }

    fn channel_mut(&mut self, side: MotorSide) -> &mut MotorChannel {
        match side {
            MotorSide::Left => &mut self.left,
            MotorSide::Right => &mut self.right,
        }
    }

    /// Record a new request for `side` and mark it dirty.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PercentOutOfRange`] when `percent` is not
    /// within `0..=100`; the previous state is left untouched.
    pub fn request(&mut self, side: MotorSide, percent: i32) -> Result<MotorPercent, ValidationError> {
        let percent = MotorPercent::try_from(percent)?;
        let channel = self.channel_mut(side);
        channel.last_requested = percent;
        channel.dirty = true;
        Ok(percent)
    }

    /// Whether `side` is dirty with a stop request.
    #[must_use]
    pub fn wants_stop(&self, side: MotorSide) -> bool {
        let channel = self.channel(side);
        channel.dirty && channel.last_requested.is_stop()
    }

    /// Consume the pending request for `side`, if any.
    ///
    /// Clears the dirty flag and stamps `last_sent`.
    pub fn take_dirty(&mut self, side: MotorSide) -> Option<MotorPercent> {
        let channel = self.channel_mut(side);
        if !channel.dirty {
            return None;
        }
        channel.dirty = false;
        channel.last_sent = Some(Utc::now());
        Some(channel.last_requested)
    }
}
