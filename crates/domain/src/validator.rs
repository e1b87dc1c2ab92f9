//! Profile validation: compares a discovered attribute table to
//! [`DEVICE_PROFILE`](crate::profile::DEVICE_PROFILE).
//!
//! Matching is strictly ordinal: the service at position *i* must carry the
//! profile's UUID for position *i*. There is no fuzzy matching and no
//! tolerance for reordering.

use std::collections::HashMap;

use crate::error::ProfileMismatchError;
use crate::profile::{
    CharacteristicHandle, CharacteristicRole, DEVICE_PROFILE, DeviceProfile, DiscoveredService,
};

/// Stateless validator for a [`DeviceProfile`].
#[derive(Debug, Clone, Copy)]
pub struct ProfileValidator {
    profile: DeviceProfile,
}

impl Default for ProfileValidator {
    fn default() -> Self {
        Self {
            profile: DEVICE_PROFILE,
        }
    }
}

impl ProfileValidator {
    /// Check the discovered services against the profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileMismatchError::ServiceCount`] when the list length
    /// differs, or [`ProfileMismatchError::ServiceUuid`] for the first
    /// position whose UUID does not match.
    pub fn validate(&self, discovered: &[DiscoveredService]) -> Result<(), ProfileMismatchError> {
        let expected = self.profile.services();
        if discovered.len() != expected.len() {
            return Err(ProfileMismatchError::ServiceCount {
                expected: expected.len(),
                actual: discovered.len(),
            });
        }

        for (position, (want, got)) in expected.iter().zip(discovered).enumerate() {
            if want.uuid != got.uuid {
                return Err(ProfileMismatchError::ServiceUuid {
                    position,
                    expected: want.uuid,
                    actual: got.uuid,
                });
            }
        }

        Ok(())
    }

    /// Validate, then resolve a handle for every characteristic role.
    ///
    /// # Errors
    ///
    /// Everything [`validate`](Self::validate) returns, plus
    /// [`ProfileMismatchError::MissingCharacteristic`] when a matching
    /// service lacks one of its characteristics.
    pub fn resolve(
        &self,
        discovered: &[DiscoveredService],
    ) -> Result<HashMap<CharacteristicRole, CharacteristicHandle>, ProfileMismatchError> {
        self.validate(discovered)?;

        let mut handles = HashMap::new();
        for (spec, service) in self.profile.services().iter().zip(discovered) {
            for characteristic in spec.characteristics {
                if !service.characteristics.contains(&characteristic.uuid) {
                    return Err(ProfileMismatchError::MissingCharacteristic {
                        role: characteristic.role,
                        service: service.uuid,
                    });
                }
                handles.insert(
                    characteristic.role,
                    CharacteristicHandle {
                        service: service.uuid,
                        characteristic: characteristic.uuid,
                    },
                );
            }
        }

        Ok(handles)
    }
}
