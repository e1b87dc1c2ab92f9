//! Device profile: the fixed attribute table a bristlebot must expose.
//!
//! The robot publishes exactly five services, in this order:
//!
//! | # | Service | Characteristics |
//! |---|---------|-----------------|
//! | 0 | General access (`0x1800`) | device name (UTF-8, read/write) |
//! | 1 | Battery (`0x180F`) | battery level (u8 0–100, read + notify) |
//! | 2 | RGB LED | red, green, blue (u8 each, read/write) |
//! | 3 | Motors | left, right (u8 0–255, write) |
//! | 4 | Save settings | commit (write `0x01` to persist and reset) |
//!
//! The profile is a process-wide constant; nothing here is mutable.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// General-access service.
pub const SERVICE_GENERAL_ACCESS: Uuid = Uuid::from_u128(0x0000_1800_0000_1000_8000_0080_5f9b_34fb);
/// Battery service.
pub const SERVICE_BATTERY: Uuid = Uuid::from_u128(0x0000_180f_0000_1000_8000_0080_5f9b_34fb);
/// Vendor RGB LED service.
pub const SERVICE_RGB_LED: Uuid = Uuid::from_u128(0xd5d6_2c0c_6f57_4ac0_bb97_2b69_4062_756e);
/// Vendor motors service.
pub const SERVICE_MOTORS: Uuid = Uuid::from_u128(0xb857_8989_149c_4849_91f0_2852_935b_1a86);
/// Vendor save-settings service.
pub const SERVICE_SAVE_SETTINGS: Uuid = Uuid::from_u128(0x29f0_dcfe_bebe_4348_9631_5fbd_8e7f_cb79);

/// Device name characteristic.
pub const CHAR_DEVICE_NAME: Uuid = Uuid::from_u128(0x0000_2a00_0000_1000_8000_0080_5f9b_34fb);
/// Battery level characteristic.
pub const CHAR_BATTERY_LEVEL: Uuid = Uuid::from_u128(0x0000_2a19_0000_1000_8000_0080_5f9b_34fb);
/// Red LED channel characteristic.
pub const CHAR_LED_RED: Uuid = Uuid::from_u128(0x0566_4686_5bf2_45a9_83c5_8a92_7cd2_e20c);
/// Green LED channel characteristic.
pub const CHAR_LED_GREEN: Uuid = Uuid::from_u128(0xdc20_3e1a_bfa0_4647_9693_e923_b158_5cce);
/// Blue LED channel characteristic.
pub const CHAR_LED_BLUE: Uuid = Uuid::from_u128(0x2aac_f813_333d_4b6c_b997_4585_4b84_24b1);
/// Left motor characteristic.
pub const CHAR_MOTOR_LEFT: Uuid = Uuid::from_u128(0x0395_7515_5976_41c3_982a_56cb_6c4b_4a38);
/// Right motor characteristic.
pub const CHAR_MOTOR_RIGHT: Uuid = Uuid::from_u128(0x537e_f040_0e23_4fdc_80eb_eedd_837a_d98f);
/// Save/commit characteristic.
pub const CHAR_SAVE_COMMIT: Uuid = Uuid::from_u128(0xa063_2df5_f8ad_401b_9f0f_80fd_1f43_edf3);

/// Value written to [`CharacteristicRole::SaveCommit`] to persist settings.
pub const SAVE_COMMIT_VALUE: u8 = 0x01;

/// What a characteristic is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicRole {
    DeviceName,
    BatteryLevel,
    LedRed,
    LedGreen,
    LedBlue,
    MotorLeft,
    MotorRight,
    SaveCommit,
}

impl CharacteristicRole {
    /// Whether this role drives one of the two motors.
    #[must_use]
    pub fn is_motor(self) -> bool {
        matches!(self, Self::MotorLeft | Self::MotorRight)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::DeviceName => "device_name",
            Self::BatteryLevel => "battery_level",
            Self::LedRed => "led_red",
            Self::LedGreen => "led_green",
            Self::LedBlue => "led_blue",
            Self::MotorLeft => "motor_left",
            Self::MotorRight => "motor_right",
            Self::SaveCommit => "save_commit",
        }
    }
}

impl fmt::Display for CharacteristicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A characteristic expected inside a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicSpec {
    pub uuid: Uuid,
    pub role: CharacteristicRole,
}

/// A service expected at a fixed position of the attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Human-readable label, used in logs only.
    pub name: &'static str,
    pub uuid: Uuid,
    pub characteristics: &'static [CharacteristicSpec],
}

/// The ordered catalog of services the peer must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    services: &'static [ServiceSpec],
}

/// The bristlebot profile.
pub const DEVICE_PROFILE: DeviceProfile = DeviceProfile {
    services: &[
        ServiceSpec {
            name: "general_access",
            uuid: SERVICE_GENERAL_ACCESS,
            characteristics: &[CharacteristicSpec {
                uuid: CHAR_DEVICE_NAME,
                role: CharacteristicRole::DeviceName,
            }],
        },
        ServiceSpec {
            name: "battery",
            uuid: SERVICE_BATTERY,
            characteristics: &[CharacteristicSpec {
                uuid: CHAR_BATTERY_LEVEL,
                role: CharacteristicRole::BatteryLevel,
            }],
        },
        ServiceSpec {
            name: "rgb_led",
            uuid: SERVICE_RGB_LED,
            characteristics: &[
                CharacteristicSpec {
                    uuid: CHAR_LED_RED,
                    role: CharacteristicRole::LedRed,
                },
                CharacteristicSpec {
                    uuid: CHAR_LED_GREEN,
                    role: CharacteristicRole::LedGreen,
                },
                CharacteristicSpec {
                    uuid: CHAR_LED_BLUE,
                    role: CharacteristicRole::LedBlue,
                },
            ],
        },
        ServiceSpec {
            name: "motors",
            uuid: SERVICE_MOTORS,
            characteristics: &[
                CharacteristicSpec {
                    uuid: CHAR_MOTOR_LEFT,
                    role: CharacteristicRole::MotorLeft,
                },
                CharacteristicSpec {
                    uuid: CHAR_MOTOR_RIGHT,
                    role: CharacteristicRole::MotorRight,
                },
            ],
        },
        ServiceSpec {
            name: "save_settings",
            uuid: SERVICE_SAVE_SETTINGS,
            characteristics: &[CharacteristicSpec {
                uuid: CHAR_SAVE_COMMIT,
                role: CharacteristicRole::SaveCommit,
            }],
        },
    ],
};

/// Order in which characteristics are read once per connection.
pub const BOOTSTRAP_ORDER: [CharacteristicRole; 5] = [
    CharacteristicRole::DeviceName,
    CharacteristicRole::BatteryLevel,
    CharacteristicRole::LedRed,
    CharacteristicRole::LedGreen,
    CharacteristicRole::LedBlue,
];

impl DeviceProfile {
    /// The expected services, in required order.
    #[must_use]
    pub fn services(&self) -> &'static [ServiceSpec] {
        self.services
    }

    /// Service UUIDs in required order.
    pub fn service_uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.services.iter().map(|s| s.uuid)
    }

    /// Locate the service that owns `role`, with its ordinal position.
    #[must_use]
    pub fn service_for(&self, role: CharacteristicRole) -> Option<(usize, &'static ServiceSpec)> {
        self.services
            .iter()
            .enumerate()
            .find(|(_, s)| s.characteristics.iter().any(|c| c.role == role))
    }

    /// Ordinal position of a service UUID within the profile.
    #[must_use]
    pub fn position_of(&self, service: Uuid) -> Option<usize> {
        self.services.iter().position(|s| s.uuid == service)
    }

    /// Map a characteristic UUID back to its role.
    #[must_use]
    pub fn role_for(&self, characteristic: Uuid) -> Option<CharacteristicRole> {
        self.services
            .iter()
            .flat_map(|s| s.characteristics)
            .find(|c| c.uuid == characteristic)
            .map(|c| c.role)
    }
}

/// A service reported by the transport after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub uuid: Uuid,
    /// Characteristic UUIDs, in the order the transport reported them.
    pub characteristics: Vec<Uuid>,
}

impl DiscoveredService {
    #[must_use]
    pub fn new(uuid: Uuid, characteristics: Vec<Uuid>) -> Self {
        Self {
            uuid,
            characteristics,
        }
    }
}

/// Address of one characteristic on the connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle {
    pub service: Uuid,
    pub characteristic: Uuid,
}

impl fmt::Display for CharacteristicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.characteristic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_declare_five_services_in_order() {
        let uuids: Vec<_> = DEVICE_PROFILE.service_uuids().collect();
        assert_eq!(
            uuids,
            vec![
                SERVICE_GENERAL_ACCESS,
                SERVICE_BATTERY,
                SERVICE_RGB_LED,
                SERVICE_MOTORS,
                SERVICE_SAVE_SETTINGS,
            ]
        );
    }

    #[test]
    fn should_match_published_uuid_strings() {
        assert_eq!(
            SERVICE_RGB_LED,
            Uuid::parse_str("d5d62c0c-6f57-4ac0-bb97-2b694062756e").unwrap()
        );
        assert_eq!(
            SERVICE_MOTORS,
            Uuid::parse_str("b8578989-149c-4849-91f0-2852935b1a86").unwrap()
        );
        assert_eq!(
            SERVICE_SAVE_SETTINGS,
            Uuid::parse_str("29f0dcfe-bebe-4348-9631-5fbd8e7fcb79").unwrap()
        );
        assert_eq!(
            CHAR_MOTOR_RIGHT,
            Uuid::parse_str("537ef040-0e23-4fdc-80eb-eedd837ad98f").unwrap()
        );
        assert_eq!(
            CHAR_SAVE_COMMIT,
            Uuid::parse_str("a0632df5-f8ad-401b-9f0f-80fd1f43edf3").unwrap()
        );
    }

    #[test]
    fn should_cover_every_role_exactly_once() {
        let roles: Vec<_> = DEVICE_PROFILE
            .services()
            .iter()
            .flat_map(|s| s.characteristics)
            .map(|c| c.role)
            .collect();
        assert_eq!(roles.len(), 8);
        for role in BOOTSTRAP_ORDER {
            assert_eq!(roles.iter().filter(|r| **r == role).count(), 1);
        }
    }

    #[test]
    fn should_locate_service_for_role() {
        let (position, service) = DEVICE_PROFILE
            .service_for(CharacteristicRole::LedGreen)
            .unwrap();
        assert_eq!(position, 2);
        assert_eq!(service.uuid, SERVICE_RGB_LED);
    }

    #[test]
    fn should_map_characteristic_uuid_to_role() {
        assert_eq!(
            DEVICE_PROFILE.role_for(CHAR_BATTERY_LEVEL),
            Some(CharacteristicRole::BatteryLevel)
        );
        assert_eq!(DEVICE_PROFILE.role_for(Uuid::nil()), None);
    }

    #[test]
    fn should_identify_motor_roles() {
        assert!(CharacteristicRole::MotorLeft.is_motor());
        assert!(CharacteristicRole::MotorRight.is_motor());
        assert!(!CharacteristicRole::SaveCommit.is_motor());
    }

    #[test]
    fn should_display_role_in_snake_case() {
        assert_eq!(CharacteristicRole::LedBlue.to_string(), "led_blue");
    }
}
