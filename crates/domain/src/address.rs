//! Peer address: a six-octet MAC in `AA:BB:CC:DD:EE:FF` form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Validated, upper-cased device address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Raw six bytes, most significant first.
    #[must_use]
    pub fn octets(&self) -> [u8; 6] {
        let mut out = [0u8; 6];
        for (slot, part) in out.iter_mut().zip(self.0.split(':')) {
            // Validated on construction.
            *slot = u8::from_str_radix(part, 16).unwrap_or_default();
        }
        out
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let well_formed = parts.len() == 6
            && parts
                .iter()
                .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(ValidationError::InvalidAddress(s.to_string()));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceAddress> for String {
    fn from(value: DeviceAddress) -> Self {
        value.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_and_uppercase_valid_address() {
        let addr: DeviceAddress = "c4:7c:8d:6a:12:34".parse().unwrap();
        assert_eq!(addr.as_str(), "C4:7C:8D:6A:12:34");
        assert_eq!(addr.octets(), [0xC4, 0x7C, 0x8D, 0x6A, 0x12, 0x34]);
    }

    #[test]
    fn should_reject_malformed_addresses() {
        for bad in [
            "",
            "AA:BB:CC:DD:EE",
            "AA:BB:CC:DD:EE:FF:00",
            "AA-BB-CC-DD-EE-FF",
            "GG:BB:CC:DD:EE:FF",
            "A:BB:CC:DD:EE:FFF",
        ] {
            assert_eq!(
                bad.parse::<DeviceAddress>(),
                Err(ValidationError::InvalidAddress(bad.to_string())),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn should_reject_invalid_address_on_deserialize() {
        let result: Result<DeviceAddress, _> = serde_json::from_str("\"nope\"");
        assert!(result.is_err());
    }
}
