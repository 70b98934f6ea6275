//! Device address and bindkey types.
//!
//! Both are entered by users as hex strings. [`MacAddress`] accepts
//! `AA:BB:CC:DD:EE:FF` as well as lower case and `-` separators, and always
//! displays in canonical upper-case colon-separated form. [`BindKey`] is the
//! 16-byte AES key, written as 32 hex digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PacketError;

/// Length of a Bluetooth device address in bytes.
pub const MAC_ADDRESS_LEN: usize = 6;

/// Length of a bindkey in bytes.
pub const BINDKEY_LEN: usize = 16;

/// A Bluetooth device address in display (big-endian) byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress(pub [u8; MAC_ADDRESS_LEN]);

impl MacAddress {
    /// Parse an address string.
    pub fn parse(s: &str) -> Result<Self, PacketError> {
        let normalized = s.trim().replace('-', ":");
        let parts: Vec<&str> = normalized.split(':').collect();
        if parts.len() != MAC_ADDRESS_LEN {
            return Err(PacketError::invalid_address(s));
        }

        let mut bytes = [0u8; MAC_ADDRESS_LEN];
        for (byte, part) in bytes.iter_mut().zip(&parts) {
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(PacketError::invalid_address(s));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| PacketError::invalid_address(s))?;
        }
        Ok(MacAddress(bytes))
    }

    /// Address bytes in over-the-air (little-endian) order.
    pub fn reversed(&self) -> [u8; MAC_ADDRESS_LEN] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    /// Build an address from over-the-air (little-endian) bytes.
    pub fn from_reversed(bytes: [u8; MAC_ADDRESS_LEN]) -> Self {
        let mut bytes = bytes;
        bytes.reverse();
        MacAddress(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MacAddress::parse(s)
    }
}

impl Serialize for MacAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MacAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Pre-shared AES-128 key for an encrypted device.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BindKey(pub [u8; BINDKEY_LEN]);

impl BindKey {
    /// Parse a bindkey from 32 hex characters.
    pub fn parse(s: &str) -> Result<Self, PacketError> {
        let s = s.trim();
        if s.len() != BINDKEY_LEN * 2 {
            return Err(PacketError::invalid_bindkey(format!(
                "expected {} hex characters, got {}",
                BINDKEY_LEN * 2,
                s.len()
            )));
        }
        let bytes = hex::decode(s).map_err(|e| PacketError::invalid_bindkey(e.to_string()))?;
        let mut key = [0u8; BINDKEY_LEN];
        key.copy_from_slice(&bytes);
        Ok(BindKey(key))
    }

    /// Lower-case hex form, as stored in configuration.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for BindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BindKey(..)")
    }
}

impl FromStr for BindKey {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BindKey::parse(s)
    }
}

impl From<[u8; BINDKEY_LEN]> for BindKey {
    fn from(bytes: [u8; BINDKEY_LEN]) -> Self {
        BindKey(bytes)
    }
}

impl Serialize for BindKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BindKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BindKey::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_address() {
        let addr = MacAddress::parse("A4:C1:38:5A:0B:1C").unwrap();
        assert_eq!(addr.0, [0xA4, 0xC1, 0x38, 0x5A, 0x0B, 0x1C]);
        assert_eq!(addr.to_string(), "A4:C1:38:5A:0B:1C");
    }

    #[test]
    fn test_parse_lowercase_dash_address() {
        let addr: MacAddress = "a4-c1-38-5a-0b-1c".parse().unwrap();
        assert_eq!(addr.to_string(), "A4:C1:38:5A:0B:1C");
    }

    #[test]
    fn test_parse_invalid_addresses() {
        for bad in ["", "A4:C1:38:5A:0B", "A4:C1:38:5A:0B:1C:00", "A4:C1:38:5A:0B:1G", "A4C1:38:5A:0B:1C:0"] {
            assert!(MacAddress::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_reversed_address() {
        let addr = MacAddress::parse("A4:C1:38:5A:0B:1C").unwrap();
        assert_eq!(addr.reversed(), [0x1C, 0x0B, 0x5A, 0x38, 0xC1, 0xA4]);
        assert_eq!(MacAddress::from_reversed(addr.reversed()), addr);
    }

    #[test]
    fn test_bindkey_parse() {
        let key = BindKey::parse("B853075158487CA39A5B5EA9B0A2F4CD").unwrap();
        assert_eq!(key.0[0], 0xB8);
        assert_eq!(key.to_hex(), "b853075158487ca39a5b5ea9b0a2f4cd");
    }

    #[test]
    fn test_bindkey_wrong_length() {
        assert!(BindKey::parse("b853075158487ca3").is_err());
        assert!(BindKey::parse("zz53075158487ca39a5b5ea9b0a2f4cd").is_err());
    }

    #[test]
    fn test_bindkey_debug_hides_bytes() {
        let key = BindKey([0xAB; BINDKEY_LEN]);
        assert!(!format!("{:?}", key).contains("ab"));
        assert!(!format!("{:?}", key).contains("171"));
    }
}
