//! Decoded sensor reading.

use serde::{Deserialize, Serialize};

use crate::MacAddress;

/// Sensor values extracted from a single advertisement.
///
/// Every sensor field is optional because a frame may report any subset of
/// objects. The decoder never returns a reading whose sensor fields are all
/// unset; see [`DecodedReading::has_sensor_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedReading {
    /// Device address, canonical form.
    pub address: MacAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_present: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_present_duration_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_absent_duration_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_present_threshold_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_absent_threshold_s: Option<u32>,
    /// Radio metadata supplied by the caller, not part of the frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength_dbm: Option<i16>,
}

impl DecodedReading {
    /// Create an empty reading for `address`.
    pub fn new(address: MacAddress) -> Self {
        DecodedReading {
            address,
            battery_percent: None,
            pressure_present: None,
            pressure_present_duration_s: None,
            pressure_absent_duration_s: None,
            pressure_present_threshold_s: None,
            pressure_absent_threshold_s: None,
            signal_strength_dbm: None,
        }
    }

    /// Attach the received signal strength.
    pub fn with_signal_strength(mut self, rssi_dbm: Option<i16>) -> Self {
        self.signal_strength_dbm = rssi_dbm;
        self
    }

    /// Whether any field decoded from the object region is set.
    ///
    /// Signal strength is not counted.
    pub fn has_sensor_data(&self) -> bool {
        self.battery_percent.is_some()
            || self.pressure_present.is_some()
            || self.pressure_present_duration_s.is_some()
            || self.pressure_absent_duration_s.is_some()
            || self.pressure_present_threshold_s.is_some()
            || self.pressure_absent_threshold_s.is_some()
    }
}
