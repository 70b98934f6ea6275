//! Advertisement capture files.
//!
//! A capture is a YAML list of received advertisements:
//!
//! ```yaml
//! - address: "A4:C1:38:5A:0B:1C"
//!   rssi: -67
//!   timestamp: "2026-03-01T08:15:00Z"
//!   service_data:
//!     0000fe95-0000-1000-8000-00805f9b34fb: "48004c3f2a76770d9fd6518a63010000442d9e90"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use mibeacon_packet::{MacAddress, MI_SERVICE_UUID};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::{RunnerError, RunnerResult};

/// One received advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapturedAdvertisement {
    /// Advertiser address.
    pub address: MacAddress,
    /// Received signal strength in dBm.
    #[serde(default)]
    pub rssi: Option<i16>,
    /// Reception time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Service data keyed by lower-case service UUID.
    #[serde(default, deserialize_with = "deserialize_service_data")]
    pub service_data: BTreeMap<String, Vec<u8>>,
}

impl CapturedAdvertisement {
    /// MiBeacon service data, if present.
    pub fn mibeacon_data(&self) -> Option<&[u8]> {
        self.service_data.get(MI_SERVICE_UUID).map(Vec::as_slice)
    }
}

fn deserialize_service_data<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(uuid, data)| {
            let bytes = decode_hex(&data).map_err(serde::de::Error::custom)?;
            Ok((uuid.to_ascii_lowercase(), bytes))
        })
        .collect()
}

/// Decode a hex string, ignoring whitespace and an optional `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = s.split_whitespace().collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    hex::decode(cleaned).map_err(|e| format!("invalid hex '{}': {}", s, e))
}

/// Parse a capture from YAML text.
pub fn load_capture_from_str(yaml: &str) -> RunnerResult<Vec<CapturedAdvertisement>> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(yaml).map_err(|e| RunnerError::capture(e.to_string()))
}

/// Load a capture file.
pub fn load_capture(path: impl AsRef<Path>) -> RunnerResult<Vec<CapturedAdvertisement>> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let capture = load_capture_from_str(&yaml)?;
    debug!("Loaded {} advertisement(s) from {}", capture.len(), path.display());
    Ok(capture)
}
