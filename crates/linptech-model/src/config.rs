//! Device configuration file.
//!
//! ```yaml
//! devices:
//!   - address: "A4:C1:38:5A:0B:1C"
//!     bindkey: "b853075158487ca39a5b5ea9b0a2f4cd"
//!     name: "Bedroom"
//!   - address: "a4-c1-38-00-00-02"
//! supported_product_ids: [0x3F4C]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use mibeacon_packet::{BindKey, MacAddress, MiBeaconDecoder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{product_info, registered_product_ids, ModelError, ModelResult};

/// One configured sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Device address; dashes and lower case are accepted.
    pub address: MacAddress,
    /// Bindkey for encrypted frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindkey: Option<BindKey>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DeviceConfig {
    /// Create a configuration without a key or name.
    pub fn new(address: MacAddress) -> Self {
        Self {
            address,
            bindkey: None,
            name: None,
        }
    }

    /// Display title: the configured name, or the model plus the address tail.
    pub fn title(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => default_title(&self.address),
        }
    }
}

/// Default device title, e.g. `Linptech PS1BB 0B:1C`.
pub fn default_title(address: &MacAddress) -> String {
    let address = address.to_string();
    let tail = &address[address.len() - 5..];
    format!("Linptech PS1BB {}", tail)
}

/// On-disk layout of the devices file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevicesFile {
    /// Configured sensors.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    /// Product allow-list; defaults to every registered product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_product_ids: Option<Vec<u16>>,
}

/// Validated device configuration.
#[derive(Debug, Clone)]
pub struct DeviceSet {
    devices: BTreeMap<MacAddress, DeviceConfig>,
    decoder: MiBeaconDecoder,
}

impl DeviceSet {
    /// Validate a parsed devices file.
    pub fn from_file(file: DevicesFile) -> ModelResult<Self> {
        let product_ids = match file.supported_product_ids {
            Some(ids) => {
                if let Some(unknown) = ids.iter().copied().find(|id| product_info(*id).is_none()) {
                    return Err(ModelError::UnknownProduct(unknown));
                }
                ids
            }
            None => registered_product_ids(),
        };

        let mut devices = BTreeMap::new();
        for device in file.devices {
            let address = device.address;
            if devices.insert(address, device).is_some() {
                return Err(ModelError::DuplicateDevice(address.to_string()));
            }
        }

        Ok(Self {
            devices,
            decoder: MiBeaconDecoder::new(product_ids),
        })
    }

    /// Configuration for an address, if the device is known.
    pub fn get(&self, address: &MacAddress) -> Option<&DeviceConfig> {
        self.devices.get(address)
    }

    /// Decoder restricted to the configured products.
    pub fn decoder(&self) -> &MiBeaconDecoder {
        &self.decoder
    }

    /// Configured devices in address order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceConfig> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Parse and validate a devices file from YAML text.
pub fn load_devices_from_str(yaml: &str) -> ModelResult<DeviceSet> {
    let file: DevicesFile = serde_yaml::from_str(yaml)?;
    DeviceSet::from_file(file)
}

/// Load and validate a devices file.
pub fn load_devices(path: impl AsRef<Path>) -> ModelResult<DeviceSet> {
    let path = path.as_ref();
    debug!("Loading devices from {}", path.display());
    let yaml = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let set = load_devices_from_str(&yaml)?;
    info!(
        "Loaded {} device(s), {} with bindkey",
        set.len(),
        set.iter().filter(|d| d.bindkey.is_some()).count()
    );
    Ok(set)
}
