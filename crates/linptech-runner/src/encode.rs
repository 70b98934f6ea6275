//! Building service data from sensor values.

use mibeacon_packet::{object_ids, BindKey, FrameBuilder, MacAddress, PRODUCT_ID_PS1BB};

use crate::{RunnerError, RunnerResult};

/// Sensor values and framing options for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub product_id: u16,
    pub frame_counter: u8,
    pub version: u8,
    /// Device address; required for encryption and the MAC echo.
    pub address: Option<MacAddress>,
    pub bindkey: Option<BindKey>,
    pub trailer: [u8; 3],
    pub mac_echo: bool,
    pub capability: Option<u8>,
    pub pressure_present: Option<bool>,
    pub battery_percent: Option<u8>,
    pub present_duration_s: Option<u32>,
    pub absent_duration_s: Option<u32>,
    pub present_threshold_s: Option<u32>,
    pub absent_threshold_s: Option<u32>,
}

impl Default for EncodeRequest {
    fn default() -> Self {
        Self {
            product_id: PRODUCT_ID_PS1BB,
            frame_counter: 0,
            version: 5,
            address: None,
            bindkey: None,
            trailer: [0; 3],
            mac_echo: false,
            capability: None,
            pressure_present: None,
            battery_percent: None,
            present_duration_s: None,
            absent_duration_s: None,
            present_threshold_s: None,
            absent_threshold_s: None,
        }
    }
}

/// Encode a request as MiBeacon service data.
pub fn encode_frame(request: &EncodeRequest) -> RunnerResult<Vec<u8>> {
    let mut builder = FrameBuilder::new(request.product_id, request.frame_counter).version(request.version);

    if request.mac_echo {
        let address = request
            .address
            .ok_or_else(|| RunnerError::invalid_argument("MAC echo requires an address"))?;
        builder = builder.mac_echo(address);
    }
    if let Some(capability) = request.capability {
        builder = builder.capability(capability);
    }

    if let Some(present) = request.pressure_present {
        builder = builder.object(object_ids::PRESSURE_STATE, &[u8::from(present)]);
    }
    let durations = [
        (object_ids::PRESSURE_PRESENT_DURATION, request.present_duration_s),
        (object_ids::PRESSURE_ABSENT_DURATION, request.absent_duration_s),
        (object_ids::PRESSURE_PRESENT_THRESHOLD, request.present_threshold_s),
        (object_ids::PRESSURE_ABSENT_THRESHOLD, request.absent_threshold_s),
    ];
    for (id, value) in durations {
        if let Some(value) = value {
            builder = builder.object(id, &value.to_le_bytes());
        }
    }
    if let Some(battery) = request.battery_percent {
        builder = builder.object(object_ids::BATTERY, &[battery]);
    }

    if let Some(key) = request.bindkey {
        let address = request
            .address
            .ok_or_else(|| RunnerError::invalid_argument("encryption requires an address"))?;
        builder = builder.encrypt(key, address, request.trailer);
    }

    Ok(builder.build()?)
}
