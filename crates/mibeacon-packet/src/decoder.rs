//! Frame decoding pipeline.
//!
//! Service data flows strictly forward: [`parse_frame`] slices the header,
//! [`decrypt_frame`] authenticates and decrypts encrypted object regions, and
//! [`decode_objects`] maps the TLV stream onto a [`DecodedReading`].
//!
//! Decoding is stateless. A [`MiBeaconDecoder`] only holds its product id
//! allow-list and can be shared freely between threads.

use tracing::debug;

use crate::{
    crypto::decrypt_frame, objects::decode_objects, parse_frame, BindKey, DecodeOutcome,
    DecodedReading, MacAddress, RawFrame, SUPPORTED_PRODUCT_IDS,
};

/// A received advertisement, as handed over by the radio stack.
#[derive(Debug, Clone, Copy)]
pub struct Advertisement<'a> {
    /// Advertiser address.
    pub address: MacAddress,
    /// Received signal strength.
    pub rssi: Option<i16>,
    /// MiBeacon service data.
    pub service_data: &'a [u8],
}

/// Decoder for MiBeacon frames from a set of supported products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiBeaconDecoder {
    supported_product_ids: Vec<u16>,
}

impl Default for MiBeaconDecoder {
    fn default() -> Self {
        Self::new(SUPPORTED_PRODUCT_IDS.iter().copied())
    }
}

impl MiBeaconDecoder {
    /// Create a decoder accepting the given product ids.
    pub fn new(supported_product_ids: impl IntoIterator<Item = u16>) -> Self {
        let mut ids: Vec<u16> = supported_product_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        MiBeaconDecoder {
            supported_product_ids: ids,
        }
    }

    /// Product ids this decoder accepts.
    pub fn supported_product_ids(&self) -> &[u16] {
        &self.supported_product_ids
    }

    /// Decode service data from a device given by address string.
    ///
    /// The address is parsed only once the frame is known to be applicable;
    /// an unparseable address yields [`DecodeOutcome::Malformed`].
    pub fn decode(
        &self,
        raw_service_data: &[u8],
        key: Option<&BindKey>,
        address: &str,
    ) -> Result<DecodedReading, DecodeOutcome> {
        // Reject foreign frames before touching the address.
        let frame = parse_frame(raw_service_data, &self.supported_product_ids)?;
        let address = MacAddress::parse(address).map_err(|e| {
            debug!("{}", e);
            DecodeOutcome::Malformed
        })?;
        decode_frame(&frame, key, &address)
    }

    /// Decode service data from a device with a parsed address.
    pub fn decode_from(
        &self,
        raw_service_data: &[u8],
        key: Option<&BindKey>,
        address: &MacAddress,
    ) -> Result<DecodedReading, DecodeOutcome> {
        let frame = parse_frame(raw_service_data, &self.supported_product_ids)?;
        decode_frame(&frame, key, address)
    }

    /// Decode an advertisement, attaching its RSSI to the reading.
    pub fn decode_advertisement(
        &self,
        advertisement: &Advertisement<'_>,
        key: Option<&BindKey>,
    ) -> Result<DecodedReading, DecodeOutcome> {
        self.decode_from(advertisement.service_data, key, &advertisement.address)
            .map(|reading| reading.with_signal_strength(advertisement.rssi))
    }
}

/// Decrypt if needed and decode the objects of an applicable frame.
///
/// A missing key is only logged at debug here; callers report
/// [`DecodeOutcome::KeyRequired`] at its [`severity`](DecodeOutcome::severity).
fn decode_frame(
    frame: &RawFrame<'_>,
    key: Option<&BindKey>,
    address: &MacAddress,
) -> Result<DecodedReading, DecodeOutcome> {
    if let Some(echo) = frame.mac_echo {
        if echo != address.reversed() {
            debug!(
                "MAC echo {} does not match configured address {}",
                MacAddress::from_reversed(echo),
                address
            );
        }
    }

    let reading = DecodedReading::new(*address);
    let reading = if frame.is_encrypted() {
        let Some(key) = key else {
            debug!("Encrypted MiBeacon payload from {} but no bindkey configured", address);
            return Err(DecodeOutcome::KeyRequired);
        };
        let plaintext = decrypt_frame(frame, key, address).map_err(|outcome| {
            debug!("Dropping MiBeacon frame from {}: {}", address, outcome);
            outcome
        })?;
        decode_objects(&plaintext, reading)
    } else {
        decode_objects(frame.object_region, reading)
    };

    if !reading.has_sensor_data() {
        return Err(DecodeOutcome::NoData);
    }
    Ok(reading)
}

/// Decode MiBeacon service data.
///
/// Convenience wrapper around [`MiBeaconDecoder::decode`].
pub fn decode(
    raw_service_data: &[u8],
    key: Option<&BindKey>,
    address: &str,
    supported_product_ids: &[u16],
) -> Result<DecodedReading, DecodeOutcome> {
    MiBeaconDecoder::new(supported_product_ids.iter().copied()).decode(raw_service_data, key, address)
}
