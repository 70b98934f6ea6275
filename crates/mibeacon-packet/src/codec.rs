//! Frame parsing and encoding.
//!
//! This module slices MiBeacon service data into its header fields and
//! object region, and builds service data from parts.
//!
//! ## Frame Format
//!
//! | Field         | Size (bytes)  | Description                                     |
//! |---------------|---------------|-------------------------------------------------|
//! | frame_control | 2             | Flag bits and protocol version, little-endian   |
//! | product_id    | 2             | Device product identifier, little-endian        |
//! | frame_counter | 1             | Packet counter                                  |
//! | mac           | 6 (optional)  | Reversed device address, if `MAC_PRESENT`       |
//! | capability    | 1 (optional)  | Capability byte, if `CAPABILITY_PRESENT`        |
//! | objects       | rest          | TLV objects, encrypted if `ENCRYPTED`           |

use bytes::BufMut;
use tracing::{debug, trace};

use crate::{
    crypto, objects, BindKey, DecodeOutcome, MacAddress, PacketError, MAC_ADDRESS_LEN,
};

/// Length of frame control + product id + frame counter.
pub const FRAME_HEADER_SIZE: usize = 5;

/// The frame control word.
///
/// Each flag is an independent bit and may be combined with any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameControl(pub u16);

impl FrameControl {
    /// Object region is encrypted.
    pub const ENCRYPTED: u16 = 0x0008;
    /// A 6-byte MAC echo follows the header.
    pub const MAC_PRESENT: u16 = 0x0010;
    /// A capability byte follows the MAC echo.
    pub const CAPABILITY_PRESENT: u16 = 0x0020;
    /// The frame carries an object region.
    pub const OBJECT_PRESENT: u16 = 0x0040;

    /// Raw bits.
    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn is_encrypted(&self) -> bool {
        self.0 & Self::ENCRYPTED != 0
    }

    pub const fn has_mac(&self) -> bool {
        self.0 & Self::MAC_PRESENT != 0
    }

    pub const fn has_capability(&self) -> bool {
        self.0 & Self::CAPABILITY_PRESENT != 0
    }

    pub const fn has_objects(&self) -> bool {
        self.0 & Self::OBJECT_PRESENT != 0
    }

    /// MiBeacon protocol version (upper four bits).
    pub const fn version(&self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// Return a copy with `flag` set or cleared.
    pub const fn with(self, flag: u16, enabled: bool) -> Self {
        if enabled {
            FrameControl(self.0 | flag)
        } else {
            FrameControl(self.0 & !flag)
        }
    }
}

/// A parsed frame borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub frame_control: FrameControl,
    pub product_id: u16,
    pub frame_counter: u8,
    /// Reversed device address echoed in the frame, if present.
    pub mac_echo: Option<[u8; MAC_ADDRESS_LEN]>,
    pub capability: Option<u8>,
    /// Object region; ciphertext if the frame is encrypted.
    pub object_region: &'a [u8],
}

impl RawFrame<'_> {
    /// Whether the object region must be decrypted before decoding.
    pub fn is_encrypted(&self) -> bool {
        self.frame_control.is_encrypted()
    }
}

/// Product id of service data, without validating the rest of the frame.
pub fn peek_product_id(data: &[u8]) -> Option<u16> {
    match data {
        [_, _, lo, hi, _, ..] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// Parse service data into a [`RawFrame`].
///
/// Fails with [`DecodeOutcome::NotApplicable`] if the data is shorter than
/// the header or the product id is not in `supported_product_ids`, and with
/// [`DecodeOutcome::NoData`] if the frame carries no object region.
pub fn parse_frame<'a>(
    data: &'a [u8],
    supported_product_ids: &[u16],
) -> Result<RawFrame<'a>, DecodeOutcome> {
    let Some(product_id) = peek_product_id(data) else {
        return Err(DecodeOutcome::NotApplicable);
    };
    let frame_control = FrameControl(u16::from_le_bytes([data[0], data[1]]));

    if !supported_product_ids.contains(&product_id) {
        debug!("Ignoring device with product ID 0x{:04X}", product_id);
        return Err(DecodeOutcome::NotApplicable);
    }

    let frame_counter = data[4];
    let payload = &data[FRAME_HEADER_SIZE..];
    let mut offset = 0;

    // Optional fields are consumed only if they fit.
    let mac_echo = if frame_control.has_mac() && payload.len() >= offset + MAC_ADDRESS_LEN {
        let mut mac = [0u8; MAC_ADDRESS_LEN];
        mac.copy_from_slice(&payload[offset..offset + MAC_ADDRESS_LEN]);
        offset += MAC_ADDRESS_LEN;
        Some(mac)
    } else {
        None
    };

    let capability = if frame_control.has_capability() && payload.len() > offset {
        let cap = payload[offset];
        offset += 1;
        Some(cap)
    } else {
        None
    };

    if !frame_control.has_objects() || payload.len() <= offset {
        return Err(DecodeOutcome::NoData);
    }

    trace!(
        "MiBeacon v{} frame: product_id=0x{:04X}, counter={}, object_region={} bytes",
        frame_control.version(),
        product_id,
        frame_counter,
        payload.len() - offset
    );
    Ok(RawFrame {
        frame_control,
        product_id,
        frame_counter,
        mac_echo,
        capability,
        object_region: &payload[offset..],
    })
}

/// Builder for MiBeacon service data.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    product_id: u16,
    frame_counter: u8,
    version: u8,
    mac_echo: Option<MacAddress>,
    capability: Option<u8>,
    objects: Vec<(u16, Vec<u8>)>,
    raw_objects: Vec<u8>,
    encryption: Option<(BindKey, MacAddress, [u8; crypto::TRAILER_SIZE])>,
}

impl FrameBuilder {
    /// Start a frame for `product_id` with the given counter.
    pub fn new(product_id: u16, frame_counter: u8) -> Self {
        FrameBuilder {
            product_id,
            frame_counter,
            version: 5,
            mac_echo: None,
            capability: None,
            objects: Vec::new(),
            raw_objects: Vec::new(),
            encryption: None,
        }
    }

    /// Set the protocol version nibble.
    pub fn version(mut self, version: u8) -> Self {
        self.version = version & 0x0F;
        self
    }

    /// Include a MAC echo of `address`.
    pub fn mac_echo(mut self, address: MacAddress) -> Self {
        self.mac_echo = Some(address);
        self
    }

    /// Include a capability byte.
    pub fn capability(mut self, capability: u8) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Append an object.
    pub fn object(mut self, id: u16, data: &[u8]) -> Self {
        self.objects.push((id, data.to_vec()));
        self
    }

    /// Append raw bytes to the object region after the encoded objects.
    pub fn raw_objects(mut self, data: &[u8]) -> Self {
        self.raw_objects.extend_from_slice(data);
        self
    }

    /// Encrypt the object region for `address` under `key`.
    pub fn encrypt(mut self, key: BindKey, address: MacAddress, trailer: [u8; crypto::TRAILER_SIZE]) -> Self {
        self.encryption = Some((key, address, trailer));
        self
    }

    /// Encode the frame.
    pub fn build(&self) -> Result<Vec<u8>, PacketError> {
        let records: Vec<_> = self
            .objects
            .iter()
            .map(|(id, data)| objects::ObjectRecord::new(*id, data))
            .collect();
        let mut region = objects::encode_objects(&records)?;
        region.extend_from_slice(&self.raw_objects);

        let has_objects = !region.is_empty();
        if let Some((key, address, trailer)) = &self.encryption {
            if has_objects {
                region = crypto::encrypt_payload(
                    &region,
                    key,
                    address,
                    self.product_id,
                    self.frame_counter,
                    trailer,
                )?;
            }
        }

        let frame_control = FrameControl((self.version as u16) << 12)
            .with(FrameControl::ENCRYPTED, self.encryption.is_some() && has_objects)
            .with(FrameControl::MAC_PRESENT, self.mac_echo.is_some())
            .with(FrameControl::CAPABILITY_PRESENT, self.capability.is_some())
            .with(FrameControl::OBJECT_PRESENT, has_objects);

        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + MAC_ADDRESS_LEN + 1 + region.len());
        buf.put_u16_le(frame_control.bits());
        buf.put_u16_le(self.product_id);
        buf.put_u8(self.frame_counter);
        if let Some(address) = &self.mac_echo {
            buf.put_slice(&address.reversed());
        }
        if let Some(capability) = self.capability {
            buf.put_u8(capability);
        }
        buf.put_slice(&region);
        Ok(buf)
    }
}
