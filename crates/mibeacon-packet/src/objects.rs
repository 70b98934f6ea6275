//! MiBeacon object (TLV) decoding.
//!
//! The plaintext object region is a sequence of records:
//!
//! | Field  | Size (bytes) | Description                      |
//! |--------|--------------|----------------------------------|
//! | id     | 2            | Object identifier, little-endian |
//! | length | 1            | Length of `data`                 |
//! | data   | `length`     | Object payload                   |
//!
//! Recognized identifiers are mapped onto [`DecodedReading`] fields through
//! [`OBJECT_TABLE`]. Unknown identifiers are skipped.

use tracing::debug;

use crate::{DecodedReading, PacketError};

/// Size of the id + length header preceding each object.
pub const OBJECT_HEADER_SIZE: usize = 3;

/// Object identifiers understood by this decoder.
pub mod object_ids {
    /// Pressure present / absent state.
    pub const PRESSURE_STATE: u16 = 0x483C;
    /// Seconds since pressure became present.
    pub const PRESSURE_PRESENT_DURATION: u16 = 0x483D;
    /// Seconds since pressure became absent.
    pub const PRESSURE_ABSENT_DURATION: u16 = 0x483E;
    /// Configured present threshold, in seconds.
    pub const PRESSURE_PRESENT_THRESHOLD: u16 = 0x483F;
    /// Configured absent threshold, in seconds.
    pub const PRESSURE_ABSENT_THRESHOLD: u16 = 0x4840;
    /// Battery level, percent.
    pub const BATTERY: u16 = 0x4C03;
}

/// A single object borrowed from the object region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRecord<'a> {
    /// Object identifier.
    pub id: u16,
    /// Object payload.
    pub data: &'a [u8],
}

impl<'a> ObjectRecord<'a> {
    /// Create an object record.
    pub fn new(id: u16, data: &'a [u8]) -> Self {
        ObjectRecord { id, data }
    }

    /// Append the encoded record to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), PacketError> {
        let len = u8::try_from(self.data.len()).map_err(|_| PacketError::ObjectTooLarge {
            id: self.id,
            size: self.data.len(),
        })?;
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.push(len);
        buf.extend_from_slice(self.data);
        Ok(())
    }
}

/// Iterator over the objects in a plaintext object region.
///
/// Iteration ends when fewer than [`OBJECT_HEADER_SIZE`] bytes remain or when
/// an object's declared length overruns the buffer. In the latter case
/// [`ObjectIter::truncated`] reports true.
#[derive(Debug, Clone)]
pub struct ObjectIter<'a> {
    data: &'a [u8],
    offset: usize,
    truncated: bool,
}

impl<'a> ObjectIter<'a> {
    /// Walk `data` as a TLV stream.
    pub fn new(data: &'a [u8]) -> Self {
        ObjectIter {
            data,
            offset: 0,
            truncated: false,
        }
    }

    /// Whether the walk stopped on an object that overran the buffer.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = ObjectRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.truncated {
            return None;
        }
        let remaining = &self.data[self.offset..];
        if remaining.len() < OBJECT_HEADER_SIZE {
            return None;
        }

        let id = u16::from_le_bytes([remaining[0], remaining[1]]);
        let len = remaining[2] as usize;
        let body = &remaining[OBJECT_HEADER_SIZE..];

        if len > body.len() {
            debug!(
                "Object 0x{:04X} length {} exceeds payload at offset {} (len={})",
                id,
                len,
                self.offset,
                self.data.len()
            );
            self.truncated = true;
            return None;
        }

        self.offset += OBJECT_HEADER_SIZE + len;
        Some(ObjectRecord::new(id, &body[..len]))
    }
}

/// How a recognized object populates a reading.
#[derive(Debug, Clone, Copy)]
pub struct ObjectSpec {
    /// Object identifier.
    pub id: u16,
    /// Name of the reading field this object populates.
    pub field: &'static str,
    /// Minimum data length; shorter objects are skipped.
    pub width: usize,
    /// Store the value. `data` is at least `width` bytes long.
    pub apply: fn(&[u8], &mut DecodedReading),
}

fn le_u32(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

/// Dispatch table for recognized objects.
pub static OBJECT_TABLE: &[ObjectSpec] = &[
    ObjectSpec {
        id: object_ids::PRESSURE_STATE,
        field: "pressure_present",
        width: 1,
        apply: |data, r| r.pressure_present = Some(data[0] != 0),
    },
    ObjectSpec {
        id: object_ids::PRESSURE_PRESENT_DURATION,
        field: "pressure_present_duration_s",
        width: 4,
        apply: |data, r| r.pressure_present_duration_s = Some(le_u32(data)),
    },
    ObjectSpec {
        id: object_ids::PRESSURE_ABSENT_DURATION,
        field: "pressure_absent_duration_s",
        width: 4,
        apply: |data, r| r.pressure_absent_duration_s = Some(le_u32(data)),
    },
    ObjectSpec {
        id: object_ids::PRESSURE_PRESENT_THRESHOLD,
        field: "pressure_present_threshold_s",
        width: 4,
        apply: |data, r| r.pressure_present_threshold_s = Some(le_u32(data)),
    },
    ObjectSpec {
        id: object_ids::PRESSURE_ABSENT_THRESHOLD,
        field: "pressure_absent_threshold_s",
        width: 4,
        apply: |data, r| r.pressure_absent_threshold_s = Some(le_u32(data)),
    },
    ObjectSpec {
        id: object_ids::BATTERY,
        field: "battery_percent",
        width: 1,
        apply: |data, r| r.battery_percent = Some(data[0]),
    },
];

/// Look up the dispatch entry for an object identifier.
pub fn lookup_object(id: u16) -> Option<&'static ObjectSpec> {
    OBJECT_TABLE.iter().find(|spec| spec.id == id)
}

/// Field name for an object identifier, for diagnostics.
pub fn describe_object(id: u16) -> Option<&'static str> {
    lookup_object(id).map(|spec| spec.field)
}

/// Decode every recognized object in `data` into `reading`.
///
/// Returns the reading with all fields decoded before the first truncated
/// object, if any. Later objects overwrite earlier ones with the same id.
pub fn decode_objects(data: &[u8], mut reading: DecodedReading) -> DecodedReading {
    for object in ObjectIter::new(data) {
        match lookup_object(object.id) {
            Some(spec) if object.data.len() >= spec.width => (spec.apply)(object.data, &mut reading),
            Some(spec) => debug!(
                "Object 0x{:04X} ({}) too short: {} bytes, need {}",
                object.id,
                spec.field,
                object.data.len(),
                spec.width
            ),
            None => debug!(
                "Unhandled MiBeacon object 0x{:04X} (len={}, data={})",
                object.id,
                object.data.len(),
                hex::encode_upper(object.data)
            ),
        }
    }
    reading
}

/// Encode a list of objects into an object region.
pub fn encode_objects(objects: &[ObjectRecord<'_>]) -> Result<Vec<u8>, PacketError> {
    let mut buf = Vec::with_capacity(
        objects
            .iter()
            .map(|o| OBJECT_HEADER_SIZE + o.data.len())
            .sum(),
    );
    for object in objects {
        object.encode_into(&mut buf)?;
    }
    Ok(buf)
}
