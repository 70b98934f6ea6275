//! MiBeacon advertisement decoding.
//!
//! This crate decodes the vendor service data (UUID `0xFE95`) broadcast by
//! Linptech presence sensors such as the PS1BB pressure mat. A frame is
//! parsed, decrypted with the device bindkey if it is marked encrypted, and
//! its TLV objects are mapped onto a [`DecodedReading`].
//!
//! # Example
//!
//! ```rust
//! use mibeacon_packet::{decode, DecodeOutcome, PRODUCT_ID_PS1BB};
//!
//! let service_data = [0x40, 0x00, 0x4C, 0x3F, 0x01, 0x3C, 0x48, 0x01, 0x01];
//! let reading = decode(&service_data, None, "A4:C1:38:5A:0B:1C", &[PRODUCT_ID_PS1BB]).unwrap();
//! assert_eq!(reading.pressure_present, Some(true));
//!
//! let keep_alive = [0x00, 0x00, 0x4C, 0x3F, 0x02];
//! assert_eq!(
//!     decode(&keep_alive, None, "A4:C1:38:5A:0B:1C", &[PRODUCT_ID_PS1BB]),
//!     Err(DecodeOutcome::NoData)
//! );
//! ```

mod address;
pub mod codec;
pub mod crypto;
mod decoder;
mod error;
pub mod objects;
mod reading;

pub use address::*;
pub use codec::{parse_frame, peek_product_id, FrameBuilder, FrameControl, RawFrame, FRAME_HEADER_SIZE};
pub use decoder::*;
pub use error::*;
pub use objects::{object_ids, ObjectRecord};
pub use reading::*;

/// Bluetooth service UUID carrying MiBeacon service data.
pub const MI_SERVICE_UUID: &str = "0000fe95-0000-1000-8000-00805f9b34fb";

/// Product id of the Linptech PS1BB pressure sensor.
pub const PRODUCT_ID_PS1BB: u16 = 0x3F4C;

/// Product ids decoded by default.
pub const SUPPORTED_PRODUCT_IDS: &[u16] = &[PRODUCT_ID_PS1BB];
